//! different utility modules used throughout the project
/// console/file logger configuration shared by the solvers
pub mod logger;
/// parse document with structure like " title1 key1: value1, value2 key2: value2 title2 key3:value3, value4" into HashMap
pub mod task_parser;
