//! Logger configuration shared by the solvers: a console `TermLogger` and/or a
//! file `WriteLogger` combined into one global `simplelog` logger.
use simplelog::*;
use std::fs::File;

#[derive(Debug, Clone, PartialEq)]
pub struct LoggerSettings {
    pub log_level: Option<LevelFilter>,
    pub log_to_file: Option<String>,
    pub log_to_console: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        LoggerSettings {
            log_level: Some(LevelFilter::Warn),
            log_to_file: None,
            log_to_console: true,
        }
    }
}

impl LoggerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// level used when none was set explicitly
    pub fn level(&self) -> LevelFilter {
        self.log_level.unwrap_or(LevelFilter::Info)
    }

    fn build_loggers(&self) -> Vec<Box<dyn SharedLogger>> {
        let level = self.level();
        let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
        if level == LevelFilter::Off {
            return loggers;
        }
        if self.log_to_console {
            loggers.push(TermLogger::new(
                level,
                Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            ));
        }
        if let Some(ref filename) = self.log_to_file {
            if let Ok(file) = File::create(filename) {
                loggers.push(WriteLogger::new(level, Config::default(), file));
            }
        }
        loggers
    }

    /// Installs the global logger. The global logger can be set only once per process,
    /// later calls are no-ops.
    pub fn init(&self) {
        let loggers = self.build_loggers();
        if !loggers.is_empty() {
            let _ = CombinedLogger::init(loggers);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_settings() {
        let settings = LoggerSettings::default();
        assert_eq!(settings.level(), LevelFilter::Warn);
        assert_eq!(settings.build_loggers().len(), 1);

        let off = LoggerSettings {
            log_level: Some(LevelFilter::Off),
            ..LoggerSettings::default()
        };
        assert!(off.build_loggers().is_empty());
        off.init();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grk4.log");
        let to_file = LoggerSettings {
            log_level: None,
            log_to_file: Some(path.to_string_lossy().to_string()),
            log_to_console: false,
        };
        assert_eq!(to_file.level(), LevelFilter::Info);
        assert_eq!(to_file.build_loggers().len(), 1);
        assert!(path.exists());
    }
}
