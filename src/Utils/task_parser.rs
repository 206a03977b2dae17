/// parse a task document with structure like
/// ```text
/// integrator
///   rtol: 1e-6
///   method: l_stable
/// output
///   record_steps: true
/// ```
/// into HashMap<title, HashMap<key, Vec<Value>>>. Lines starting with //, # or % are comments.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

pub type SectionMap = HashMap<String, Vec<Value>>;
pub type DocumentMap = HashMap<String, SectionMap>;

/// value of a document entry
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    /// integers are accepted where a float is expected
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// identifier: letter or underscore followed by letters, digits, underscores
fn parse_identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    map(parser, String::from).parse(input)
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    let raw = take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\r' | '\n' | ';'));
    let mut parser = map_res(raw, |s: &str| -> Result<Value, String> {
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    parser.parse(input)
}

/// key: value1, value2
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon = delimited(space0, tag(":"), space0);
    let values = separated_list1(delimited(space0, tag(","), space0), parse_value);
    let (input, result) = separated_pair(parse_identifier, colon, values).parse(input)?;
    // optional trailing semicolon
    let trailing: IResult<&str, Vec<&str>> =
        many0(alt((tag(";"), tag(" "), tag("\t")))).parse(input);
    let (input, _) = trailing?;
    Ok((input, result))
}

fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, title) = parse_identifier(input)?;
    let (input, _) = multispace0(input)?;
    let (input, pairs) = many1(terminated(parse_key_value_pair, multispace0)).parse(input)?;
    let section: SectionMap = pairs.into_iter().collect();
    Ok((input, (title, section)))
}

fn strip_comments(input: &str) -> String {
    input
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty()
                && !line.starts_with("//")
                && !line.starts_with('#')
                && !line.starts_with('%')
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses the whole document. Fails if anything is left unparsed.
pub fn parse_document(input: &str) -> Result<DocumentMap, String> {
    let cleaned = strip_comments(input);
    let mut parser = many1(delimited(multispace0, parse_section, multispace0));
    match parser.parse(cleaned.as_str()) {
        Ok((remaining, sections)) => {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "Failed to parse entire document. Remaining: '{}'",
                    remaining
                ));
            }
            let mut document = DocumentMap::new();
            for (title, section) in sections {
                document.entry(title).or_default().extend(section);
            }
            Ok(document)
        }
        Err(e) => Err(format!("Parsing error: {:?}", e)),
    }
}

/// single value of `title.key`; None if the section or key is absent
pub fn lookup<'a>(document: &'a DocumentMap, title: &str, key: &str) -> Option<&'a Value> {
    document
        .get(title)
        .and_then(|section| section.get(key))
        .and_then(|values| values.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_types() {
        let (rest, v) = parse_value("5, 6").unwrap();
        assert_eq!(v, Value::Integer(5));
        assert_eq!(rest, ", 6");
        let (_, v) = parse_value("1e-6").unwrap();
        assert_eq!(v, Value::Float(1e-6));
        let (_, v) = parse_value("true").unwrap();
        assert_eq!(v, Value::Boolean(true));
        let (_, v) = parse_value("l_stable").unwrap();
        assert_eq!(v, Value::String("l_stable".to_string()));
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (rest, (key, values)) = parse_key_value_pair("atol : 1e-8, 2e-8;\nnext").unwrap();
        assert_eq!(key, "atol");
        assert_eq!(values, vec![Value::Float(1e-8), Value::Float(2e-8)]);
        assert_eq!(rest, "\nnext");
    }

    #[test]
    fn test_parse_document_with_comments() {
        let doc = "
        # integrator settings
        integrator
            rtol: 1e-7
            nmax: 500
            // tableau
            method: 6
        output
            record_steps: true
        ";
        let parsed = parse_document(doc).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            lookup(&parsed, "integrator", "rtol").and_then(Value::as_float),
            Some(1e-7)
        );
        assert_eq!(
            lookup(&parsed, "integrator", "nmax").and_then(Value::as_integer),
            Some(500)
        );
        assert_eq!(
            lookup(&parsed, "output", "record_steps").and_then(Value::as_boolean),
            Some(true)
        );
        assert!(lookup(&parsed, "integrator", "atol").is_none());
    }

    #[test]
    fn test_malformed_document() {
        assert!(parse_document("integrator rtol 1e-6").is_err());
        assert!(parse_document("").is_err());
    }
}
