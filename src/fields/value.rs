use super::error::FieldError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fmt;

/// One file of a multi-file download item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<f64>,
    #[serde(default)]
    pub prio: i64,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
            mtime: None,
            prio: 1,
        }
    }
}

/// A field value after its value type was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Unknown, unset, or "never".
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Tags(BTreeSet<String>),
    Files(Vec<FileEntry>),
    List(Vec<String>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Truthiness of the value; unknown values are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Int(i) => *i != 0,
            FieldValue::Float(f) => *f != 0.0,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Tags(tags) => !tags.is_empty(),
            FieldValue::Files(files) => !files.is_empty(),
            FieldValue::List(list) => !list.is_empty(),
        }
    }

    /// Numeric view of the value, with unknown values counting as zero.
    pub fn as_number(&self, field: &str) -> Result<f64, FieldError> {
        match self {
            FieldValue::Null => Ok(0.0),
            FieldValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FieldValue::Int(i) => Ok(*i as f64),
            FieldValue::Float(f) => Ok(*f),
            FieldValue::Text(s) if s.trim().is_empty() => Ok(0.0),
            FieldValue::Text(s) => s.trim().parse().map_err(|_| FieldError::Conversion {
                field: field.to_string(),
                value: format!("{s:?}"),
                expected: "a number",
            }),
            other => Err(FieldError::Conversion {
                field: field.to_string(),
                value: other.to_string(),
                expected: "a number",
            }),
        }
    }

    /// Text view of the value, empty for unknown values.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Tag view of the value: the set of lower-cased tokens.
    pub fn tag_set(&self) -> BTreeSet<String> {
        match self {
            FieldValue::Null => BTreeSet::new(),
            FieldValue::Tags(tags) => tags.clone(),
            FieldValue::List(list) => list.iter().map(|s| s.to_lowercase()).collect(),
            other => other
                .as_text()
                .split_whitespace()
                .map(str::to_lowercase)
                .collect(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => json!(b),
            FieldValue::Int(i) => json!(i),
            FieldValue::Float(f) => json!(f),
            FieldValue::Text(s) => json!(s),
            FieldValue::Tags(tags) => json!(tags),
            FieldValue::Files(files) => json!(files),
            FieldValue::List(list) => json!(list),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "N/A"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Tags(tags) => {
                let joined: Vec<&str> = tags.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(" "))
            }
            FieldValue::Files(files) => {
                let paths: Vec<&str> = files.iter().map(|file| file.path.as_str()).collect();
                write!(f, "{}", paths.join(", "))
            }
            FieldValue::List(list) => write!(f, "{}", list.join("/")),
        }
    }
}

/// Semantic type of a field, converting raw backend values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// Keep whatever shape the backend delivered.
    Untyped,
    Integer,
    Float,
    /// Scaled integer ratio (1:1 = 1000) normalized to a float.
    Ratio,
    Text,
    Boolean,
    /// Whitespace separated tags.
    TagSet,
    FileList,
    List,
    /// UNIX timestamp; zero means unset.
    Timestamp,
    /// Span in seconds.
    Duration,
}

impl ValueType {
    pub fn label(self) -> &'static str {
        match self {
            ValueType::Untyped => "untyped",
            ValueType::Integer => "integer",
            ValueType::Float => "float",
            ValueType::Ratio => "ratio",
            ValueType::Text => "text",
            ValueType::Boolean => "boolean",
            ValueType::TagSet => "tags",
            ValueType::FileList => "files",
            ValueType::List => "list",
            ValueType::Timestamp => "timestamp",
            ValueType::Duration => "duration",
        }
    }

    /// Apply this type to a raw value delivered for `field`.
    pub fn convert(self, field: &str, raw: Value) -> Result<FieldValue, FieldError> {
        if raw.is_null() {
            return Ok(FieldValue::Null);
        }

        let converted = match self {
            ValueType::Untyped => Some(untyped(raw.clone())),
            ValueType::Integer => integer(&raw).map(FieldValue::Int),
            ValueType::Float => number(&raw).map(FieldValue::Float),
            ValueType::Ratio => match &raw {
                Value::Number(n) if n.is_i64() || n.is_u64() => {
                    n.as_f64().map(|v| FieldValue::Float(v / 1000.0))
                }
                _ => number(&raw).map(FieldValue::Float),
            },
            ValueType::Text => match &raw {
                Value::String(s) => Some(FieldValue::Text(s.clone())),
                Value::Number(n) => Some(FieldValue::Text(n.to_string())),
                Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
                _ => None,
            },
            ValueType::Boolean => match &raw {
                Value::Bool(b) => Some(FieldValue::Bool(*b)),
                Value::Number(n) => n.as_f64().map(|v| FieldValue::Bool(v != 0.0)),
                Value::String(s) => crate::filter::truth(s.trim()).map(FieldValue::Bool),
                _ => None,
            },
            ValueType::TagSet => strings(&raw).map(|tokens| {
                FieldValue::Tags(
                    tokens
                        .iter()
                        .flat_map(|token| token.split_whitespace())
                        .map(str::to_lowercase)
                        .collect(),
                )
            }),
            ValueType::FileList => files(&raw).map(FieldValue::Files),
            ValueType::List => strings(&raw).map(FieldValue::List),
            ValueType::Timestamp => number(&raw).map(|ts| {
                if ts == 0.0 {
                    FieldValue::Null
                } else if ts.fract() == 0.0 {
                    FieldValue::Int(ts as i64)
                } else {
                    FieldValue::Float(ts)
                }
            }),
            ValueType::Duration => number(&raw).map(FieldValue::Float),
        };

        converted.ok_or_else(|| FieldError::Conversion {
            field: field.to_string(),
            value: raw.to_string(),
            expected: self.label(),
        })
    }
}

fn untyped(raw: Value) -> FieldValue {
    match raw {
        Value::Null => FieldValue::Null,
        Value::Bool(b) => FieldValue::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => FieldValue::Float(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => FieldValue::Text(s),
        Value::Array(values) => FieldValue::List(
            values
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ),
        Value::Object(_) => FieldValue::Text(raw.to_string()),
    }
}

fn number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) if s.trim().is_empty() => Some(0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn strings(raw: &Value) -> Option<Vec<String>> {
    match raw {
        Value::String(s) => Some(vec![s.clone()]),
        Value::Array(values) => values
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn files(raw: &Value) -> Option<Vec<FileEntry>> {
    let Value::Array(values) = raw else {
        return None;
    };

    values
        .iter()
        .map(|v| match v {
            Value::String(path) => Some(FileEntry::new(path.clone(), 0)),
            other => serde_json::from_value::<FileEntry>(other.clone()).ok(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_is_normalized() {
        let value = ValueType::Ratio.convert("ratio", json!(1500)).unwrap();
        assert_eq!(value, FieldValue::Float(1.5));

        let value = ValueType::Ratio.convert("ratio", json!(0.25)).unwrap();
        assert_eq!(value, FieldValue::Float(0.25));
    }

    #[test]
    fn test_tags_are_split_and_lowercased() {
        let value = ValueType::TagSet.convert("tagged", json!("New  Foo")).unwrap();
        let expected: BTreeSet<String> = ["new", "foo"].iter().map(|s| s.to_string()).collect();
        assert_eq!(value, FieldValue::Tags(expected));
    }

    #[test]
    fn test_zero_timestamp_is_unset() {
        assert!(
            ValueType::Timestamp
                .convert("completed", json!(0))
                .unwrap()
                .is_null()
        );
        assert_eq!(
            ValueType::Timestamp.convert("completed", json!(1234)).unwrap(),
            FieldValue::Int(1234)
        );
    }

    #[test]
    fn test_conversion_error_names_field_and_value() {
        let err = ValueType::Integer
            .convert("size", json!({"bad": true}))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("size"));
        assert!(message.contains("bad"));
    }

    #[test]
    fn test_file_list_accepts_objects_and_paths() {
        let value = ValueType::FileList
            .convert(
                "files",
                json!([{"path": "a/b.mkv", "size": 10}, "c/d.nfo"]),
            )
            .unwrap();
        match value {
            FieldValue::Files(files) => {
                assert_eq!(files.len(), 2);
                assert_eq!(files[0].size, 10);
                assert_eq!(files[1].path, "c/d.nfo");
            }
            other => panic!("expected files, got {other:?}"),
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!FieldValue::Null.is_truthy());
        assert!(FieldValue::Int(3).is_truthy());
        assert!(!FieldValue::Text(String::new()).is_truthy());
    }
}
