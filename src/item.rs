//! Download items as seen by the filter layer.

use crate::fields::{FieldError, FieldValue};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

/// Named, typed attributes of one item, plus a cache for on-demand fields.
///
/// Implementations must tolerate concurrent `get_cached`/`set_cached` calls
/// when filters are evaluated from several threads against the same item.
pub trait ItemAccessor {
    /// Read a raw value from the backing store; absent values are `Null`.
    fn get_raw(&self, name: &str) -> Result<Value, FieldError>;

    fn get_cached(&self, name: &str) -> Option<FieldValue>;

    fn set_cached(&self, name: &str, value: FieldValue);
}

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Failed to read items file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse items file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: json5::Error,
    },
    #[error("Expected a list of items, got {0}")]
    NotAList(&'static str),
    #[error("Item #{0} is not an object")]
    NotAnObject(usize),
}

/// An item backed by a snapshot of raw values, e.g. one JSON object.
#[derive(Debug, Default)]
pub struct Item {
    raw: Map<String, Value>,
    cache: RwLock<HashMap<String, FieldValue>>,
}

impl Item {
    pub fn new(raw: Map<String, Value>) -> Self {
        Self {
            raw,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_json(value: Value) -> Result<Self, ItemError> {
        match value {
            Value::Object(raw) => Ok(Self::new(raw)),
            _ => Err(ItemError::NotAnObject(0)),
        }
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl ItemAccessor for Item {
    fn get_raw(&self, name: &str) -> Result<Value, FieldError> {
        if let Some(value) = self.raw.get(name) {
            return Ok(value.clone());
        }

        // custom_KEY may also live in a nested "custom" object
        if let Some(key) = name.strip_prefix("custom_") {
            if let Some(value) = self.raw.get("custom").and_then(|custom| custom.get(key)) {
                return Ok(value.clone());
            }
        }

        Ok(Value::Null)
    }

    fn get_cached(&self, name: &str) -> Option<FieldValue> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set_cached(&self, name: &str, value: FieldValue) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value);
    }
}

/// Parse a JSON (or JSON5) array of item objects.
pub fn parse_items(text: &str, path: &str) -> Result<Vec<Item>, ItemError> {
    let value: Value = json5::from_str(text).map_err(|source| ItemError::Parse {
        path: path.to_string(),
        source,
    })?;

    let Value::Array(entries) = value else {
        let kind = match value {
            Value::Object(_) => "an object",
            Value::String(_) => "a string",
            Value::Number(_) => "a number",
            Value::Bool(_) => "a boolean",
            _ => "null",
        };
        return Err(ItemError::NotAList(kind));
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| match entry {
            Value::Object(raw) => Ok(Item::new(raw)),
            _ => Err(ItemError::NotAnObject(idx)),
        })
        .collect()
}

pub fn load_items(path: &Path) -> Result<Vec<Item>, ItemError> {
    let path_display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ItemError::Read {
        path: path_display.clone(),
        source,
    })?;
    parse_items(&text, &path_display)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_values_are_null() {
        let item = Item::from_json(json!({"name": "x"})).unwrap();
        assert_eq!(item.get_raw("name").unwrap(), json!("x"));
        assert_eq!(item.get_raw("size").unwrap(), Value::Null);
    }

    #[test]
    fn test_nested_custom_values() {
        let item = Item::from_json(json!({"custom": {"category": "tv"}})).unwrap();
        assert_eq!(item.get_raw("custom_category").unwrap(), json!("tv"));
    }

    #[test]
    fn test_cache_round_trip() {
        let item = Item::default();
        assert!(item.get_cached("kind").is_none());
        item.set_cached("kind", FieldValue::Int(1));
        assert_eq!(item.get_cached("kind"), Some(FieldValue::Int(1)));
    }

    #[test]
    fn test_parse_items_accepts_json5() {
        let items = parse_items("[{name: 'a', size: 1,}, {name: 'b'}]", "inline").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].raw()["name"], json!("b"));
    }

    #[test]
    fn test_parse_items_rejects_non_objects() {
        let err = parse_items("[1]", "inline").unwrap_err();
        assert!(matches!(err, ItemError::NotAnObject(0)));
        let err = parse_items("{}", "inline").unwrap_err();
        assert!(matches!(err, ItemError::NotAList("an object")));
    }
}
