use crate::fields::{BuiltinOptions, FieldDescriptor, MatcherType, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Field compared against bare tokens without `=`.
    pub default_field: String,
    /// Abort on the first item whose fields cannot be read.
    pub strict: bool,
    /// Tracker alias to the announce URLs (or URL prefixes) it stands for.
    pub announce: BTreeMap<String, Vec<String>>,
    /// Tracker alias to the content theme it specializes in.
    pub traits_by_alias: HashMap<String, String>,
    pub custom_fields: Vec<CustomFieldConfig>,
    pub output_fields: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_field: "name".to_string(),
            strict: false,
            announce: BTreeMap::new(),
            traits_by_alias: HashMap::new(),
            custom_fields: Vec::new(),
            output_fields: ["name", "size", "done", "alias"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl QueryConfig {
    pub fn builtin_options(&self) -> BuiltinOptions {
        BuiltinOptions {
            announce: self.announce.clone(),
            traits_by_alias: self.traits_by_alias.clone(),
        }
    }

    /// Descriptors of the user-defined fields, in declaration order.
    pub fn custom_fields(&self) -> Vec<FieldDescriptor> {
        self.custom_fields
            .iter()
            .map(CustomFieldConfig::descriptor)
            .collect()
    }
}

/// Matcher families selectable for a user-defined field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CustomMatcher {
    Text,
    Files,
    Tags,
    Bool,
    Float,
    Bytes,
    Time,
    Duration,
    #[default]
    Magic,
}

impl CustomMatcher {
    fn field_types(self) -> (ValueType, MatcherType) {
        match self {
            CustomMatcher::Text => (ValueType::Text, MatcherType::Pattern),
            CustomMatcher::Files => (ValueType::FileList, MatcherType::Files),
            CustomMatcher::Tags => (ValueType::TagSet, MatcherType::Tagged),
            CustomMatcher::Bool => (ValueType::Boolean, MatcherType::Bool),
            CustomMatcher::Float => (ValueType::Float, MatcherType::Float),
            CustomMatcher::Bytes => (ValueType::Integer, MatcherType::ByteSize),
            CustomMatcher::Time => (ValueType::Timestamp, MatcherType::TimeNotNull),
            CustomMatcher::Duration => (ValueType::Duration, MatcherType::Duration),
            CustomMatcher::Magic => (ValueType::Untyped, MatcherType::Magic),
        }
    }
}

/// A field read from a raw item value under another key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldConfig {
    pub name: String,
    /// Raw key to read; defaults to the field name.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub matcher: CustomMatcher,
    #[serde(default)]
    pub doc: Option<String>,
}

impl CustomFieldConfig {
    pub fn descriptor(&self) -> FieldDescriptor {
        let (value_type, matcher) = self.matcher.field_types();
        let source = self.source.clone().unwrap_or_else(|| self.name.clone());
        let doc = self
            .doc
            .clone()
            .unwrap_or_else(|| format!("user-defined field reading '{source}'"));

        FieldDescriptor::dynamic(value_type, self.name.clone(), doc)
            .with_matcher(matcher)
            .with_accessor(move |item| item.get_raw(&source))
    }
}

pub fn load_config(path: Option<&Path>) -> Result<QueryConfig, ConfigError> {
    if let Some(path) = path {
        load_config_from_path(path)
    } else {
        Ok(default_config().clone())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<QueryConfig, ConfigError> {
    let path_display = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_display.clone(),
        source,
    })?;

    toml::from_str::<QueryConfig>(&raw).map_err(|source| ConfigError::Parse {
        path: path_display,
        source,
    })
}

pub fn default_config() -> &'static QueryConfig {
    static DEFAULT_CONFIG: LazyLock<QueryConfig> = LazyLock::new(QueryConfig::default);
    &DEFAULT_CONFIG
}
