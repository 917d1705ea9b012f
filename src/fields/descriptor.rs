use super::error::FieldError;
use super::format;
use super::value::{FieldValue, ValueType};
use crate::item::ItemAccessor;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// How long a fetched field value stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Never changes once fetched.
    Constant,
    /// Possibly stale, re-read on every access.
    Dynamic,
    /// Not fetched until first access, then held for the item's lifetime.
    OnDemand,
}

impl CachePolicy {
    pub fn label(self) -> &'static str {
        match self {
            CachePolicy::Constant => "constant",
            CachePolicy::Dynamic => "dynamic",
            CachePolicy::OnDemand => "on-demand",
        }
    }
}

/// The leaf filter family that is legal for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherType {
    Pattern,
    Files,
    Tagged,
    Bool,
    Float,
    ByteSize,
    Time,
    /// Like `Time`, but unset timestamps only match comparisons against zero.
    TimeNotNull,
    Duration,
    Magic,
}

impl MatcherType {
    pub fn label(self) -> &'static str {
        match self {
            MatcherType::Pattern => "pattern",
            MatcherType::Files => "files",
            MatcherType::Tagged => "tags",
            MatcherType::Bool => "bool",
            MatcherType::Float => "float",
            MatcherType::ByteSize => "bytes",
            MatcherType::Time | MatcherType::TimeNotNull => "time",
            MatcherType::Duration => "duration",
            MatcherType::Magic => "magic",
        }
    }
}

/// Derives a field's raw value from other values of the same item.
pub type Accessor = Arc<dyn Fn(&dyn ItemAccessor) -> Result<Value, FieldError> + Send + Sync>;

/// Turns a field value into its display form.
#[derive(Clone)]
pub enum Formatter {
    HumanSize,
    IsoDatetime,
    HumanDuration,
    YesNo,
    Percent,
    TraitPath,
    Custom(Arc<dyn Fn(&FieldValue) -> String + Send + Sync>),
}

impl Formatter {
    pub fn apply(&self, value: &FieldValue) -> String {
        match self {
            Formatter::HumanSize => match value {
                FieldValue::Null => "N/A".to_string(),
                other => format::human_size(other.as_number("").unwrap_or(-1.0)),
            },
            Formatter::IsoDatetime => match value {
                FieldValue::Null => "never".to_string(),
                other => format::iso_datetime(other.as_number("").unwrap_or_default()),
            },
            Formatter::HumanDuration => match value {
                FieldValue::Null => "never".to_string(),
                other => format::human_duration(other.as_number("").unwrap_or_default(), 2),
            },
            Formatter::YesNo => if value.is_truthy() { "yes" } else { "no" }.to_string(),
            Formatter::Percent => match value {
                FieldValue::Null => "N/A".to_string(),
                other => format!("{:5.1}%", other.as_number("").unwrap_or_default()),
            },
            Formatter::TraitPath => match value {
                FieldValue::List(list) => list.join("/"),
                other => other.as_text(),
            },
            Formatter::Custom(func) => func(value),
        }
    }
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formatter::HumanSize => write!(f, "HumanSize"),
            Formatter::IsoDatetime => write!(f, "IsoDatetime"),
            Formatter::HumanDuration => write!(f, "HumanDuration"),
            Formatter::YesNo => write!(f, "YesNo"),
            Formatter::Percent => write!(f, "Percent"),
            Formatter::TraitPath => write!(f, "TraitPath"),
            Formatter::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Describes one addressable attribute of a download item.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub doc: String,
    pub value_type: ValueType,
    pub cache_policy: CachePolicy,
    pub accessor: Option<Accessor>,
    pub matcher: Option<MatcherType>,
    pub formatter: Option<Formatter>,
}

impl FieldDescriptor {
    pub fn new(
        value_type: ValueType,
        cache_policy: CachePolicy,
        name: impl Into<String>,
        doc: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            doc: doc.into(),
            value_type,
            cache_policy,
            accessor: None,
            matcher: None,
            formatter: None,
        }
    }

    pub fn constant(
        value_type: ValueType,
        name: impl Into<String>,
        doc: impl Into<String>,
    ) -> Self {
        Self::new(value_type, CachePolicy::Constant, name, doc)
    }

    pub fn dynamic(value_type: ValueType, name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self::new(value_type, CachePolicy::Dynamic, name, doc)
    }

    pub fn on_demand(
        value_type: ValueType,
        name: impl Into<String>,
        doc: impl Into<String>,
    ) -> Self {
        Self::new(value_type, CachePolicy::OnDemand, name, doc)
    }

    pub fn with_matcher(mut self, matcher: MatcherType) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn with_accessor<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&dyn ItemAccessor) -> Result<Value, FieldError> + Send + Sync + 'static,
    {
        self.accessor = Some(Arc::new(accessor));
        self
    }

    /// Current value of this field for `item`, honoring the cache policy.
    pub fn value(&self, item: &dyn ItemAccessor) -> Result<FieldValue, FieldError> {
        super::registry::get_value(self, item)
    }

    /// Read and convert the value, bypassing any cache.
    pub(crate) fn fetch(&self, item: &dyn ItemAccessor) -> Result<FieldValue, FieldError> {
        let raw = match &self.accessor {
            Some(accessor) => accessor(item)?,
            None => item.get_raw(&self.name)?,
        };
        self.value_type.convert(&self.name, raw)
    }

    /// Display form of a value of this field.
    pub fn format_value(&self, value: &FieldValue) -> String {
        match &self.formatter {
            Some(formatter) => formatter.apply(value),
            None => value.as_text(),
        }
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("cache_policy", &self.cache_policy)
            .field("derived", &self.accessor.is_some())
            .field("matcher", &self.matcher)
            .field("formatter", &self.formatter)
            .finish()
    }
}
