use thiserror::Error;

/// Errors raised while reading or converting a field value of an item.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Unknown field '{0}'")]
    Unknown(String),

    #[error("Cannot convert value {value} of field '{field}' to {expected}")]
    Conversion {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("While accessing field '{field}': {reason}")]
    Access { field: String, reason: String },

    #[error("Bad field name '{name}': {percent} > 100")]
    PercentOutOfRange { name: String, percent: String },
}

impl FieldError {
    pub fn access(field: &str, reason: impl Into<String>) -> Self {
        FieldError::Access {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the field the error is about.
    pub fn field(&self) -> &str {
        match self {
            FieldError::Unknown(name) => name,
            FieldError::Conversion { field, .. } | FieldError::Access { field, .. } => field,
            FieldError::PercentOutOfRange { name, .. } => name,
        }
    }
}

/// A field name was registered twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate field definition '{name}'")]
pub struct DuplicateFieldError {
    pub name: String,
}
