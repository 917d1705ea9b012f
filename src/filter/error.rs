use crate::fields::FieldError;
use thiserror::Error;

/// Errors that can occur when parsing filter conditions
#[derive(Debug, Error)]
pub enum FilterSyntaxError {
    #[error("No conditions given at all!")]
    Empty,

    #[error("NOT must be followed by some conditions!")]
    DanglingNot,

    #[error("Unterminated quote in '{0}'")]
    UnterminatedQuote(String),

    #[error("Field name missing in '{0}' (expected '=')")]
    MissingFieldName(String),

    #[error("Unknown field '{field}' in '{condition}'")]
    UnknownField { field: String, condition: String },

    #[error("Field '{field}' cannot be used as a filter")]
    NotFilterable { field: String },

    #[error("Bad field '{field}' in '{condition}': {source}")]
    Field {
        field: String,
        condition: String,
        #[source]
        source: FieldError,
    },

    #[error("Comparison operator cannot be followed by '{sign}' in '{condition}'")]
    AmbiguousSign { sign: char, condition: String },

    #[error("Cannot split '{values}' into match values in '{condition}'")]
    NoValues { values: String, condition: String },

    #[error("Bad {kind} value '{value}' in '{field}={literal}' ({reason})")]
    BadValue {
        field: String,
        kind: &'static str,
        value: String,
        literal: String,
        reason: String,
    },

    #[error("Unbalanced brackets, too many closing ']' in condition '{0}'")]
    TooManyClosing(String),

    #[error("Unbalanced brackets, too many open '[' in condition '{0}'")]
    TooManyOpening(String),

    #[error("Left-hand side of OR missing in '{0}'!")]
    MissingLeftOperand(String),

    #[error("Right-hand side of OR missing in '{0}'!")]
    MissingRightOperand(String),
}

impl FilterSyntaxError {
    pub(crate) fn bad_value(
        field: &str,
        kind: &'static str,
        value: &str,
        literal: &str,
        reason: impl ToString,
    ) -> Self {
        FilterSyntaxError::BadValue {
            field: field.to_string(),
            kind,
            value: value.to_string(),
            literal: literal.to_string(),
            reason: reason.to_string(),
        }
    }

    /// The field the error is about, where one was identified.
    pub fn field(&self) -> Option<&str> {
        match self {
            FilterSyntaxError::UnknownField { field, .. }
            | FilterSyntaxError::NotFilterable { field }
            | FilterSyntaxError::Field { field, .. }
            | FilterSyntaxError::BadValue { field, .. } => Some(field),
            _ => None,
        }
    }
}
