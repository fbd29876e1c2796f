//! Configuration errors

use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A type selector holds a value nobody recognizes
    #[error("unknown {kind} type: {value}")]
    UnknownType { kind: &'static str, value: String },

    /// A field holds a value outside its allowed range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The JSON document could not be parsed
    #[error("malformed configuration: {0}")]
    Malformed(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
