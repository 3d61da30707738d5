use crate::template::TemplateError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("{transform} transform expects {expected} input, got {found}")]
    TypeMismatch {
        transform: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("key '{key}' not found in map")]
    KeyNotFound { key: String },

    #[error("'{input}' does not {position} with '{affix}'")]
    AffixNotFound {
        input: String,
        affix: String,
        position: &'static str,
    },

    #[error("invalid regexp '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("regexp '{pattern}' did not match '{input}'")]
    NoMatch { pattern: String, input: String },

    #[error("regexp '{pattern}' has no capture group {group}")]
    NoSuchGroup { pattern: String, group: usize },

    #[error("cannot convert {from} to {to}: {message}")]
    ConversionFailed {
        from: &'static str,
        to: &'static str,
        message: String,
    },

    #[error("math transform produced an unrepresentable number: {message}")]
    InvalidNumber { message: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// A transform chain stopped at the transform with position `index`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transform {index} failed: {source}")]
pub struct TransformFailed {
    pub index: usize,
    #[source]
    pub source: TransformError,
}
