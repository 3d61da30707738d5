use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("invalid field path '{input}': {message}")]
    InvalidPath { input: String, message: String },

    #[error("cannot write {path}: segment '{segment}' expects {expected} but found {found}")]
    PathConflict {
        path: String,
        segment: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot write {path}: index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { path: String, index: i64, len: usize },
}
