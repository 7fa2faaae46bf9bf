//! Error types for calltree-core.
//!
//! Every failure here is scoped to a single upstream record or a single
//! configuration value. The shard iterator logs and skips record failures;
//! running out of records is a state, not an error.

use thiserror::Error;

/// Result type alias for per-record operations.
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors raised while turning one raw record into a shard.
#[derive(Error, Debug)]
pub enum RecordError {
    /// The source text is not valid Python.
    #[error("Parse failure at line {line}: {message}")]
    ParseFailure {
        /// 1-indexed line of the first syntax error.
        line: u32,
        /// Description of the failure.
        message: String,
    },

    /// The record parsed but contained no callable units.
    #[error("Empty extraction: no callable units found")]
    EmptyExtraction,

    /// Tree building produced no root to wrap in a shard.
    #[error("Shard construction failed: {message}")]
    ShardConstruction {
        /// Description of the failure.
        message: String,
    },

    /// The record has a shape no loader recognises.
    #[error("Invalid record: {message}")]
    InvalidRecord {
        /// Description of what was wrong.
        message: String,
    },

    /// JSON decoding error for persisted records.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecordError {
    pub(crate) fn parse(line: u32, message: impl Into<String>) -> Self {
        RecordError::ParseFailure {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn construction(message: impl Into<String>) -> Self {
        RecordError::ShardConstruction {
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        RecordError::InvalidRecord {
            message: message.into(),
        }
    }
}

/// Invalid loader configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range.
    #[error("Invalid value for `{field}`: {message}")]
    InvalidValue {
        /// Name of the offending option.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}
