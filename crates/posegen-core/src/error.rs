//! Error types for posegen.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for posegen operations.
pub type Result<T> = std::result::Result<T, PosegenError>;

/// Errors that can occur in posegen operations.
#[derive(Error, Debug)]
pub enum PosegenError {
    /// A dataset file is not valid JSON or lacks required fields.
    #[error("malformed record {}: {reason}", path.display())]
    MalformedRecord {
        /// Offending file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Generated text contains no balanced JSON object.
    #[error("no JSON object found in generated text ({} chars)", raw.len())]
    NoJsonFound {
        /// The full generated text, kept for diagnostics.
        raw: String,
    },

    /// A located JSON slice failed to parse.
    #[error("JSON parse error: {message} in {slice:?}")]
    JsonParse {
        /// Underlying parser message.
        message: String,
        /// The slice handed to the parser.
        slice: String,
    },

    /// A model or tokenizer could not be loaded.
    #[error("model unavailable at {path}: {reason}")]
    ModelUnavailable {
        /// Attempted path or hub repository id.
        path: String,
        /// Why loading failed.
        reason: String,
    },

    /// Tokenizer error.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Training error.
    #[error("training error: {0}")]
    Training(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Model hub error.
    #[error("hub error: {0}")]
    Hub(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

impl PosegenError {
    /// Build a [`PosegenError::MalformedRecord`].
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`PosegenError::ModelUnavailable`].
    pub fn model_unavailable(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::ModelUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is recovered locally in batch contexts.
    ///
    /// Batch loaders and converters skip the offending file on these and keep
    /// going; everything else aborts the operation.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            PosegenError::MalformedRecord { .. } | PosegenError::JsonParse { .. }
        )
    }
}
