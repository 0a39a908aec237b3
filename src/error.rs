//! Error types for the corpus loaders.
//!
//! Loader stages return these internally. The public entry points swallow
//! them and degrade to empty collections.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Errors that can occur while loading the corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Error reading a file or listing a directory.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A structured data file could not be parsed.
    #[error("Malformed JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Directory traversal failed.
    #[error("Directory scan failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// The project root has no parent to hold the chapter library.
    #[error("Project root '{0}' has no parent directory")]
    NoProjectParent(PathBuf),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CorpusError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a JSON parse error with path context.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}
