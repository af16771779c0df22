//! Error types for the movie-store crate.

use crate::types::MovieId;
use thiserror::Error;

/// Errors from the corpus store and the bulk importer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error while reading a data file or snapshot
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Line in an import file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    Parse {
        file: String,
        line: usize,
        reason: String,
    },

    /// Snapshot file couldn't be serialized or deserialized
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Referenced movie id doesn't exist (e.g. deleted between read and write)
    #[error("No movie with id {0}")]
    UnknownMovie(MovieId),
}

/// Convenience alias for Results in this crate.
pub type Result<T> = std::result::Result<T, StoreError>;
