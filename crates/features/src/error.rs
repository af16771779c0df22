//! Error types for feature encoding.

use thiserror::Error;

/// Errors that can occur while encoding a corpus into feature vectors.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// No movie in the snapshot qualifies for encoding
    #[error("corpus contains no qualifying movies (non-empty genres and a rating are required)")]
    EmptyCorpus,

    /// Too few qualifying movies for a meaningful fit
    #[error("insufficient data: need at least {needed} qualifying movies, found {found}")]
    InsufficientData { needed: usize, found: usize },

    /// A malformed value survived precondition filtering and cleaning
    #[error("invalid feature: {0}")]
    InvalidFeature(String),
}

/// Convenience alias for Results in this crate.
pub type Result<T> = std::result::Result<T, EncodeError>;
