//! Error types for the recommendation engine.

use features::EncodeError;
use movie_store::StoreError;
use thiserror::Error;

/// Errors surfaced by ranking, clustering, and the service facade.
///
/// Nothing here is retried and nothing terminates the process; callers
/// decide how to present each case.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Fuzzy title resolution found nothing above the match threshold
    #[error("no title matching {query:?} cleared the fuzzy-match threshold")]
    NoMatch { query: String },

    /// A selection references something the current clustering doesn't know
    /// (e.g. the movie was deleted or added after the last run)
    #[error("stale selection: {0}")]
    NotFound(String),

    /// Too few qualifying movies for the requested cluster count
    #[error("insufficient data: need at least {needed} qualifying movies, found {found}")]
    InsufficientData { needed: usize, found: usize },

    /// Feature encoding failed
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The corpus store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for Results in this crate.
pub type Result<T> = std::result::Result<T, EngineError>;
