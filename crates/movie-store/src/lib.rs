//! # Movie Store Crate
//!
//! The corpus layer of the recommendation engine: movie documents, the
//! narrow store interface the engine consumes, and the surfaces that feed
//! the corpus.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, NewMovie, MovieQuery)
//! - **store**: The `CorpusStore` trait and the in-memory / JSON-snapshot
//!   implementation
//! - **parser**: Bulk import of movies.csv + ratings.csv
//! - **stats**: Corpus aggregates (genre frequencies, per-genre means,
//!   top-rated)
//! - **shelf**: Per-user likes and watched / to-watch tags
//! - **error**: Error types for storage and import
//!
//! ## Example Usage
//!
//! ```ignore
//! use movie_store::{CorpusStore, MemoryStore, MovieQuery, RatingSort};
//!
//! let store = MemoryStore::load(Path::new("corpus.json"))?;
//!
//! let query = MovieQuery::new()
//!     .with_genre("Action")
//!     .with_min_rating(3.5)
//!     .with_sort(RatingSort::Descending)
//!     .with_limit(20);
//!
//! for movie in store.find(&query)? {
//!     println!("{} ({:?})", movie.title, movie.rating);
//! }
//! ```

// Public modules
pub mod error;
pub mod parser;
pub mod shelf;
pub mod stats;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{Result, StoreError};
pub use parser::{ImportReport, load_corpus};
pub use shelf::{Shelf, Tag};
pub use store::{CorpusStore, MemoryStore};
pub use types::{ClusterLabel, Movie, MovieId, MovieQuery, NewMovie, RatingSort};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert!(store.all().unwrap().is_empty());
        assert!(store.get(0).unwrap().is_none());
    }

    #[test]
    fn test_insert_then_query() {
        let store = MemoryStore::new();
        let id = store
            .insert(NewMovie::new(
                "Alien (1979)",
                vec!["Horror".into(), "Sci-Fi".into()],
                Some(4.4),
            ))
            .unwrap();

        let movie = store.get(id).unwrap().unwrap();
        assert_eq!(movie.title, "Alien (1979)");
        assert!(movie.is_qualifying());
        assert_eq!(movie.cluster, None);
    }
}
