//! # Engine Crate
//!
//! The recommendation core: similarity ranking and cluster assignment over
//! an encoded movie corpus.
//!
//! ## Components
//!
//! ### Similarity Ranker
//! "Movies like this one" by cosine similarity over genre-text vectors:
//! - Exact title match first, fuzzy edit-distance match as fallback
//! - Stable descending ranking, query excluded, top-N truncation
//!
//! ### Cluster Assigner
//! Seeded k-means over genre membership + scaled rating:
//! - Explicit `k` and seed at every call site, reproducible groupings
//! - Labels persisted wholesale through the `CorpusStore` trait
//! - Co-cluster lookup for "similar movies" on a finished run
//!
//! ### RecommendService
//! The facade gluing a store handle to both components for callers that
//! work in titles.
//!
//! ## Example Usage
//!
//! ```ignore
//! use engine::{ClusterConfig, RecommendService};
//! use movie_store::MemoryStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::load(Path::new("corpus.json"))?);
//! let mut service = RecommendService::new(store);
//!
//! for rec in service.recommend("Heat", 5)? {
//!     println!("{} ({:.2})", rec.title, rec.score);
//! }
//!
//! service.recluster(5, 42)?;
//! let similar = service.similar_in_cluster("Heat")?;
//! ```

// Public modules
pub mod cluster;
pub mod error;
pub mod fuzzy;
pub mod kmeans;
pub mod ranker;
pub mod service;
pub mod similarity;

// Re-export commonly used types
pub use cluster::{ClusterAssigner, ClusterAssignment, ClusterConfig};
pub use error::{EngineError, Result};
pub use kmeans::{KMeans, KMeansFit};
pub use ranker::{RankedMovie, SimilarityRanker};
pub use service::RecommendService;
pub use similarity::cosine_similarity;
