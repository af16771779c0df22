//! # Features Crate
//!
//! Turns a movie corpus snapshot into numeric feature vectors.
//!
//! ## Main Components
//!
//! - **encoder**: The `FeatureEncoder` with its three genre policies
//!   (multi-hot membership, term frequency, tf-idf) and the min-max rating
//!   scaler + column-mean imputer
//! - **matrix**: Dense row-major `FeatureMatrix`
//! - **error**: `EncodeError` (EmptyCorpus / InsufficientData /
//!   InvalidFeature)
//!
//! ## Example Usage
//!
//! ```ignore
//! use features::{EncoderConfig, FeatureEncoder};
//!
//! let encoder = FeatureEncoder::new(EncoderConfig::clustering());
//! let encoded = encoder.encode(&store.all()?)?;
//!
//! println!(
//!     "{} movies over {} feature columns",
//!     encoded.len(),
//!     encoded.matrix().cols()
//! );
//! ```
//!
//! Vectors are ephemeral: dimension and column order depend on the genre
//! vocabulary observed in the snapshot, so encodings from different
//! snapshots are not comparable.

// Public modules
pub mod encoder;
pub mod error;
pub mod matrix;

// Re-export commonly used types for convenience
pub use encoder::{
    EncodedCorpus, EncoderConfig, EncodingParams, EncodingPolicy, FeatureEncoder, MIN_QUALIFYING,
};
pub use error::{EncodeError, Result};
pub use matrix::FeatureMatrix;
