//! Feature encoding: genre labels + rating into fixed-length vectors.
//!
//! The encoder turns one snapshot of the corpus into a feature matrix. The
//! vocabulary, scaling bounds, and column means are derived from that
//! snapshot alone and returned alongside the matrix; nothing here is stable
//! across runs unless the snapshot is identical.
//!
//! ## Pipeline
//! 1. Filter to qualifying movies (non-empty genres, non-null rating)
//! 2. Build the genre vocabulary and fill the genre columns per policy
//! 3. Min-max scale the rating into the final column (when enabled)
//! 4. Impute: replace non-finite cells with the column mean over the batch

use crate::error::{EncodeError, Result};
use crate::matrix::FeatureMatrix;
use movie_store::{Movie, MovieId};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument};

/// Minimum number of qualifying movies for any encode to be meaningful
/// (enough to support the tool's customary 5-way clustering).
pub const MIN_QUALIFYING: usize = 5;

/// How genre labels become numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingPolicy {
    /// One column per distinct genre label, 1.0 when the movie carries it.
    /// The membership encoding used for clustering.
    #[default]
    MultiHot,
    /// Genre labels treated as text: one column per token, token counts as
    /// values. The text-similarity encoding used for ranking.
    TermFrequency,
    /// Term frequency reweighted by smoothed inverse document frequency,
    /// L2-normalized per row.
    Tfidf,
}

/// Encoder configuration. The rating column is optional because the ranking
/// path measures genre-text similarity only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncoderConfig {
    pub policy: EncodingPolicy,
    pub include_rating: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::clustering()
    }
}

impl EncoderConfig {
    /// Genre membership + scaled rating: the Cluster Assigner's feature set.
    pub fn clustering() -> Self {
        Self {
            policy: EncodingPolicy::MultiHot,
            include_rating: true,
        }
    }

    /// Genre text only, no rating: the Similarity Ranker's feature set.
    pub fn text_similarity() -> Self {
        Self {
            policy: EncodingPolicy::TermFrequency,
            include_rating: false,
        }
    }

    pub fn with_policy(mut self, policy: EncodingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_rating(mut self, include_rating: bool) -> Self {
        self.include_rating = include_rating;
        self
    }
}

/// The parameters a particular encode derived from its snapshot. Returned
/// for auditability and tests; never reused across runs.
#[derive(Debug, Clone)]
pub struct EncodingParams {
    pub policy: EncodingPolicy,
    /// Column order of the genre block (lexicographically sorted).
    pub vocabulary: Vec<String>,
    /// Observed rating bounds, when the rating column is enabled and at
    /// least one rating was finite.
    pub rating_min: Option<f64>,
    pub rating_max: Option<f64>,
    /// Post-scaling column means used for imputation.
    pub column_means: Vec<f64>,
}

/// One encoded snapshot: the matrix plus the row <-> movie mapping.
#[derive(Debug, Clone)]
pub struct EncodedCorpus {
    ids: Vec<MovieId>,
    index: HashMap<MovieId, usize>,
    matrix: FeatureMatrix,
    params: EncodingParams,
}

impl EncodedCorpus {
    /// Number of encoded (qualifying) movies.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Encoded movie ids in corpus order (row order).
    pub fn ids(&self) -> &[MovieId] {
        &self.ids
    }

    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    pub fn params(&self) -> &EncodingParams {
        &self.params
    }

    /// Row index of a movie within this encode, if it qualified.
    pub fn row_index(&self, id: MovieId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Feature vector of a movie, if it qualified.
    pub fn row_of(&self, id: MovieId) -> Option<&[f64]> {
        self.row_index(id).map(|i| self.matrix.row(i))
    }
}

/// Encodes corpus snapshots under a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    config: EncoderConfig,
}

impl FeatureEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode one corpus snapshot.
    ///
    /// Non-qualifying movies are skipped entirely; they hold no row and can
    /// never reach the ranker or the clusterer.
    #[instrument(skip(self, corpus), fields(corpus = corpus.len()))]
    pub fn encode(&self, corpus: &[Movie]) -> Result<EncodedCorpus> {
        let qualifying: Vec<&Movie> = corpus.iter().filter(|m| m.is_qualifying()).collect();

        if qualifying.is_empty() {
            return Err(EncodeError::EmptyCorpus);
        }
        if qualifying.len() < MIN_QUALIFYING {
            return Err(EncodeError::InsufficientData {
                needed: MIN_QUALIFYING,
                found: qualifying.len(),
            });
        }

        // One token list per movie, normalized per policy
        let docs: Vec<Vec<String>> = qualifying
            .iter()
            .map(|movie| normalize_genres(movie, self.config.policy))
            .collect::<Result<_>>()?;

        // Vocabulary = sorted distinct tokens across the snapshot
        let vocabulary: Vec<String> = docs
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        if vocabulary.is_empty() {
            return Err(EncodeError::InvalidFeature(
                "genre labels produced an empty vocabulary".to_string(),
            ));
        }
        let vocab_index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(j, token)| (token.as_str(), j))
            .collect();

        let genre_cols = vocabulary.len();
        let cols = genre_cols + usize::from(self.config.include_rating);
        let mut matrix = FeatureMatrix::zeros(qualifying.len(), cols);

        for (i, doc) in docs.iter().enumerate() {
            let row = matrix.row_mut(i);
            for token in doc {
                let j = vocab_index[token.as_str()];
                match self.config.policy {
                    EncodingPolicy::MultiHot => row[j] = 1.0,
                    EncodingPolicy::TermFrequency | EncodingPolicy::Tfidf => row[j] += 1.0,
                }
            }
        }

        if self.config.policy == EncodingPolicy::Tfidf {
            apply_tfidf(&mut matrix, genre_cols);
        }

        let (rating_min, rating_max) = if self.config.include_rating {
            scale_ratings(&mut matrix, &qualifying, genre_cols)
        } else {
            (None, None)
        };

        let column_means = impute_missing(&mut matrix);

        // Everything must be finite after imputation; anything else is a
        // malformed value the cleaning step could not repair.
        for (i, row) in matrix.iter_rows().enumerate() {
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(EncodeError::InvalidFeature(format!(
                    "non-finite value at row {i}, column {j} after imputation"
                )));
            }
        }

        let ids: Vec<MovieId> = qualifying.iter().map(|m| m.id).collect();
        let index: HashMap<MovieId, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        debug!(
            rows = matrix.rows(),
            cols = matrix.cols(),
            policy = ?self.config.policy,
            "encoded corpus snapshot"
        );

        Ok(EncodedCorpus {
            ids,
            index,
            matrix,
            params: EncodingParams {
                policy: self.config.policy,
                vocabulary,
                rating_min,
                rating_max,
                column_means,
            },
        })
    }
}

/// Normalize a movie's genre labels into vocabulary tokens.
///
/// MultiHot keeps whole labels; the text policies split labels into
/// alphanumeric tokens (so "Sci-Fi" contributes `sci` and `fi`).
fn normalize_genres(movie: &Movie, policy: EncodingPolicy) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    for raw in &movie.genres {
        let label = raw.trim().to_lowercase();
        if label.is_empty() {
            return Err(EncodeError::InvalidFeature(format!(
                "empty genre label on movie {:?}",
                movie.title
            )));
        }
        match policy {
            EncodingPolicy::MultiHot => tokens.push(label),
            EncodingPolicy::TermFrequency | EncodingPolicy::Tfidf => {
                tokens.extend(
                    label
                        .split(|c: char| !c.is_alphanumeric())
                        .filter(|t| !t.is_empty())
                        .map(str::to_string),
                );
            }
        }
    }
    Ok(tokens)
}

/// Reweight term counts by smoothed inverse document frequency and
/// L2-normalize each row over the genre block.
///
/// idf(t) = ln((1 + n) / (1 + df(t))) + 1
fn apply_tfidf(matrix: &mut FeatureMatrix, genre_cols: usize) {
    let n = matrix.rows();

    let mut df = vec![0usize; genre_cols];
    for i in 0..n {
        let row = matrix.row(i);
        for (j, count) in df.iter_mut().enumerate() {
            if row[j] > 0.0 {
                *count += 1;
            }
        }
    }

    let idf: Vec<f64> = df
        .iter()
        .map(|&d| ((1 + n) as f64 / (1 + d) as f64).ln() + 1.0)
        .collect();

    for i in 0..n {
        let row = matrix.row_mut(i);
        for j in 0..genre_cols {
            row[j] *= idf[j];
        }
        let norm = row[..genre_cols]
            .iter()
            .map(|v| v * v)
            .sum::<f64>()
            .sqrt();
        if norm > 0.0 {
            for value in &mut row[..genre_cols] {
                *value /= norm;
            }
        }
    }
}

/// Min-max scale ratings into `[0, 1]` against the snapshot's own bounds.
///
/// A snapshot with a single distinct rating has zero span; every rating then
/// scales to 0.0 rather than dividing by zero. Non-finite ratings become NaN
/// here and are repaired by the imputation pass.
fn scale_ratings(
    matrix: &mut FeatureMatrix,
    qualifying: &[&Movie],
    rating_col: usize,
) -> (Option<f64>, Option<f64>) {
    let finite: Vec<f64> = qualifying
        .iter()
        .filter_map(|m| m.rating)
        .map(f64::from)
        .filter(|r| r.is_finite())
        .collect();

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if finite.is_empty() {
        for i in 0..matrix.rows() {
            matrix.set(i, rating_col, f64::NAN);
        }
        return (None, None);
    }

    let span = max - min;
    for (i, movie) in qualifying.iter().enumerate() {
        // Qualifying guarantees Some; the value may still be non-finite.
        let rating = movie.rating.map(f64::from).unwrap_or(f64::NAN);
        let scaled = if !rating.is_finite() {
            f64::NAN
        } else if span > 0.0 {
            (rating - min) / span
        } else {
            0.0
        };
        matrix.set(i, rating_col, scaled);
    }

    (Some(min), Some(max))
}

/// Replace non-finite cells with their column's mean over finite cells.
/// Runs after scaling, before anything downstream sees the matrix. A column
/// with no finite cells imputes to 0.0. Returns the means used.
fn impute_missing(matrix: &mut FeatureMatrix) -> Vec<f64> {
    let (rows, cols) = (matrix.rows(), matrix.cols());
    let mut means = vec![0.0f64; cols];

    for j in 0..cols {
        let mut sum = 0.0;
        let mut count = 0usize;
        for i in 0..rows {
            let value = matrix.get(i, j);
            if value.is_finite() {
                sum += value;
                count += 1;
            }
        }
        let mean = if count > 0 { sum / count as f64 } else { 0.0 };
        means[j] = mean;

        for i in 0..rows {
            if !matrix.get(i, j).is_finite() {
                matrix.set(i, j, mean);
            }
        }
    }

    means
}
