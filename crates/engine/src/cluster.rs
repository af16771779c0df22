//! Cluster Assigner: partition the corpus and persist group membership.
//!
//! Clustering runs over the combined feature space (genre membership +
//! scaled rating) and replaces every movie's cluster label wholesale.
//! Movies failing the encoding precondition are excluded from the fit and
//! end the run explicitly unclustered, never defaulted to group 0.

use crate::error::{EngineError, Result};
use crate::kmeans::{DEFAULT_MAX_ITER, DEFAULT_TOLERANCE, KMeans};
use features::{EncoderConfig, FeatureEncoder};
use movie_store::{ClusterLabel, CorpusStore, Movie, MovieId};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Clustering parameters. `k` and `seed` carry no defaults: the cluster
/// count is a call-site decision and the seed is what makes runs
/// reproducible, so both must be stated.
#[derive(Debug, Clone, Copy)]
pub struct ClusterConfig {
    pub k: usize,
    pub seed: u64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl ClusterConfig {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            seed,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Fits cluster assignments over corpus snapshots.
pub struct ClusterAssigner {
    config: ClusterConfig,
    encoder: FeatureEncoder,
}

impl ClusterAssigner {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            config,
            encoder: FeatureEncoder::new(EncoderConfig::clustering()),
        }
    }

    /// Use a non-default feature space (e.g. genre text instead of
    /// membership indicators).
    pub fn with_encoder_config(config: ClusterConfig, encoder: EncoderConfig) -> Self {
        Self {
            config,
            encoder: FeatureEncoder::new(encoder),
        }
    }

    /// Partition one corpus snapshot into `k` groups.
    #[instrument(skip(self, corpus), fields(corpus = corpus.len(), k = self.config.k))]
    pub fn cluster(&self, corpus: &[Movie]) -> Result<ClusterAssignment> {
        let encoded = self.encoder.encode(corpus)?;

        if encoded.len() < self.config.k {
            return Err(EngineError::InsufficientData {
                needed: self.config.k,
                found: encoded.len(),
            });
        }

        let fit = KMeans::new(self.config.k, self.config.seed)
            .with_max_iter(self.config.max_iter)
            .with_tolerance(self.config.tolerance)
            .fit(encoded.matrix())?;

        let labels: HashMap<MovieId, ClusterLabel> = encoded
            .ids()
            .iter()
            .zip(&fit.labels)
            .map(|(&id, &label)| (id, label as ClusterLabel))
            .collect();
        let excluded: Vec<MovieId> = corpus
            .iter()
            .filter(|m| !m.is_qualifying())
            .map(|m| m.id)
            .collect();

        info!(
            clustered = labels.len(),
            excluded = excluded.len(),
            inertia = fit.inertia,
            n_iter = fit.n_iter,
            "assigned corpus to {} clusters",
            self.config.k
        );

        Ok(ClusterAssignment {
            k: self.config.k,
            order: encoded.ids().to_vec(),
            labels,
            excluded,
            inertia: fit.inertia,
        })
    }
}

/// The outcome of one clustering run.
///
/// Labels are only meaningful inside this assignment; a new run may permute
/// them freely even over the same corpus.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    k: usize,
    /// Clustered movie ids in corpus order.
    order: Vec<MovieId>,
    labels: HashMap<MovieId, ClusterLabel>,
    /// Movies in the snapshot that failed the encoding precondition.
    excluded: Vec<MovieId>,
    inertia: f64,
}

impl ClusterAssignment {
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of movies that received a label.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    pub fn label_of(&self, id: MovieId) -> Option<ClusterLabel> {
        self.labels.get(&id).copied()
    }

    /// Ids of the movies the fit left unclustered.
    pub fn excluded(&self) -> &[MovieId] {
        &self.excluded
    }

    /// All movies carrying a label, in corpus order.
    pub fn members_of(&self, label: ClusterLabel) -> Vec<MovieId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.labels.get(id) == Some(&label))
            .collect()
    }

    /// Movies sharing a cluster with `id`, excluding `id` itself.
    ///
    /// Fails with `NotFound` when `id` isn't part of this assignment —
    /// typically a selection gone stale after a delete or a later insert.
    pub fn similar_to(&self, id: MovieId) -> Result<Vec<MovieId>> {
        let label = self
            .label_of(id)
            .ok_or_else(|| EngineError::NotFound(format!("movie id {id}")))?;
        Ok(self
            .members_of(label)
            .into_iter()
            .filter(|&other| other != id)
            .collect())
    }

    /// Write this assignment back to the store: set the fresh label on every
    /// clustered movie and clear the label on every excluded one.
    ///
    /// This is a record-at-a-time batch, not a transaction. A failure part
    /// way through leaves earlier records updated and later ones stale; the
    /// caller sees the error and can rerun.
    pub fn persist(&self, store: &dyn CorpusStore) -> Result<()> {
        for id in &self.order {
            store.set_cluster(*id, self.labels[id])?;
        }
        for id in &self.excluded {
            store.clear_cluster(*id)?;
        }
        info!(
            updated = self.order.len(),
            cleared = self.excluded.len(),
            "persisted cluster labels"
        );
        Ok(())
    }
}
