//! The recommendation service facade.
//!
//! Wires store -> encoder -> ranker / cluster assigner for callers that
//! think in titles and store handles rather than matrices. The store handle
//! is injected, never global, so tests run against an in-memory corpus.
//!
//! Everything here is synchronous: each call reads a fresh snapshot, runs to
//! completion on the calling thread, and surfaces any failure immediately.

use crate::cluster::{ClusterAssigner, ClusterAssignment, ClusterConfig};
use crate::error::{EngineError, Result};
use crate::ranker::{RankedMovie, SimilarityRanker};
use movie_store::{CorpusStore, Movie};
use std::sync::Arc;
use tracing::instrument;

/// Facade over the recommendation core for one corpus store.
pub struct RecommendService {
    store: Arc<dyn CorpusStore>,
    /// Outcome of the most recent [`RecommendService::recluster`] call.
    last_clustering: Option<ClusterAssignment>,
}

impl RecommendService {
    pub fn new(store: Arc<dyn CorpusStore>) -> Self {
        Self {
            store,
            last_clustering: None,
        }
    }

    /// Top `top_n` movies most similar to `title` (exact or fuzzy match).
    #[instrument(skip(self))]
    pub fn recommend(&self, title: &str, top_n: usize) -> Result<Vec<RankedMovie>> {
        let corpus = self.store.all()?;
        let ranker = SimilarityRanker::fit(&corpus)?;
        ranker.rank(title, top_n)
    }

    /// Re-cluster the whole corpus into `k` groups and persist the labels.
    ///
    /// Replaces any previous clustering, both in the store and in this
    /// service's memory of the last run.
    #[instrument(skip(self))]
    pub fn recluster(&mut self, k: usize, seed: u64) -> Result<&ClusterAssignment> {
        let corpus = self.store.all()?;
        let assignment = ClusterAssigner::new(ClusterConfig::new(k, seed)).cluster(&corpus)?;
        assignment.persist(self.store.as_ref())?;
        Ok(self.last_clustering.insert(assignment))
    }

    /// Movies sharing the last clustering's group with `title`, excluding
    /// the movie itself.
    ///
    /// Fails with `NotFound` when no clustering has been run, when the title
    /// no longer resolves in the corpus, or when the resolved movie wasn't
    /// part of the last run (stale selection).
    #[instrument(skip(self))]
    pub fn similar_in_cluster(&self, title: &str) -> Result<Vec<Movie>> {
        let assignment = self
            .last_clustering
            .as_ref()
            .ok_or_else(|| EngineError::NotFound("no clustering has been run".to_string()))?;

        let corpus = self.store.all()?;
        let selected = corpus
            .iter()
            .find(|m| m.title.eq_ignore_ascii_case(title))
            .ok_or_else(|| EngineError::NotFound(format!("title {title:?}")))?;

        let ids = assignment.similar_to(selected.id)?;
        // A movie deleted since the run simply drops out of the answer
        Ok(ids
            .into_iter()
            .filter_map(|id| self.store.get(id).transpose())
            .collect::<movie_store::Result<Vec<Movie>>>()?)
    }

    /// The most recent clustering, if any.
    pub fn last_clustering(&self) -> Option<&ClusterAssignment> {
        self.last_clustering.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movie_store::{MemoryStore, NewMovie};

    fn seeded_service() -> RecommendService {
        let store = MemoryStore::from_movies([
            NewMovie::new("Movie A", vec!["Action".into(), "Comedy".into()], Some(4.0)),
            NewMovie::new("Movie B", vec!["Action".into()], Some(3.0)),
            NewMovie::new("Movie C", vec!["Comedy".into()], Some(5.0)),
            NewMovie::new("Movie D", vec!["Action".into(), "Comedy".into()], Some(4.5)),
            NewMovie::new("Movie E", vec!["Drama".into()], Some(2.0)),
        ]);
        RecommendService::new(Arc::new(store))
    }

    #[test]
    fn test_recommend_through_the_store() {
        let service = seeded_service();
        let results = service.recommend("Movie A", 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Movie D");
        assert_eq!(results[1].title, "Movie B");
    }

    #[test]
    fn test_recluster_persists_labels() {
        let mut service = seeded_service();
        let k = 2;
        service.recluster(k, 42).unwrap();

        for movie in service.store.all().unwrap() {
            let label = movie.cluster.expect("every qualifying movie is labeled");
            assert!((label as usize) < k);
        }
    }

    #[test]
    fn test_similar_in_cluster_before_any_run_is_not_found() {
        let service = seeded_service();
        let result = service.similar_in_cluster("Movie A");
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_similar_in_cluster_excludes_the_selection() {
        let mut service = seeded_service();
        service.recluster(2, 42).unwrap();

        let similar = service.similar_in_cluster("Movie A").unwrap();
        assert!(similar.iter().all(|m| m.title != "Movie A"));
        assert!(!similar.is_empty());
    }

    #[test]
    fn test_selection_added_after_run_is_stale() {
        let mut service = seeded_service();
        service.recluster(2, 42).unwrap();

        service
            .store
            .insert(NewMovie::new("Movie F", vec!["Drama".into()], Some(3.0)))
            .unwrap();

        let result = service.similar_in_cluster("Movie F");
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_deleted_title_is_stale() {
        let mut service = seeded_service();
        service.recluster(2, 42).unwrap();

        service.store.delete_by_title("Movie A").unwrap();
        let result = service.similar_in_cluster("Movie A");
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_deleted_neighbor_drops_out_of_similar() {
        let mut service = seeded_service();
        service.recluster(1, 42).unwrap();

        // With k=1 everything shares one cluster
        let before = service.similar_in_cluster("Movie A").unwrap();
        assert_eq!(before.len(), 4);

        service.store.delete_by_title("Movie E").unwrap();
        let after = service.similar_in_cluster("Movie A").unwrap();
        assert_eq!(after.len(), 3);
        assert!(after.iter().all(|m| m.title != "Movie E"));
    }
}
