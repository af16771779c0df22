//! The corpus store: the narrow CRUD surface the engine consumes.
//!
//! The engine never talks to a concrete storage backend. It takes a
//! `&dyn CorpusStore` (or an `Arc` of one), which keeps the recommendation
//! core testable against an in-memory fake and the backend swappable.

use crate::error::{Result, StoreError};
use crate::types::{ClusterLabel, Movie, MovieId, MovieQuery, NewMovie, RatingSort};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

/// Read/write interface over the movie corpus.
///
/// Methods take `&self`; implementations provide their own interior locking.
/// The store is treated as externally synchronized: concurrent writers are
/// last-write-wins at the record level, and none of these operations span
/// more than one record transactionally.
pub trait CorpusStore: Send + Sync {
    /// Every movie, in insertion order. Insertion order is load-bearing: it
    /// is the tie-break order for similarity ranking.
    fn all(&self) -> Result<Vec<Movie>>;

    /// Movies matching the query filters, sorted and limited per the query.
    fn find(&self, query: &MovieQuery) -> Result<Vec<Movie>>;

    /// Fetch one movie by id.
    fn get(&self, id: MovieId) -> Result<Option<Movie>>;

    /// Insert a movie and return its assigned id.
    fn insert(&self, movie: NewMovie) -> Result<MovieId>;

    /// Delete the first movie (in insertion order) with this exact title.
    /// Returns the number of records removed (0 or 1). Deletion is terminal;
    /// there is no tombstone.
    fn delete_by_title(&self, title: &str) -> Result<usize>;

    /// Overwrite the cluster label on one movie.
    fn set_cluster(&self, id: MovieId, label: ClusterLabel) -> Result<()>;

    /// Remove the cluster label from one movie.
    fn clear_cluster(&self, id: MovieId) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Inner {
    next_id: MovieId,
    /// Insertion order of live documents.
    order: Vec<MovieId>,
    movies: HashMap<MovieId, Movie>,
}

/// In-memory corpus store with JSON snapshot persistence.
///
/// Stands in for the document database of the original deployment. A
/// snapshot file round-trips the whole corpus, which is plenty at the corpus
/// sizes this tool works with.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from pre-assembled records (bulk import path).
    pub fn from_movies(movies: impl IntoIterator<Item = NewMovie>) -> Self {
        let store = Self::new();
        for movie in movies {
            // Insert on a fresh store cannot fail.
            let _ = store.insert(movie);
        }
        store
    }

    /// Load a snapshot written by [`MemoryStore::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let inner: Inner = serde_json::from_slice(&bytes)?;
        info!(movies = inner.order.len(), "loaded corpus snapshot");
        Ok(Self {
            inner: RwLock::new(inner),
        })
    }

    /// Write the whole corpus to a JSON snapshot file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let inner = self.read();
        let bytes = serde_json::to_vec_pretty(&*inner)?;
        std::fs::write(path, bytes)?;
        debug!(movies = inner.order.len(), "saved corpus snapshot");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().order.is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("store lock poisoned")
    }
}

impl CorpusStore for MemoryStore {
    fn all(&self) -> Result<Vec<Movie>> {
        let inner = self.read();
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.movies.get(id).cloned())
            .collect())
    }

    fn find(&self, query: &MovieQuery) -> Result<Vec<Movie>> {
        let inner = self.read();
        let mut results: Vec<Movie> = inner
            .order
            .iter()
            .filter_map(|id| inner.movies.get(id))
            .filter(|movie| query.matches(movie))
            .cloned()
            .collect();

        // Unrated movies sort last in either direction.
        match query.sort {
            RatingSort::Unsorted => {}
            RatingSort::Ascending => results.sort_by(|a, b| {
                match (a.rating, b.rating) {
                    (Some(ra), Some(rb)) => {
                        ra.partial_cmp(&rb).unwrap_or(std::cmp::Ordering::Equal)
                    }
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            }),
            RatingSort::Descending => results.sort_by(|a, b| {
                match (a.rating, b.rating) {
                    (Some(ra), Some(rb)) => {
                        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
                    }
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            }),
        }

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn get(&self, id: MovieId) -> Result<Option<Movie>> {
        Ok(self.read().movies.get(&id).cloned())
    }

    fn insert(&self, movie: NewMovie) -> Result<MovieId> {
        let mut inner = self.write();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.order.push(id);
        inner.movies.insert(
            id,
            Movie {
                id,
                external_id: movie.external_id,
                title: movie.title,
                genres: movie.genres,
                rating: movie.rating,
                cluster: None,
            },
        );
        Ok(id)
    }

    fn delete_by_title(&self, title: &str) -> Result<usize> {
        let mut inner = self.write();
        let target = inner
            .order
            .iter()
            .copied()
            .find(|id| inner.movies.get(id).is_some_and(|m| m.title == title));

        match target {
            Some(id) => {
                inner.movies.remove(&id);
                inner.order.retain(|&other| other != id);
                debug!(title, id, "deleted movie");
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn set_cluster(&self, id: MovieId, label: ClusterLabel) -> Result<()> {
        let mut inner = self.write();
        let movie = inner
            .movies
            .get_mut(&id)
            .ok_or(StoreError::UnknownMovie(id))?;
        movie.cluster = Some(label);
        Ok(())
    }

    fn clear_cluster(&self, id: MovieId) -> Result<()> {
        let mut inner = self.write();
        let movie = inner
            .movies
            .get_mut(&id)
            .ok_or(StoreError::UnknownMovie(id))?;
        movie.cluster = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_store() -> MemoryStore {
        MemoryStore::from_movies([
            NewMovie::new("The Matrix (1999)", vec!["Action".into(), "Sci-Fi".into()], Some(4.5)),
            NewMovie::new("Toy Story (1995)", vec!["Animation".into(), "Comedy".into()], Some(4.0)),
            NewMovie::new("Unseen Footage", vec!["Documentary".into()], None),
            NewMovie::new("Heat (1995)", vec!["Action".into(), "Crime".into()], Some(4.2)),
        ])
    }

    #[test]
    fn test_insert_preserves_order_and_assigns_ids() {
        let store = seeded_store();
        let all = store.all().unwrap();

        assert_eq!(all.len(), 4);
        assert_eq!(all[0].title, "The Matrix (1999)");
        assert_eq!(all[3].title, "Heat (1995)");
        // Ids are distinct and monotonically assigned
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_find_with_genre_and_min_rating() {
        let store = seeded_store();
        let query = MovieQuery::new().with_genre("Action").with_min_rating(4.3);

        let results = store.find(&query).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "The Matrix (1999)");
    }

    #[test]
    fn test_find_sorted_descending_with_limit() {
        let store = seeded_store();
        let query = MovieQuery::new()
            .with_sort(RatingSort::Descending)
            .with_limit(2);

        let results = store.find(&query).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "The Matrix (1999)");
        assert_eq!(results[1].title, "Heat (1995)");
    }

    #[test]
    fn test_unrated_movies_sort_last() {
        let store = seeded_store();
        let query = MovieQuery::new().with_sort(RatingSort::Ascending);

        let results = store.find(&query).unwrap();
        assert_eq!(results.last().unwrap().title, "Unseen Footage");
    }

    #[test]
    fn test_delete_by_title_removes_first_match_only() {
        let store = seeded_store();
        store
            .insert(NewMovie::new("Heat (1995)", vec!["Drama".into()], Some(3.0)))
            .unwrap();

        assert_eq!(store.delete_by_title("Heat (1995)").unwrap(), 1);
        let remaining = store.all().unwrap();
        // The duplicate inserted later survives
        assert_eq!(
            remaining.iter().filter(|m| m.title == "Heat (1995)").count(),
            1
        );
        assert_eq!(remaining.last().unwrap().genres, vec!["Drama".to_string()]);

        assert_eq!(store.delete_by_title("Nope").unwrap(), 0);
    }

    #[test]
    fn test_cluster_label_roundtrip() {
        let store = seeded_store();
        let id = store.all().unwrap()[0].id;

        store.set_cluster(id, 3).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().cluster, Some(3));

        store.clear_cluster(id).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().cluster, None);
    }

    #[test]
    fn test_cluster_update_on_missing_id_is_reported() {
        let store = seeded_store();
        let result = store.set_cluster(9999, 0);
        assert!(matches!(result, Err(StoreError::UnknownMovie(9999))));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");

        let store = seeded_store();
        let id = store.all().unwrap()[1].id;
        store.set_cluster(id, 1).unwrap();
        store.save(&path).unwrap();

        let reloaded = MemoryStore::load(&path).unwrap();
        assert_eq!(reloaded.all().unwrap(), store.all().unwrap());

        // Ids keep advancing after a reload instead of colliding
        let new_id = reloaded
            .insert(NewMovie::new("New", vec!["Drama".into()], Some(2.0)))
            .unwrap();
        assert!(store.all().unwrap().iter().all(|m| m.id != new_id));
    }
}
