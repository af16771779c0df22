//! Core domain types for the movie corpus.
//!
//! The corpus is a flat collection of movie documents: a title, a set of
//! free-form genre labels, an optional average rating, and an optional
//! cluster label written back by the clustering engine.

use serde::{Deserialize, Serialize};

/// Store-assigned identifier for a movie document.
///
/// Assigned on insert and never reused, so a stale id after a delete is
/// detectable rather than silently pointing at a different movie.
pub type MovieId = u64;

/// Cluster group identifier, 0-indexed in `[0, k)`.
///
/// Labels are arbitrary per clustering run; only co-membership within a
/// single run is meaningful.
pub type ClusterLabel = u32;

/// A movie document as stored in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    /// Identifier carried over from the source dataset (e.g. MovieLens
    /// movieId), if the record was bulk-imported.
    pub external_id: Option<u32>,
    /// Display key. Not guaranteed unique; title-keyed operations act on the
    /// first match in insertion order.
    pub title: String,
    /// Free-form genre labels. Order is irrelevant.
    pub genres: Vec<String>,
    /// Average rating, conceptually 0.0–5.0 but not enforced. `None` for
    /// movies that were imported without any ratings.
    pub rating: Option<f32>,
    /// Cluster label from the most recent clustering run, overwritten
    /// wholesale on each run. `None` means unclustered.
    pub cluster: Option<ClusterLabel>,
}

impl Movie {
    /// A movie qualifies for feature encoding when it has at least one genre
    /// and a known rating. Non-qualifying movies can never be placed in a
    /// cluster or similarity space.
    pub fn is_qualifying(&self) -> bool {
        !self.genres.is_empty() && self.rating.is_some()
    }
}

/// A movie about to be inserted, before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMovie {
    pub external_id: Option<u32>,
    pub title: String,
    pub genres: Vec<String>,
    pub rating: Option<f32>,
}

impl NewMovie {
    pub fn new(
        title: impl Into<String>,
        genres: Vec<String>,
        rating: Option<f32>,
    ) -> Self {
        Self {
            external_id: None,
            title: title.into(),
            genres,
            rating,
        }
    }

    /// Attach the source-dataset id (builder style).
    pub fn with_external_id(mut self, external_id: u32) -> Self {
        self.external_id = Some(external_id);
        self
    }
}

/// Sort direction for rating-ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingSort {
    /// Keep insertion order.
    #[default]
    Unsorted,
    Ascending,
    Descending,
}

/// Structured browse/search query over the corpus.
///
/// This replaces the original tool's habit of round-tripping filters through
/// display strings: callers build a query, the store returns records.
#[derive(Debug, Clone, Default)]
pub struct MovieQuery {
    /// Keep only movies carrying this exact genre label.
    pub genre: Option<String>,
    /// Keep only movies rated at least this value (unrated movies never
    /// match a rating filter).
    pub min_rating: Option<f32>,
    /// Case-insensitive substring match on the title.
    pub title_contains: Option<String>,
    pub sort: RatingSort,
    /// Cap on the number of returned records, applied after sorting.
    pub limit: Option<usize>,
}

impl MovieQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_min_rating(mut self, min_rating: f32) -> Self {
        self.min_rating = Some(min_rating);
        self
    }

    pub fn with_title_contains(mut self, fragment: impl Into<String>) -> Self {
        self.title_contains = Some(fragment.into());
        self
    }

    pub fn with_sort(mut self, sort: RatingSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a movie satisfies every filter in this query (sort and limit
    /// are applied by the store, not here).
    pub fn matches(&self, movie: &Movie) -> bool {
        if let Some(genre) = &self.genre {
            if !movie.genres.iter().any(|g| g == genre) {
                return false;
            }
        }
        if let Some(min) = self.min_rating {
            match movie.rating {
                Some(r) if r >= min => {}
                _ => return false,
            }
        }
        if let Some(fragment) = &self.title_contains {
            let fragment = fragment.to_lowercase();
            if !movie.title.to_lowercase().contains(&fragment) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str, genres: &[&str], rating: Option<f32>) -> Movie {
        Movie {
            id: 1,
            external_id: None,
            title: title.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            rating,
            cluster: None,
        }
    }

    #[test]
    fn test_qualifying_requires_genres_and_rating() {
        assert!(movie("A", &["Action"], Some(4.0)).is_qualifying());
        assert!(!movie("B", &[], Some(4.0)).is_qualifying());
        assert!(!movie("C", &["Action"], None).is_qualifying());
    }

    #[test]
    fn test_query_genre_filter() {
        let q = MovieQuery::new().with_genre("Action");
        assert!(q.matches(&movie("A", &["Action", "Comedy"], Some(4.0))));
        assert!(!q.matches(&movie("B", &["Drama"], Some(4.0))));
    }

    #[test]
    fn test_query_min_rating_excludes_unrated() {
        let q = MovieQuery::new().with_min_rating(3.0);
        assert!(q.matches(&movie("A", &["Action"], Some(3.5))));
        assert!(!q.matches(&movie("B", &["Action"], Some(2.5))));
        assert!(!q.matches(&movie("C", &["Action"], None)));
    }

    #[test]
    fn test_query_title_substring_is_case_insensitive() {
        let q = MovieQuery::new().with_title_contains("matrix");
        assert!(q.matches(&movie("The Matrix (1999)", &["Sci-Fi"], Some(4.5))));
        assert!(!q.matches(&movie("Toy Story (1995)", &["Comedy"], Some(4.0))));
    }
}
