//! Similarity Ranker: "movies like this one" by genre-text similarity.
//!
//! The ranker encodes the qualifying corpus once under a text policy and
//! answers queries against that snapshot. Ratings are deliberately not part
//! of this feature space; similarity here means "about the same kind of
//! thing", not "equally well liked".

use crate::error::{EngineError, Result};
use crate::fuzzy;
use crate::similarity::cosine_similarity;
use features::{EncodedCorpus, EncoderConfig, FeatureEncoder};
use movie_store::Movie;
use rayon::prelude::*;
use tracing::{info, instrument};

/// One ranked neighbor.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMovie {
    pub title: String,
    pub genres: Vec<String>,
    pub rating: Option<f32>,
    /// Cosine similarity to the query movie, in `[-1, 1]`.
    pub score: f64,
}

/// Ranks movies by cosine similarity over genre-text vectors.
pub struct SimilarityRanker {
    /// Qualifying movies, aligned with the encoded matrix rows.
    movies: Vec<Movie>,
    /// Lowercased titles for query resolution, row-aligned.
    titles_lower: Vec<String>,
    encoded: EncodedCorpus,
}

impl SimilarityRanker {
    /// Fit over a corpus snapshot with the default text feature space
    /// (term frequency, no rating column).
    pub fn fit(corpus: &[Movie]) -> Result<Self> {
        Self::fit_with(corpus, EncoderConfig::text_similarity())
    }

    /// Fit with an explicit encoder configuration (e.g. tf-idf).
    pub fn fit_with(corpus: &[Movie], config: EncoderConfig) -> Result<Self> {
        let encoded = FeatureEncoder::new(config).encode(corpus)?;
        let movies: Vec<Movie> = corpus
            .iter()
            .filter(|m| m.is_qualifying())
            .cloned()
            .collect();
        let titles_lower = movies.iter().map(|m| m.title.to_lowercase()).collect();

        Ok(Self {
            movies,
            titles_lower,
            encoded,
        })
    }

    /// Number of rankable movies.
    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Top `top_n` movies most similar to the query title.
    ///
    /// The query movie never appears in its own results. Fewer than `top_n`
    /// rows come back when the corpus is smaller than `top_n + 1`.
    #[instrument(skip(self))]
    pub fn rank(&self, query: &str, top_n: usize) -> Result<Vec<RankedMovie>> {
        let query_row = self.resolve(query)?;
        let matrix = self.encoded.matrix();
        let query_vec = matrix.row(query_row);

        let mut scores: Vec<(usize, f64)> = (0..self.movies.len())
            .into_par_iter()
            .map(|i| (i, cosine_similarity(query_vec, matrix.row(i))))
            .collect();

        // Stable sort: equal scores keep corpus order, the only tie-break
        // this ranking defines.
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scores
            .into_iter()
            .filter(|&(i, _)| i != query_row)
            .take(top_n)
            .map(|(i, score)| {
                let movie = &self.movies[i];
                RankedMovie {
                    title: movie.title.clone(),
                    genres: movie.genres.clone(),
                    rating: movie.rating,
                    score,
                }
            })
            .collect())
    }

    /// Resolve a query to a corpus row: exact (case-insensitive) first, then
    /// the closest fuzzy match above the threshold.
    fn resolve(&self, query: &str) -> Result<usize> {
        let needle = query.trim().to_lowercase();

        if let Some(i) = self.titles_lower.iter().position(|t| *t == needle) {
            return Ok(i);
        }

        let (i, ratio) =
            fuzzy::best_match(&needle, self.titles_lower.iter().map(String::as_str))
                .ok_or_else(|| EngineError::NoMatch {
                    query: query.to_string(),
                })?;
        info!(query, matched = %self.movies[i].title, ratio, "fuzzy-resolved query title");
        Ok(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use movie_store::MovieId;

    fn movie(id: MovieId, title: &str, genres: &[&str], rating: Option<f32>) -> Movie {
        Movie {
            id,
            external_id: None,
            title: title.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            rating,
            cluster: None,
        }
    }

    fn corpus() -> Vec<Movie> {
        vec![
            movie(0, "Movie A", &["Action", "Comedy"], Some(4.0)),
            movie(1, "Movie B", &["Action"], Some(3.0)),
            movie(2, "Movie C", &["Comedy"], Some(5.0)),
            movie(3, "Movie D", &["Action", "Comedy"], Some(4.5)),
            movie(4, "Movie E", &["Drama"], Some(2.0)),
        ]
    }

    #[test]
    fn test_rank_orders_by_shared_genres() {
        let ranker = SimilarityRanker::fit(&corpus()).unwrap();
        let results = ranker.rank("Movie A", 2).unwrap();

        // D shares both genres with A; B and C tie on one genre and the
        // earlier corpus entry (B) wins the tie.
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Movie D");
        assert_eq!(results[1].title, "Movie B");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_rank_never_returns_the_query_movie() {
        let ranker = SimilarityRanker::fit(&corpus()).unwrap();
        let results = ranker.rank("Movie A", 10).unwrap();

        assert!(results.iter().all(|r| r.title != "Movie A"));
        // Whole corpus minus the query
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_rank_respects_top_n() {
        let ranker = SimilarityRanker::fit(&corpus()).unwrap();
        assert_eq!(ranker.rank("Movie A", 3).unwrap().len(), 3);
        assert_eq!(ranker.rank("Movie A", 0).unwrap().len(), 0);
    }

    #[test]
    fn test_fuzzy_query_resolves() {
        let ranker = SimilarityRanker::fit(&corpus()).unwrap();
        let results = ranker.rank("Movei A", 1).unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].title, "Movie D");
    }

    #[test]
    fn test_unmatchable_query_is_no_match() {
        let ranker = SimilarityRanker::fit(&corpus()).unwrap();
        let result = ranker.rank("Zyxwvut Chronicles", 5);
        assert!(matches!(result, Err(EngineError::NoMatch { .. })));
    }

    #[test]
    fn test_exact_match_beats_fuzzy() {
        let mut movies = corpus();
        movies.push(movie(5, "Movie AA", &["Drama"], Some(1.0)));

        let ranker = SimilarityRanker::fit(&movies).unwrap();
        // "Movie A" must resolve to the exact title, not the close "Movie AA"
        let results = ranker.rank("movie a", 1).unwrap();
        assert_eq!(results[0].title, "Movie D");
    }

    #[test]
    fn test_results_carry_genres_and_rating() {
        let ranker = SimilarityRanker::fit(&corpus()).unwrap();
        let results = ranker.rank("Movie E", 1).unwrap();

        // Nothing shares a genre with E; the top result scores 0 but still
        // carries its record fields.
        let top = &results[0];
        assert_eq!(top.score, 0.0);
        assert!(!top.genres.is_empty());
        assert!(top.rating.is_some());
    }
}
