//! Corpus-level aggregate statistics.
//!
//! These are the numbers behind the original tool's charts; rendering them
//! is someone else's job, the aggregation lives here.

use crate::types::Movie;
use std::collections::HashMap;

/// Count how many movies carry each genre label, most frequent first.
/// Ties break alphabetically so the output is deterministic.
pub fn genre_frequencies(movies: &[Movie]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for movie in movies {
        for genre in &movie.genres {
            *counts.entry(genre.as_str()).or_insert(0) += 1;
        }
    }

    let mut frequencies: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(genre, count)| (genre.to_string(), count))
        .collect();
    frequencies.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    frequencies
}

/// Mean rating per genre over rated movies, highest first.
///
/// A movie contributes its rating once to every genre it carries, the same
/// "explode genres to rows" shape the original analysis used.
pub fn mean_rating_per_genre(movies: &[Movie]) -> Vec<(String, f32)> {
    let mut sums: HashMap<&str, (f64, u32)> = HashMap::new();
    for movie in movies {
        let Some(rating) = movie.rating else { continue };
        for genre in &movie.genres {
            let entry = sums.entry(genre.as_str()).or_insert((0.0, 0));
            entry.0 += rating as f64;
            entry.1 += 1;
        }
    }

    let mut means: Vec<(String, f32)> = sums
        .into_iter()
        .map(|(genre, (sum, count))| (genre.to_string(), (sum / count as f64) as f32))
        .collect();
    means.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    means
}

/// The `n` highest-rated movies. Unrated movies never appear.
pub fn top_rated(movies: &[Movie], n: usize) -> Vec<Movie> {
    let mut rated: Vec<Movie> = movies
        .iter()
        .filter(|m| m.rating.is_some())
        .cloned()
        .collect();
    rated.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rated.truncate(n);
    rated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Movie> {
        let specs: [(&str, &[&str], Option<f32>); 4] = [
            ("A", &["Action", "Comedy"], Some(4.0)),
            ("B", &["Action"], Some(3.0)),
            ("C", &["Comedy"], Some(5.0)),
            ("D", &["Drama"], None),
        ];
        specs
            .iter()
            .enumerate()
            .map(|(i, (title, genres, rating))| Movie {
                id: i as u64,
                external_id: None,
                title: title.to_string(),
                genres: genres.iter().map(|g| g.to_string()).collect(),
                rating: *rating,
                cluster: None,
            })
            .collect()
    }

    #[test]
    fn test_genre_frequencies() {
        let freqs = genre_frequencies(&corpus());
        // Action 2, Comedy 2, Drama 1; Action before Comedy alphabetically
        assert_eq!(
            freqs,
            vec![
                ("Action".to_string(), 2),
                ("Comedy".to_string(), 2),
                ("Drama".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_mean_rating_per_genre_skips_unrated() {
        let means = mean_rating_per_genre(&corpus());
        // Comedy (4.0 + 5.0)/2 = 4.5, Action (4.0 + 3.0)/2 = 3.5; Drama absent
        assert_eq!(means.len(), 2);
        assert_eq!(means[0].0, "Comedy");
        assert!((means[0].1 - 4.5).abs() < 1e-6);
        assert_eq!(means[1].0, "Action");
        assert!((means[1].1 - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_top_rated_excludes_unrated_and_truncates() {
        let top = top_rated(&corpus(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].title, "C");
        assert_eq!(top[1].title, "A");
    }
}
