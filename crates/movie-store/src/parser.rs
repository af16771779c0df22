//! Bulk import of a MovieLens-style CSV export.
//!
//! Two files make up an import:
//! - `movies.csv`: `movieId,title,genres` with pipe-separated genres and
//!   quoted titles (titles routinely contain commas)
//! - `ratings.csv`: `userId,movieId,rating,timestamp`, aggregated here to a
//!   per-movie mean rating
//!
//! Malformed data rows are skipped and counted, not fatal; a missing file or
//! an unreadable header is a hard error.

use crate::error::{Result, StoreError};
use crate::types::NewMovie;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Outcome of a bulk import.
#[derive(Debug)]
pub struct ImportReport {
    /// Records ready for insertion, in movies.csv order.
    pub movies: Vec<NewMovie>,
    /// Movies that had no ratings and were imported with `rating: None`.
    pub unrated: usize,
    /// Data rows dropped from either file for being malformed.
    pub skipped_rows: usize,
}

/// Parse both files and join mean ratings onto the movie records.
///
/// The two files are independent until the join, so they are parsed in
/// parallel the same way the index loader splits its file parsing.
pub fn load_corpus(movies_path: &Path, ratings_path: &Path) -> Result<ImportReport> {
    let (movies, ratings) = rayon::join(
        || parse_movies(movies_path),
        || parse_mean_ratings(ratings_path),
    );
    let (movies, movies_skipped) = movies?;
    let (mean_ratings, ratings_skipped) = ratings?;

    let mut unrated = 0;
    let movies: Vec<NewMovie> = movies
        .into_iter()
        .map(|(external_id, title, genres)| {
            let rating = mean_ratings.get(&external_id).copied();
            if rating.is_none() {
                unrated += 1;
            }
            NewMovie {
                external_id: Some(external_id),
                title,
                genres,
                rating,
            }
        })
        .collect();

    info!(
        movies = movies.len(),
        unrated,
        skipped = movies_skipped + ratings_skipped,
        "bulk import parsed"
    );

    Ok(ImportReport {
        movies,
        unrated,
        skipped_rows: movies_skipped + ratings_skipped,
    })
}

/// Parse movies.csv into `(movieId, title, genres)` rows.
fn parse_movies(path: &Path) -> Result<(Vec<(u32, String, Vec<String>)>, usize)> {
    let content = std::fs::read_to_string(path)?;
    let file = path.display().to_string();
    let mut lines = content.lines().enumerate();

    expect_header(&mut lines, &file, &["movieId", "title", "genres"])?;

    let mut movies = Vec::new();
    let mut skipped = 0;

    for (idx, line) in lines {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        if fields.len() != 3 {
            warn!(file = %file, line = line_no, "skipping row: expected 3 fields, found {}", fields.len());
            skipped += 1;
            continue;
        }
        let movie_id: u32 = match fields[0].trim().parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(file = %file, line = line_no, "skipping row: bad movieId {:?}", fields[0]);
                skipped += 1;
                continue;
            }
        };
        movies.push((movie_id, fields[1].clone(), parse_genres(&fields[2])));
    }

    Ok((movies, skipped))
}

/// Parse ratings.csv and reduce it to a mean rating per movie, rounded to
/// two decimals the way the dataset's export does.
fn parse_mean_ratings(path: &Path) -> Result<(HashMap<u32, f32>, usize)> {
    let content = std::fs::read_to_string(path)?;
    let file = path.display().to_string();
    let mut lines = content.lines().enumerate();

    expect_header(&mut lines, &file, &["userId", "movieId", "rating", "timestamp"])?;

    let mut sums: HashMap<u32, (f64, u32)> = HashMap::new();
    let mut skipped = 0;

    for (idx, line) in lines {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split(',');
        let parsed = (|| {
            let _user: u32 = fields.next()?.trim().parse().ok()?;
            let movie_id: u32 = fields.next()?.trim().parse().ok()?;
            let rating: f64 = fields.next()?.trim().parse().ok()?;
            Some((movie_id, rating))
        })();

        match parsed {
            Some((movie_id, rating)) if rating.is_finite() => {
                let entry = sums.entry(movie_id).or_insert((0.0, 0));
                entry.0 += rating;
                entry.1 += 1;
            }
            _ => {
                warn!(file = %file, line = line_no, "skipping unparsable rating row");
                skipped += 1;
            }
        }
    }

    let means = sums
        .into_iter()
        .map(|(movie_id, (sum, count))| {
            let mean = sum / count as f64;
            (movie_id, ((mean * 100.0).round() / 100.0) as f32)
        })
        .collect();

    Ok((means, skipped))
}

/// Consume the first line and verify it names the expected columns.
fn expect_header<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    file: &str,
    expected: &[&str],
) -> Result<()> {
    let (_, header) = lines.next().ok_or_else(|| StoreError::Parse {
        file: file.to_string(),
        line: 1,
        reason: "empty file".to_string(),
    })?;

    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    if columns.len() < expected.len()
        || !expected
            .iter()
            .zip(&columns)
            .all(|(want, got)| want.eq_ignore_ascii_case(got))
    {
        return Err(StoreError::Parse {
            file: file.to_string(),
            line: 1,
            reason: format!("expected header {:?}, found {:?}", expected.join(","), header),
        });
    }
    Ok(())
}

/// Split one CSV line, honoring double-quoted fields and `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    // Escaped quote inside a quoted field
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Split the pipe-separated genre field into labels.
///
/// The dataset writes `(no genres listed)` for genre-less movies; that maps
/// to an empty list here so the record is treated as non-qualifying instead
/// of growing a bogus vocabulary entry.
fn parse_genres(field: &str) -> Vec<String> {
    if field.trim() == "(no genres listed)" {
        return Vec::new();
    }
    field
        .split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_split_csv_line_with_quoted_comma() {
        let fields = split_csv_line(r#"11,"American President, The (1995)",Comedy|Drama|Romance"#);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1], "American President, The (1995)");
    }

    #[test]
    fn test_split_csv_line_with_escaped_quote() {
        let fields = split_csv_line(r#"1,"He said ""hi""",Drama"#);
        assert_eq!(fields[1], r#"He said "hi""#);
    }

    #[test]
    fn test_parse_genres_no_genres_listed() {
        assert!(parse_genres("(no genres listed)").is_empty());
        assert_eq!(
            parse_genres("Action|Sci-Fi"),
            vec!["Action".to_string(), "Sci-Fi".to_string()]
        );
    }

    #[test]
    fn test_load_corpus_joins_mean_ratings() {
        let dir = tempfile::tempdir().unwrap();
        let movies = write_file(
            dir.path(),
            "movies.csv",
            "movieId,title,genres\n\
             1,Toy Story (1995),Animation|Comedy\n\
             2,Jumanji (1995),Adventure|Children\n\
             3,Obscure Short,(no genres listed)\n",
        );
        let ratings = write_file(
            dir.path(),
            "ratings.csv",
            "userId,movieId,rating,timestamp\n\
             1,1,4.0,964982703\n\
             2,1,5.0,964982931\n\
             1,2,3.0,964982224\n",
        );

        let report = load_corpus(&movies, &ratings).unwrap();
        assert_eq!(report.movies.len(), 3);
        assert_eq!(report.skipped_rows, 0);
        assert_eq!(report.unrated, 1);

        assert_eq!(report.movies[0].rating, Some(4.5));
        assert_eq!(report.movies[1].rating, Some(3.0));
        assert_eq!(report.movies[2].rating, None);
        assert!(report.movies[2].genres.is_empty());
        assert_eq!(report.movies[0].external_id, Some(1));
    }

    #[test]
    fn test_load_corpus_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let movies = write_file(
            dir.path(),
            "movies.csv",
            "movieId,title,genres\n\
             not-a-number,Broken,Drama\n\
             1,Fine Movie (2000),Drama\n",
        );
        let ratings = write_file(
            dir.path(),
            "ratings.csv",
            "userId,movieId,rating,timestamp\n\
             1,1,not-a-rating,964982703\n\
             1,1,4.0,964982703\n",
        );

        let report = load_corpus(&movies, &ratings).unwrap();
        assert_eq!(report.movies.len(), 1);
        assert_eq!(report.skipped_rows, 2);
        assert_eq!(report.movies[0].rating, Some(4.0));
    }

    #[test]
    fn test_bad_header_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let movies = write_file(dir.path(), "movies.csv", "id,name\n1,X,Drama\n");
        let ratings = write_file(
            dir.path(),
            "ratings.csv",
            "userId,movieId,rating,timestamp\n",
        );

        let result = load_corpus(&movies, &ratings);
        assert!(matches!(result, Err(StoreError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_mean_rating_rounds_to_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let movies = write_file(
            dir.path(),
            "movies.csv",
            "movieId,title,genres\n1,M (1931),Thriller\n",
        );
        let ratings = write_file(
            dir.path(),
            "ratings.csv",
            "userId,movieId,rating,timestamp\n\
             1,1,4.0,0\n\
             2,1,4.0,0\n\
             3,1,3.0,0\n",
        );

        let report = load_corpus(&movies, &ratings).unwrap();
        // 11/3 = 3.666... -> 3.67
        assert_eq!(report.movies[0].rating, Some(3.67));
    }
}
