use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use engine::RecommendService;
use movie_store::{
    load_corpus, stats, CorpusStore, MemoryStore, MovieQuery, NewMovie, RatingSort, Shelf, Tag,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// CineMatch - movie recommendation and clustering over a local corpus
#[derive(Parser)]
#[command(name = "cinematch")]
#[command(about = "Browse, rate, recommend, and cluster a movie corpus", long_about = None)]
struct Cli {
    /// Path to the corpus snapshot file
    #[arg(long, default_value = "movies.json")]
    db: PathBuf,

    /// Path to the user shelf file (likes and tags)
    #[arg(long, default_value = "shelf.json")]
    shelf: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-import movies.csv + ratings.csv, replacing the corpus
    Load {
        /// Path to movies.csv (movieId,title,genres)
        #[arg(long)]
        movies: PathBuf,

        /// Path to ratings.csv (userId,movieId,rating,timestamp)
        #[arg(long)]
        ratings: PathBuf,
    },

    /// Add a single movie to the corpus
    Add {
        #[arg(long)]
        title: String,

        /// Comma-separated genre labels
        #[arg(long)]
        genres: String,

        #[arg(long)]
        rating: Option<f32>,
    },

    /// Delete a movie by exact title
    Delete {
        #[arg(long)]
        title: String,
    },

    /// Browse the corpus with filters
    Browse {
        /// Keep only movies carrying this genre
        #[arg(long)]
        genre: Option<String>,

        /// Minimum rating
        #[arg(long)]
        min_rating: Option<f32>,

        /// Case-insensitive title substring
        #[arg(long)]
        title: Option<String>,

        /// Sort ascending by rating instead of descending
        #[arg(long)]
        ascending: bool,

        /// Number of movies to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show the highest-rated movies
    Top {
        #[arg(long, default_value = "5")]
        n: usize,
    },

    /// Recommend movies similar to a title (fuzzy-matched)
    Recommend {
        #[arg(long)]
        title: String,

        /// Number of recommendations to return
        #[arg(long, default_value = "5")]
        top_n: usize,
    },

    /// Cluster the corpus and persist group labels
    Cluster {
        /// Number of clusters (no default: pick one that fits your corpus)
        #[arg(long)]
        k: usize,

        /// Random seed; reruns with the same seed and corpus reproduce the
        /// same groupings
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// List movies sharing the stored cluster label of a title
    Similar {
        #[arg(long)]
        title: String,
    },

    /// Corpus statistics: genre frequencies, per-genre means, top rated
    Stats,

    /// Like a movie for a user
    Like {
        #[arg(long)]
        user: String,

        #[arg(long)]
        title: String,
    },

    /// Tag a movie as watched or to-watch for a user
    Tag {
        #[arg(long)]
        user: String,

        #[arg(long)]
        title: String,

        #[arg(long, value_enum)]
        tag: TagArg,
    },

    /// Show a user's likes and tags
    Shelf {
        #[arg(long)]
        user: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TagArg {
    Watched,
    ToWatch,
}

impl From<TagArg> for Tag {
    fn from(tag: TagArg) -> Self {
        match tag {
            TagArg::Watched => Tag::Watched,
            TagArg::ToWatch => Tag::ToWatch,
        }
    }
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Load { movies, ratings } => handle_load(&cli.db, &movies, &ratings),
        Commands::Add {
            title,
            genres,
            rating,
        } => handle_add(&cli.db, title, genres, rating),
        Commands::Delete { title } => handle_delete(&cli.db, &title),
        Commands::Browse {
            genre,
            min_rating,
            title,
            ascending,
            limit,
        } => handle_browse(&cli.db, genre, min_rating, title, ascending, limit),
        Commands::Top { n } => handle_top(&cli.db, n),
        Commands::Recommend { title, top_n } => handle_recommend(&cli.db, &title, top_n),
        Commands::Cluster { k, seed } => handle_cluster(&cli.db, k, seed),
        Commands::Similar { title } => handle_similar(&cli.db, &title),
        Commands::Stats => handle_stats(&cli.db),
        Commands::Like { user, title } => handle_like(&cli.shelf, &user, &title),
        Commands::Tag { user, title, tag } => handle_tag(&cli.shelf, &user, &title, tag.into()),
        Commands::Shelf { user } => handle_shelf(&cli.shelf, &user),
    }
}

/// Open the snapshot if it exists, otherwise start an empty corpus.
fn open_store(db: &Path) -> Result<MemoryStore> {
    if db.exists() {
        MemoryStore::load(db)
            .with_context(|| format!("Failed to load corpus from {}", db.display()))
    } else {
        Ok(MemoryStore::new())
    }
}

fn open_shelf(path: &Path) -> Result<Shelf> {
    if path.exists() {
        Shelf::load(path).with_context(|| format!("Failed to load shelf from {}", path.display()))
    } else {
        Ok(Shelf::new())
    }
}

/// Handle the 'load' command: a fresh corpus built from the CSV export
fn handle_load(db: &Path, movies: &Path, ratings: &Path) -> Result<()> {
    let report = load_corpus(movies, ratings).context("Failed to parse CSV export")?;

    let store = MemoryStore::from_movies(report.movies);
    store.save(db)?;

    println!(
        "{} Imported {} movies ({} without ratings, {} rows skipped) into {}",
        "✓".green(),
        store.len(),
        report.unrated,
        report.skipped_rows,
        db.display()
    );
    Ok(())
}

/// Handle the 'add' command
fn handle_add(db: &Path, title: String, genres: String, rating: Option<f32>) -> Result<()> {
    let genres: Vec<String> = genres
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect();
    if title.trim().is_empty() || genres.is_empty() {
        return Err(anyhow!("Both a title and at least one genre are required"));
    }

    let store = open_store(db)?;
    store.insert(NewMovie::new(title.clone(), genres, rating))?;
    store.save(db)?;

    println!("{} Added '{}'", "✓".green(), title.bold());
    Ok(())
}

/// Handle the 'delete' command
fn handle_delete(db: &Path, title: &str) -> Result<()> {
    let store = open_store(db)?;
    let deleted = store.delete_by_title(title)?;

    if deleted == 0 {
        println!("{} No movie titled '{}'", "✗".red(), title);
    } else {
        store.save(db)?;
        println!("{} Deleted '{}'", "✓".green(), title);
    }
    Ok(())
}

/// Handle the 'browse' command
fn handle_browse(
    db: &Path,
    genre: Option<String>,
    min_rating: Option<f32>,
    title: Option<String>,
    ascending: bool,
    limit: usize,
) -> Result<()> {
    let store = open_store(db)?;

    let mut query = MovieQuery::new()
        .with_sort(if ascending {
            RatingSort::Ascending
        } else {
            RatingSort::Descending
        })
        .with_limit(limit);
    if let Some(genre) = genre {
        query = query.with_genre(genre);
    }
    if let Some(min_rating) = min_rating {
        query = query.with_min_rating(min_rating);
    }
    if let Some(title) = title {
        query = query.with_title_contains(title);
    }

    let results = store.find(&query)?;
    if results.is_empty() {
        println!("No matching movies found.");
        return Ok(());
    }

    for movie in &results {
        println!(
            "{} [{}] {}",
            movie.title.bold(),
            movie.genres.join(", "),
            format_rating(movie.rating)
        );
    }

    let rated: Vec<f32> = results.iter().filter_map(|m| m.rating).collect();
    if !rated.is_empty() {
        let avg = rated.iter().sum::<f32>() / rated.len() as f32;
        println!("\nAverage rating: {:.2}", avg);
    }
    Ok(())
}

/// Handle the 'top' command
fn handle_top(db: &Path, n: usize) -> Result<()> {
    let store = open_store(db)?;
    for movie in stats::top_rated(&store.all()?, n) {
        println!("{} {}", movie.title.bold(), format_rating(movie.rating));
    }
    Ok(())
}

/// Handle the 'recommend' command
fn handle_recommend(db: &Path, title: &str, top_n: usize) -> Result<()> {
    let store = Arc::new(open_store(db)?);
    let service = RecommendService::new(store);

    let recommendations = service
        .recommend(title, top_n)
        .context("Failed to rank recommendations")?;

    println!("{}", format!("Top picks for '{}':", title).bold().blue());
    for (rank, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} [{}] {} (similarity {:.2})",
            (rank + 1).to_string().green(),
            rec.title.bold(),
            rec.genres.join(", "),
            format_rating(rec.rating),
            rec.score
        );
    }
    Ok(())
}

/// Handle the 'cluster' command
fn handle_cluster(db: &Path, k: usize, seed: u64) -> Result<()> {
    let store = Arc::new(open_store(db)?);
    let mut service = RecommendService::new(store.clone());

    let assignment = service
        .recluster(k, seed)
        .context("Failed to cluster corpus")?;
    let clustered = assignment.len();
    let excluded = assignment.excluded().len();

    store.save(db)?;
    println!(
        "{} Assigned {} movies to {} clusters ({} excluded for missing genre or rating)",
        "✓".green(),
        clustered,
        k,
        excluded
    );
    Ok(())
}

/// Handle the 'similar' command using the labels stored by 'cluster'
fn handle_similar(db: &Path, title: &str) -> Result<()> {
    let store = open_store(db)?;
    let corpus = store.all()?;

    let selected = corpus
        .iter()
        .find(|m| m.title.eq_ignore_ascii_case(title))
        .ok_or_else(|| anyhow!("No movie titled '{}'", title))?;
    let label = selected.cluster.ok_or_else(|| {
        anyhow!(
            "'{}' has no cluster label; run `cinematch cluster` first",
            title
        )
    })?;

    let similar: Vec<_> = corpus
        .iter()
        .filter(|m| m.cluster == Some(label) && m.id != selected.id)
        .collect();

    if similar.is_empty() {
        println!("No similar movies found for '{}'.", selected.title);
        return Ok(());
    }

    println!(
        "{}",
        format!("Movies like '{}' (cluster {}):", selected.title, label)
            .bold()
            .blue()
    );
    for movie in similar {
        println!(
            "- {} [{}] {}",
            movie.title,
            movie.genres.join(", "),
            format_rating(movie.rating)
        );
    }
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(db: &Path) -> Result<()> {
    let store = open_store(db)?;
    let corpus = store.all()?;

    println!("{}", "Genre frequencies:".bold());
    for (genre, count) in stats::genre_frequencies(&corpus).iter().take(10) {
        println!("  {:<16} {}", genre, count);
    }

    println!("\n{}", "Mean rating per genre:".bold());
    for (genre, mean) in stats::mean_rating_per_genre(&corpus).iter().take(10) {
        println!("  {:<16} {:.2}", genre, mean);
    }

    println!("\n{}", "Top rated:".bold());
    for movie in stats::top_rated(&corpus, 5) {
        println!("  {} {}", movie.title, format_rating(movie.rating));
    }
    Ok(())
}

/// Handle the 'like' command
fn handle_like(shelf_path: &Path, user: &str, title: &str) -> Result<()> {
    let mut shelf = open_shelf(shelf_path)?;
    if shelf.like(user, title) {
        shelf.save(shelf_path)?;
        println!("{} {} liked '{}'", "✓".green(), user, title);
    } else {
        println!("{} already liked '{}'", user, title);
    }
    Ok(())
}

/// Handle the 'tag' command
fn handle_tag(shelf_path: &Path, user: &str, title: &str, tag: Tag) -> Result<()> {
    let mut shelf = open_shelf(shelf_path)?;
    shelf.tag(user, title, tag);
    shelf.save(shelf_path)?;
    println!(
        "{} Tagged '{}' as {:?} for {}",
        "✓".green(),
        title,
        tag,
        user
    );
    Ok(())
}

/// Handle the 'shelf' command
fn handle_shelf(shelf_path: &Path, user: &str) -> Result<()> {
    let shelf = open_shelf(shelf_path)?;

    println!("{}", format!("Shelf for {}", user).bold().blue());
    println!("{}", "Liked:".bold());
    for title in shelf.liked_titles(user) {
        println!("  - {}", title);
    }
    println!("{}", "Watched:".bold());
    for title in shelf.tagged(user, Tag::Watched) {
        println!("  - {}", title);
    }
    println!("{}", "To watch:".bold());
    for title in shelf.tagged(user, Tag::ToWatch) {
        println!("  - {}", title);
    }
    Ok(())
}

fn format_rating(rating: Option<f32>) -> String {
    match rating {
        Some(r) => format!("rating {:.1}", r),
        None => "unrated".to_string(),
    }
}
