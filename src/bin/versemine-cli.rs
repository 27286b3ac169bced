use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use versemine::harvest::{DEFAULT_LYRICS_CONCURRENCY, DEFAULT_LYRICS_RETRIES};
use versemine::{export, Genre, Harvester, MusixmatchApi};

#[derive(Parser)]
#[command(name = "versemine-cli")]
#[command(about = "CLI for versemine - Musixmatch catalog and lyrics harvester", long_about = None)]
struct Cli {
    /// Musixmatch API key (can also be set via MUSIXMATCH_APIKEY env var)
    #[arg(long, env = "MUSIXMATCH_APIKEY")]
    apikey: String,

    /// Output directory for harvested artifacts
    #[arg(short, long, default_value = "harvest")]
    output: PathBuf,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the genre catalog and write genres.json + genres.tsv
    Genres,
    /// Download track pages per genre and write tracks.json, tracks.tsv
    /// and unique_tracks.tsv
    Tracks {
        /// Lyrics language filter (en, it, ...)
        #[arg(short, long, default_value = "en")]
        language: String,

        /// Genre ids to harvest; defaults to every id in genres.json
        #[arg(short, long)]
        genre_id: Vec<i64>,
    },
    /// Download lyrics for harvested tracks and write lyrics.json + lyrics.tsv
    Lyrics {
        /// Concurrent lyrics fetches (kept small to respect rate limits)
        #[arg(short, long, default_value_t = DEFAULT_LYRICS_CONCURRENCY)]
        concurrency: usize,

        /// Attempt budget per track
        #[arg(short, long, default_value_t = DEFAULT_LYRICS_RETRIES)]
        retries: u32,
    },
    /// Run the whole pipeline: genres, tracks, lyrics
    Run {
        /// Lyrics language filter (en, it, ...)
        #[arg(short, long, default_value = "en")]
        language: String,

        /// Concurrent lyrics fetches
        #[arg(short, long, default_value_t = DEFAULT_LYRICS_CONCURRENCY)]
        concurrency: usize,

        /// Attempt budget per track
        #[arg(short, long, default_value_t = DEFAULT_LYRICS_RETRIES)]
        retries: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    fs::create_dir_all(&cli.output)?;
    let harvester = Harvester::new(MusixmatchApi::new(&cli.apikey));

    match &cli.command {
        Commands::Genres => {
            run_genres(&harvester, &cli.output).await?;
        }
        Commands::Tracks { language, genre_id } => {
            run_tracks(&harvester, &cli.output, language, genre_id.clone()).await?;
        }
        Commands::Lyrics {
            concurrency,
            retries,
        } => {
            run_lyrics(&harvester, &cli.output, *concurrency, *retries).await?;
        }
        Commands::Run {
            language,
            concurrency,
            retries,
        } => {
            let genres = run_genres(&harvester, &cli.output).await?;
            let ids: Vec<i64> = genres.iter().map(|g| g.music_genre_id).collect();
            run_tracks(&harvester, &cli.output, language, ids).await?;
            run_lyrics(&harvester, &cli.output, *concurrency, *retries).await?;
        }
    }

    let api_stats = harvester.api().stats();
    let harvest_stats = harvester.stats();
    println!(
        "Degraded responses: {} empty envelopes, {} transport failures, {} status failures, \
         {} truncated genres, {} tracks without lyrics",
        api_stats.empty_envelopes,
        api_stats.transport_failures,
        api_stats.status_failures,
        harvest_stats.pages_truncated,
        harvest_stats.lyrics_exhausted,
    );

    Ok(())
}

async fn run_genres(
    harvester: &Harvester,
    output: &Path,
) -> Result<Vec<Genre>, Box<dyn std::error::Error>> {
    println!("Fetching genre catalog...");
    let genres = harvester.api().get_genres().await?;
    println!("Fetched {} genres", genres.len());

    export::write_json_file(output.join("genres.json"), &genres)?;
    export::write_genres_tsv_file(output.join("genres.tsv"), &genres)?;
    Ok(genres)
}

async fn run_tracks(
    harvester: &Harvester,
    output: &Path,
    language: &str,
    genre_ids: Vec<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let genre_ids = if genre_ids.is_empty() {
        load_genre_ids(harvester, output).await?
    } else {
        genre_ids
    };

    println!(
        "Downloading tracks for {} genres (language: {})...",
        genre_ids.len(),
        language
    );

    let tracks_path = output.join("tracks.json");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&tracks_path)?;
    let mut sink = BufWriter::new(file);
    let page_indexes = harvester
        .download_all_tracks(&mut sink, &genre_ids, language)
        .await?;
    sink.flush()?;

    let mut tracks = export::read_track_pages_file(&tracks_path)?;
    let mut degraded = 0usize;
    for record in &mut tracks {
        if export::ensure_genre_id(record) {
            degraded += 1;
        }
    }
    export::write_tsv_file(output.join("tracks.tsv"), &tracks)?;

    let unique = export::dedup_by_track_id(tracks);
    export::write_tsv_file(output.join("unique_tracks.tsv"), &unique)?;

    let pages: u32 = page_indexes.values().sum();
    println!(
        "Harvested {} unique tracks over {} pages ({} records missing a primary genre)",
        unique.len(),
        pages,
        degraded
    );
    Ok(())
}

async fn run_lyrics(
    harvester: &Harvester,
    output: &Path,
    concurrency: usize,
    retries: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let tracks = export::read_track_pages_file(output.join("tracks.json"))?;
    let unique = export::dedup_by_track_id(tracks);
    let ids = export::lyrics_candidates(&unique);
    println!(
        "Downloading lyrics for {} of {} tracks...",
        ids.len(),
        unique.len()
    );

    let records = harvester.download_lyrics(&ids, concurrency, retries).await;
    export::write_json_file(output.join("lyrics.json"), &records)?;
    export::write_tsv_file(output.join("lyrics.tsv"), &records)?;

    println!("Wrote {} lyrics records", records.len());
    Ok(())
}

/// Genre ids for the tracks stage: a prior genres.json if present,
/// otherwise a fresh catalog fetch.
async fn load_genre_ids(
    harvester: &Harvester,
    output: &Path,
) -> Result<Vec<i64>, Box<dyn std::error::Error>> {
    let path = output.join("genres.json");
    let genres: Vec<Genre> = if path.exists() {
        serde_json::from_str(&fs::read_to_string(&path)?)?
    } else {
        harvester.api().get_genres().await?
    };
    Ok(genres.iter().map(|g| g.music_genre_id).collect())
}
