//! # versemine
//!
//! A Rust library for harvesting the Musixmatch catalog: genre
//! listings, paginated track search, and per-track lyrics, exported as
//! flat JSON and TSV files.
//!
//! ## Quick Start
//!
//! The easiest way to use this library is through the [`Harvester`]:
//!
//! ```rust,no_run
//! use versemine::{Harvester, MusixmatchApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let harvester = Harvester::new(MusixmatchApi::new("your_api_key"));
//!
//!     // List the genre catalog
//!     let genres = harvester.api().get_genres().await?;
//!     println!("{} genres", genres.len());
//!
//!     // Page every genre's tracks into a sink, one JSON array per line
//!     let mut sink = std::fs::File::create("tracks.json")?;
//!     let ids: Vec<i64> = genres.iter().map(|g| g.music_genre_id).collect();
//!     harvester.download_all_tracks(&mut sink, &ids, "en").await?;
//!
//!     // Fetch lyrics for a batch of tracks, two at a time
//!     let records = harvester.download_lyrics(&[123, 456], 2, 10).await;
//!     println!("{} lyrics records", records.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Design
//!
//! Long batch runs favor degradation over failure: exhausted retries,
//! empty envelopes, truncated genres, and lyric-less tracks all produce
//! empty or stub records, get logged, and increment counters exposed
//! through the stats snapshots ([`MusixmatchApi::stats`],
//! [`Harvester::stats`]).

pub mod api;
pub mod error;
pub mod export;
pub mod harvest;
pub mod models;
pub mod retry;

// Main interface (recommended)
pub use harvest::{Harvester, HarvestStatsSnapshot};

// Low-level APIs
pub use api::{ApiQuery, MusixmatchApi, ParamValue, SearchFilters};
pub use error::{MusixmatchError, Result};
pub use models::Genre;
