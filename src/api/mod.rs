//! Musixmatch web API access.
//!
//! This module splits the client into two layers:
//! - [`query`]: request construction (parameter ordering, credential injection)
//! - [`client`]: the fetch-and-unwrap client built on top of it

pub mod client;
pub mod query;

pub use client::{ClientStats, ClientStatsSnapshot, MusixmatchApi};
pub use query::{build_api_url, ApiQuery, ParamValue, SearchFilters};
