//! Musixmatch web API client.
//!
//! Wraps request construction, bounded retry, and the lenient envelope
//! unwrapping every higher-level operation depends on. Degraded
//! responses (empty envelopes, exhausted retries) are tolerated and
//! counted rather than raised.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::api::query::{build_api_url, ApiQuery, SearchFilters};
use crate::error::{MusixmatchError, Result};
use crate::models::Genre;
use crate::retry::{retry, RETRY_DELAY};

/// Base URL for the Musixmatch web API.
const API_BASE_URL: &str = "https://api.musixmatch.com/ws/1.1";

/// User agent sent with every request.
const USER_AGENT: &str = concat!("versemine/", env!("CARGO_PKG_VERSION"));

/// Default attempt budget for a catalog request.
pub const DEFAULT_RETRIES: u32 = 5;

/// Default page size for track searches. The API caps pages at 100.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Degradation counters for the client.
///
/// Every tolerated failure is counted here in addition to being logged,
/// so a long batch run can report how much of its output is degraded.
#[derive(Debug, Default)]
pub struct ClientStats {
    empty_envelopes: AtomicU64,
    transport_failures: AtomicU64,
    status_failures: AtomicU64,
}

impl ClientStats {
    /// Take a point-in-time view of the counters.
    pub fn snapshot(&self) -> ClientStatsSnapshot {
        ClientStatsSnapshot {
            empty_envelopes: self.empty_envelopes.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            status_failures: self.status_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`ClientStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStatsSnapshot {
    /// Responses whose `message.body` envelope was missing.
    pub empty_envelopes: u64,
    /// Requests that exhausted their retries on transport failures.
    pub transport_failures: u64,
    /// Requests that exhausted their retries on non-success statuses.
    pub status_failures: u64,
}

/// Musixmatch API client.
///
/// # Example
///
/// ```rust,no_run
/// use versemine::MusixmatchApi;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let api = MusixmatchApi::new("your_api_key");
///     let genres = api.get_genres().await?;
///     println!("{} genres", genres.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MusixmatchApi {
    client: Client,
    base_url: String,
    apikey: String,
    stats: Arc<ClientStats>,
}

impl MusixmatchApi {
    /// Create a new client with the given API credential.
    pub fn new(apikey: &str) -> Self {
        Self::with_base_url(apikey, API_BASE_URL)
    }

    /// Create a client against a non-default base URL.
    ///
    /// Used by tests to point the client at a local mock server.
    pub fn with_base_url(apikey: &str, base_url: &str) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            apikey: apikey.to_string(),
            stats: Arc::new(ClientStats::default()),
        }
    }

    /// Current degradation counters.
    pub fn stats(&self) -> ClientStatsSnapshot {
        self.stats.snapshot()
    }

    /// Issue a GET request for an API method and parse the JSON response.
    ///
    /// Transport failures and non-success statuses are retried up to
    /// `retries` attempts. Exhausting the budget degrades to an empty
    /// object rather than an error; the appropriate counter is
    /// incremented so the degradation stays observable. A success
    /// response that fails to parse as JSON is an error.
    pub async fn get_request(&self, method: &str, query: &ApiQuery, retries: u32) -> Result<Value> {
        let url = build_api_url(&self.base_url, method, query, &self.apikey);
        debug!("GET {}", url);

        let outcome = retry(method, retries, RETRY_DELAY, is_retriable, || async {
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(MusixmatchError::RemoteStatus {
                    method: method.to_string(),
                    status,
                });
            }
            let text = response.text().await?;
            let value: Value = serde_json::from_str(&text)?;
            Ok(value)
        })
        .await;

        match outcome {
            Ok(value) => Ok(value),
            Err(MusixmatchError::Transport(e)) => {
                self.stats.transport_failures.fetch_add(1, Ordering::Relaxed);
                error!("{} failed after {} attempts: {}", method, retries, e);
                Ok(json!({}))
            }
            Err(MusixmatchError::RemoteStatus { method, status }) => {
                self.stats.status_failures.fetch_add(1, Ordering::Relaxed);
                error!("{} kept returning status {}, giving up", method, status);
                Ok(json!({}))
            }
            Err(e) => Err(e),
        }
    }

    /// Extract the payload from a response envelope.
    ///
    /// Every response is expected to nest its payload under
    /// `message.body`. If either level is missing the anomaly is logged
    /// and counted, and an empty object is returned; callers treat that
    /// as "no data this call".
    pub fn unwrap_body(&self, response: &Value) -> Value {
        match response.get("message").and_then(|m| m.get("body")) {
            Some(body) => body.clone(),
            None => {
                self.stats.empty_envelopes.fetch_add(1, Ordering::Relaxed);
                warn!("Response envelope is missing message.body: {}", response);
                json!({})
            }
        }
    }

    /// Raw envelope for the `music.genres.get` method.
    pub async fn music_genres_get(&self) -> Result<Value> {
        self.get_request("music.genres.get", &ApiQuery::new(), DEFAULT_RETRIES)
            .await
    }

    /// List the genre catalog as flat records, in response order.
    ///
    /// Each list entry nests its payload one level deeper than the list
    /// itself; the inner `music_genre` object is pulled up. Malformed
    /// entries are skipped with a warning.
    pub async fn get_genres(&self) -> Result<Vec<Genre>> {
        let response = self.music_genres_get().await?;
        let body = self.unwrap_body(&response);

        let entries = body
            .get("music_genre_list")
            .and_then(|l| l.as_array())
            .cloned()
            .unwrap_or_default();

        let mut genres = Vec::with_capacity(entries.len());
        for entry in &entries {
            match Genre::from_list_entry(entry) {
                Some(genre) => genres.push(genre),
                None => warn!("Skipping malformed genre entry: {}", entry),
            }
        }
        Ok(genres)
    }

    /// Search for tracks, returning one page of the unwrapped body.
    ///
    /// The body still contains the `track_list` of item-wrapper
    /// envelopes; callers unwrap each entry themselves. Filters are
    /// validated for presence before any network call: an unset value
    /// fails with [`MusixmatchError::Validation`].
    pub async fn track_search(
        &self,
        page: u32,
        page_size: u32,
        filters: &SearchFilters,
    ) -> Result<Value> {
        let pairs = filters.validated()?;

        let mut query = ApiQuery::new();
        query.set("page", page);
        query.set("page_size", page_size);
        query.set("f_has_lyrics", true);
        for (name, value) in pairs {
            query.set(name, value.clone());
        }

        let response = self.get_request("track.search", &query, DEFAULT_RETRIES).await?;
        Ok(self.unwrap_body(&response))
    }

    /// Raw envelope for the `track.lyrics.get` method.
    ///
    /// `commontrack_id` is sent only when present.
    pub async fn track_lyrics_get(
        &self,
        track_id: i64,
        commontrack_id: Option<i64>,
    ) -> Result<Value> {
        let mut query = ApiQuery::new();
        query.set("track_id", track_id);
        if let Some(id) = commontrack_id {
            query.set("commontrack_id", id);
        }
        self.get_request("track.lyrics.get", &query, DEFAULT_RETRIES)
            .await
    }
}

/// Transport failures and bad statuses are worth another attempt;
/// everything else is not.
fn is_retriable(error: &MusixmatchError) -> bool {
    matches!(
        error,
        MusixmatchError::Transport(_) | MusixmatchError::RemoteStatus { .. }
    )
}
