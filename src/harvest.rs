//! High-level harvesting operations.
//!
//! [`Harvester`] drives the API client through the bulk flows: paginate
//! every genre's track catalog into an append-only sink, and fan out
//! per-track lyrics fetches over a small worker pool. Both flows favor
//! degradation over failure: a broken page truncates one genre, a track
//! without lyrics yields a stub record, and every such event is counted.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::api::client::DEFAULT_PAGE_SIZE;
use crate::api::{MusixmatchApi, ParamValue, SearchFilters};
use crate::error::{MusixmatchError, Result};
use crate::models::{lyrics, track};
use crate::retry::retry;

/// Default worker count for the lyrics fan-out. Deliberately small so a
/// long run stays inside the remote service's rate limits.
pub const DEFAULT_LYRICS_CONCURRENCY: usize = 2;

/// Default attempt budget for a single track's lyrics.
pub const DEFAULT_LYRICS_RETRIES: u32 = 10;

/// Delay between re-polls of a track that reported no lyrics yet.
const LYRICS_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Aggregate progress is reported every this many completed fetches.
const PROGRESS_INTERVAL: usize = 100;

/// Degradation counters for the bulk flows.
#[derive(Debug, Default)]
pub struct HarvestStats {
    pages_truncated: AtomicU64,
    lyrics_exhausted: AtomicU64,
}

impl HarvestStats {
    /// Take a point-in-time view of the counters.
    pub fn snapshot(&self) -> HarvestStatsSnapshot {
        HarvestStatsSnapshot {
            pages_truncated: self.pages_truncated.load(Ordering::Relaxed),
            lyrics_exhausted: self.lyrics_exhausted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`HarvestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStatsSnapshot {
    /// Genres whose pagination was cut short by an error.
    pub pages_truncated: u64,
    /// Tracks whose lyrics retry budget was exhausted.
    pub lyrics_exhausted: u64,
}

/// High-level harvesting interface over [`MusixmatchApi`].
///
/// # Example
///
/// ```rust,no_run
/// use versemine::{Harvester, MusixmatchApi};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let harvester = Harvester::new(MusixmatchApi::new("your_api_key"));
///     let mut sink = Vec::new();
///     let pages = harvester.download_all_tracks(&mut sink, &[12, 21], "en").await?;
///     println!("page counts: {:?}", pages);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Harvester {
    api: MusixmatchApi,
    stats: Arc<HarvestStats>,
}

impl Harvester {
    /// Create a harvester over the given client.
    pub fn new(api: MusixmatchApi) -> Self {
        Self {
            api,
            stats: Arc::new(HarvestStats::default()),
        }
    }

    /// The underlying API client.
    pub fn api(&self) -> &MusixmatchApi {
        &self.api
    }

    /// Current degradation counters.
    pub fn stats(&self) -> HarvestStatsSnapshot {
        self.stats.snapshot()
    }

    /// Download every track page for the given genres into `sink`.
    ///
    /// For each genre id the search is paged from 0 with a fixed lyrics
    /// language filter until a page comes back empty. Each non-empty
    /// page is appended to the sink as ONE JSON-array line of flattened
    /// track records; downstream consumers parse line-by-line and
    /// deduplicate by track id themselves. An error mid-genre truncates
    /// that genre only: it is logged with the page index and the count
    /// accumulated so far, counted, and the run moves on.
    ///
    /// Returns the number of search pages requested per genre.
    pub async fn download_all_tracks<W: Write>(
        &self,
        sink: &mut W,
        genre_ids: &[i64],
        language: &str,
    ) -> Result<HashMap<i64, u32>> {
        let mut page_indexes = HashMap::new();

        for &genre_id in genre_ids {
            info!("Downloading tracks for genre id {}", genre_id);
            let mut page_index: u32 = 0;
            let mut total_tracks: usize = 0;

            loop {
                match self.download_page(sink, genre_id, language, page_index).await {
                    Ok(count) => {
                        page_index += 1;
                        if count == 0 {
                            break;
                        }
                        total_tracks += count;
                    }
                    Err(e) => {
                        self.stats.pages_truncated.fetch_add(1, Ordering::Relaxed);
                        error!(
                            "Genre {} truncated at page {} after {} tracks: {}",
                            genre_id, page_index, total_tracks, e
                        );
                        break;
                    }
                }
            }
            page_indexes.insert(genre_id, page_index);
        }

        info!("Downloaded all track pages");
        Ok(page_indexes)
    }

    /// Fetch one search page and append it to the sink.
    ///
    /// Returns the number of entries the page contained; a missing
    /// `track_list` counts as an empty page.
    async fn download_page<W: Write>(
        &self,
        sink: &mut W,
        genre_id: i64,
        language: &str,
        page: u32,
    ) -> Result<usize> {
        let mut filters = SearchFilters::new();
        filters.insert("f_music_genre_id", Some(ParamValue::Int(genre_id)));
        filters.insert(
            "f_lyrics_language",
            Some(ParamValue::Str(language.to_string())),
        );

        let body = self.api.track_search(page, DEFAULT_PAGE_SIZE, &filters).await?;
        let entries = body
            .get("track_list")
            .and_then(|l| l.as_array())
            .cloned()
            .unwrap_or_default();

        info!("Got {} tracks for genre {} page {}", entries.len(), genre_id, page);
        if entries.is_empty() {
            return Ok(0);
        }

        let tracks: Vec<Value> = entries
            .iter()
            .filter_map(|entry| track::flatten_track(entry, genre_id))
            .collect();

        let line = serde_json::to_string(&tracks)?;
        writeln!(sink, "{}", line)?;
        debug!("Appended page {} for genre {}", page, genre_id);

        Ok(entries.len())
    }

    /// Fetch the lyrics record for one track.
    ///
    /// The detail call is re-polled until a `lyrics` sub-payload shows
    /// up or `max_retries` attempts are spent. On exhaustion the stub
    /// record (identifier only) is returned and counted; this never
    /// returns an error, so one stubborn track cannot fail a batch.
    pub async fn get_lyrics(&self, track_id: i64, max_retries: u32) -> Value {
        let outcome = retry(
            "track.lyrics.get",
            max_retries,
            LYRICS_RETRY_DELAY,
            |e| matches!(e, MusixmatchError::Shape(_)),
            || async {
                let response = self.api.track_lyrics_get(track_id, None).await?;
                let body = self.api.unwrap_body(&response);
                match body.get("lyrics") {
                    Some(found) if found.is_object() => Ok(found.clone()),
                    _ => Err(MusixmatchError::Shape(format!(
                        "track {} has no lyrics payload",
                        track_id
                    ))),
                }
            },
        )
        .await;

        match outcome {
            Ok(found) => lyrics::scrub_lyrics(&found, track_id),
            Err(e) => {
                self.stats.lyrics_exhausted.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Track {} produced no lyrics after {} attempts: {}",
                    track_id, max_retries, e
                );
                lyrics::stub_lyrics(track_id)
            }
        }
    }

    /// Fetch lyrics for many tracks over a bounded worker pool.
    ///
    /// Results preserve input order: `result[i]` belongs to
    /// `track_ids[i]` regardless of completion order. Failed tracks
    /// yield their stub record without affecting the rest. Aggregate
    /// progress is reported as the batch drains.
    pub async fn download_lyrics(
        &self,
        track_ids: &[i64],
        concurrency: usize,
        max_retries: u32,
    ) -> Vec<Value> {
        let total = track_ids.len();
        info!("Downloading lyrics for {} tracks", total);

        let mut results = Vec::with_capacity(total);
        let mut fetches = stream::iter(track_ids.iter().copied())
            .map(|id| self.get_lyrics(id, max_retries))
            .buffered(concurrency.max(1));

        while let Some(record) = fetches.next().await {
            results.push(record);
            let completed = results.len();
            if completed % PROGRESS_INTERVAL == 0 || completed == total {
                info!("Lyrics progress: {}/{}", completed, total);
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn page_body(track_ids: &[i64]) -> String {
        let entries: Vec<Value> = track_ids
            .iter()
            .map(|id| {
                json!({
                    "track": {
                        "track_id": id,
                        "track_name": format!("track {}", id),
                        "primary_genres": {"music_genre_list": []},
                        "has_lyrics": 1
                    }
                })
            })
            .collect();
        json!({"message": {"body": {"track_list": entries}}}).to_string()
    }

    fn lyrics_body(text: &str) -> String {
        json!({
            "message": {"body": {"lyrics": {
                "lyrics_id": 1,
                "lyrics_body": text,
                "script_tracking_url": "https://tracking.example/s.js"
            }}}
        })
        .to_string()
    }

    async fn page_mock(
        server: &mut mockito::ServerGuard,
        page: &str,
        body: String,
    ) -> mockito::Mock {
        server
            .mock("GET", "/track.search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), page.into()),
                Matcher::UrlEncoded("f_music_genre_id".into(), "12".into()),
                Matcher::UrlEncoded("f_lyrics_language".into(), "en".into()),
            ]))
            .with_status(200)
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_download_all_tracks_stops_on_empty_page() {
        let mut server = mockito::Server::new_async().await;
        let page0 = page_mock(&mut server, "0", page_body(&[1, 2, 3])).await;
        let page1 = page_mock(&mut server, "1", page_body(&[4, 5])).await;
        let page2 = page_mock(&mut server, "2", page_body(&[])).await;

        let harvester = Harvester::new(MusixmatchApi::with_base_url("key", &server.url()));
        let mut sink = Vec::new();
        let page_indexes = harvester
            .download_all_tracks(&mut sink, &[12], "en")
            .await
            .unwrap();

        page0.assert_async().await;
        page1.assert_async().await;
        page2.assert_async().await;

        let lines: Vec<&str> = std::str::from_utf8(&sink)
            .unwrap()
            .lines()
            .collect();
        assert_eq!(lines.len(), 2);

        let first: Vec<Value> = serde_json::from_str(lines[0]).unwrap();
        let second: Vec<Value> = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 2);
        assert_eq!(first[0]["music_genre_id"], json!(12));
        assert!(first[0].get("primary_genres").is_none());

        assert_eq!(page_indexes[&12], 3);
        assert_eq!(harvester.stats().pages_truncated, 0);
    }

    #[tokio::test]
    async fn test_download_all_tracks_truncates_genre_on_error() {
        let mut server = mockito::Server::new_async().await;
        let _page0 = page_mock(&mut server, "0", page_body(&[1])).await;
        // A success status with an unparseable body is a hard error,
        // which must stop this genre without failing the run.
        let _page1 = page_mock(&mut server, "1", "not json".to_string()).await;

        let harvester = Harvester::new(MusixmatchApi::with_base_url("key", &server.url()));
        let mut sink = Vec::new();
        let page_indexes = harvester
            .download_all_tracks(&mut sink, &[12], "en")
            .await
            .unwrap();

        let lines: Vec<&str> = std::str::from_utf8(&sink).unwrap().lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(page_indexes[&12], 1);
        assert_eq!(harvester.stats().pages_truncated, 1);
    }

    #[tokio::test]
    async fn test_get_lyrics_scrubs_and_stamps() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/track.lyrics.get")
            .match_query(Matcher::UrlEncoded("track_id".into(), "42".into()))
            .with_status(200)
            .with_body(lyrics_body("la la la"))
            .create_async()
            .await;

        let harvester = Harvester::new(MusixmatchApi::with_base_url("key", &server.url()));
        let record = harvester.get_lyrics(42, 3).await;

        assert_eq!(record["track_id"], json!(42));
        assert_eq!(record["lyrics_body"], json!("la la la"));
        assert!(record.get("script_tracking_url").is_none());
    }

    #[tokio::test]
    async fn test_get_lyrics_exhausts_budget_then_returns_stub() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/track.lyrics.get")
            .match_query(Matcher::UrlEncoded("track_id".into(), "7".into()))
            .with_status(200)
            .with_body(json!({"message": {"body": {}}}).to_string())
            .expect(10)
            .create_async()
            .await;

        let harvester = Harvester::new(MusixmatchApi::with_base_url("key", &server.url()));
        let record = harvester.get_lyrics(7, 10).await;

        mock.assert_async().await;
        assert_eq!(record, json!({"track_id": 7}));
        assert_eq!(harvester.stats().lyrics_exhausted, 1);
    }

    #[tokio::test]
    async fn test_download_lyrics_preserves_input_order() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", "/track.lyrics.get")
            .match_query(Matcher::UrlEncoded("track_id".into(), "1".into()))
            .with_status(200)
            .with_body(lyrics_body("first"))
            .create_async()
            .await;
        // Track 2 never has lyrics: its budget is exhausted and the
        // stub must land at position 1 without disturbing the others.
        let _second = server
            .mock("GET", "/track.lyrics.get")
            .match_query(Matcher::UrlEncoded("track_id".into(), "2".into()))
            .with_status(200)
            .with_body(json!({"message": {"body": {}}}).to_string())
            .expect(2)
            .create_async()
            .await;
        let _third = server
            .mock("GET", "/track.lyrics.get")
            .match_query(Matcher::UrlEncoded("track_id".into(), "3".into()))
            .with_status(200)
            .with_body(lyrics_body("third"))
            .create_async()
            .await;

        let harvester = Harvester::new(MusixmatchApi::with_base_url("key", &server.url()));
        let records = harvester.download_lyrics(&[1, 2, 3], 2, 2).await;

        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["lyrics_body"], json!("first"));
        assert_eq!(records[1], json!({"track_id": 2}));
        assert_eq!(records[2]["lyrics_body"], json!("third"));
        assert_eq!(harvester.stats().lyrics_exhausted, 1);
    }
}
