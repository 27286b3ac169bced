//! Lyrics record helpers.

use serde_json::{json, Map, Value};

/// Deprecated or irrelevant fields stripped from lyrics payloads.
const STRIPPED_FIELDS: [&str; 4] = [
    "script_tracking_url",
    "pixel_tracking_url",
    "lyrics_copyright",
    "updated_time",
];

/// Turn a lyrics payload into a flat export record.
///
/// Strips the deprecated fields and stamps the originating track id.
pub fn scrub_lyrics(payload: &Value, track_id: i64) -> Value {
    let mut lyrics: Map<String, Value> = payload.as_object().cloned().unwrap_or_default();
    for field in STRIPPED_FIELDS {
        lyrics.remove(field);
    }
    lyrics.insert("track_id".to_string(), json!(track_id));
    Value::Object(lyrics)
}

/// The record returned when no lyrics could be fetched for a track:
/// just the stamped identifier, no lyrics fields.
pub fn stub_lyrics(track_id: i64) -> Value {
    json!({ "track_id": track_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_lyrics_strips_and_stamps() {
        let payload = json!({
            "lyrics_id": 100,
            "lyrics_body": "la la la",
            "script_tracking_url": "https://tracking.example/s.js",
            "pixel_tracking_url": "https://tracking.example/p.gif",
            "lyrics_copyright": "(c) someone",
            "updated_time": "2020-01-01T00:00:00Z"
        });

        let record = scrub_lyrics(&payload, 42);
        assert_eq!(record["track_id"], json!(42));
        assert_eq!(record["lyrics_body"], json!("la la la"));
        assert!(record.get("script_tracking_url").is_none());
        assert!(record.get("pixel_tracking_url").is_none());
        assert!(record.get("lyrics_copyright").is_none());
        assert!(record.get("updated_time").is_none());
    }

    #[test]
    fn test_stub_lyrics_is_identifier_only() {
        assert_eq!(stub_lyrics(7), json!({"track_id": 7}));
    }
}
