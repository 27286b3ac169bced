//! Track record helpers.
//!
//! Track records stay raw JSON maps; the helpers here unwrap search
//! entries, strip the bulky nested fields the exports never use, and
//! stamp the genre a record was found under.

use serde_json::{json, Value};
use tracing::warn;

/// Sentinel genre id marking "category unknown".
pub const UNKNOWN_GENRE_ID: i64 = -1;

/// Nested fields dropped from every track record before export.
const STRIPPED_FIELDS: [&str; 3] = [
    "primary_genres",
    "secondary_genres",
    "track_name_translation_list",
];

/// Unwrap one search-result entry into a flat track record.
///
/// Each entry wraps its actual payload one level deeper under `track`.
/// The stripped fields are removed and `music_genre_id` is stamped with
/// the genre the search ran under. Returns `None` for entries without a
/// `track` object.
pub fn flatten_track(entry: &Value, genre_id: i64) -> Option<Value> {
    let mut track = entry.get("track")?.as_object()?.clone();
    for field in STRIPPED_FIELDS {
        track.remove(field);
    }
    track.insert("music_genre_id".to_string(), json!(genre_id));
    Some(Value::Object(track))
}

/// Extract a track's primary genre id.
///
/// The id sits at the end of a list-of-lists lookup
/// (`primary_genres.music_genre_list[0].music_genre.music_genre_id`).
/// If any step of the path is absent the sentinel
/// [`UNKNOWN_GENRE_ID`] is returned together with a degraded flag, and
/// the anomaly is logged; callers count the flag.
pub fn primary_genre_id(track: &Value) -> (i64, bool) {
    let id = track
        .get("primary_genres")
        .and_then(|p| p.get("music_genre_list"))
        .and_then(|l| l.as_array())
        .and_then(|l| l.first())
        .and_then(|e| e.get("music_genre"))
        .and_then(|g| g.get("music_genre_id"))
        .and_then(|v| v.as_i64());

    match id {
        Some(id) => (id, false),
        None => {
            warn!(
                "Track {} has no primary genre, using sentinel",
                track.get("track_id").unwrap_or(&serde_json::Value::Null)
            );
            (UNKNOWN_GENRE_ID, true)
        }
    }
}

/// The record's track id, if present.
pub fn track_id(track: &Value) -> Option<i64> {
    track.get("track_id").and_then(|v| v.as_i64())
}

/// Whether the record is flagged as having lyrics.
pub fn has_lyrics(track: &Value) -> bool {
    track.get("has_lyrics").and_then(|v| v.as_i64()) == Some(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_track_strips_and_stamps() {
        let entry = json!({
            "track": {
                "track_id": 42,
                "track_name": "Song",
                "primary_genres": {"music_genre_list": []},
                "secondary_genres": {"music_genre_list": []},
                "track_name_translation_list": [{"track_name_translation": {}}]
            }
        });

        let track = flatten_track(&entry, 12).unwrap();
        assert_eq!(track["track_id"], json!(42));
        assert_eq!(track["music_genre_id"], json!(12));
        assert!(track.get("primary_genres").is_none());
        assert!(track.get("secondary_genres").is_none());
        assert!(track.get("track_name_translation_list").is_none());
    }

    #[test]
    fn test_flatten_track_without_payload() {
        assert_eq!(flatten_track(&json!({"other": 1}), 12), None);
    }

    #[test]
    fn test_primary_genre_id_found() {
        let track = json!({
            "track_id": 42,
            "primary_genres": {
                "music_genre_list": [
                    {"music_genre": {"music_genre_id": 21}},
                    {"music_genre": {"music_genre_id": 34}}
                ]
            }
        });
        assert_eq!(primary_genre_id(&track), (21, false));
    }

    #[test]
    fn test_primary_genre_id_missing_path_uses_sentinel() {
        let track = json!({"track_id": 42});
        assert_eq!(primary_genre_id(&track), (UNKNOWN_GENRE_ID, true));

        let empty_list = json!({"primary_genres": {"music_genre_list": []}});
        assert_eq!(primary_genre_id(&empty_list), (UNKNOWN_GENRE_ID, true));
    }

    #[test]
    fn test_has_lyrics_flag() {
        assert!(has_lyrics(&json!({"has_lyrics": 1})));
        assert!(!has_lyrics(&json!({"has_lyrics": 0})));
        assert!(!has_lyrics(&json!({})));
    }
}
