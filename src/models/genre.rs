//! Genre (music category) records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A music genre from the catalog listing.
///
/// The listing nests each record one level deeper than the list itself
/// (`music_genre_list[i].music_genre`); [`Genre::from_list_entry`]
/// pulls that inner layer up into this flat shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Genre {
    /// Genre identifier.
    pub music_genre_id: i64,

    /// Parent genre identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_genre_parent_id: Option<i64>,

    /// Display name.
    pub music_genre_name: String,

    /// Display name including the parent genre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_genre_name_extended: Option<String>,

    /// URL-friendly name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_genre_vanity: Option<String>,
}

impl Genre {
    /// Flatten one entry of the genre listing.
    ///
    /// Returns `None` when the entry has no `music_genre` payload or
    /// the payload does not deserialize.
    pub fn from_list_entry(entry: &Value) -> Option<Self> {
        let inner = entry.get("music_genre")?;
        serde_json::from_value(inner.clone()).ok()
    }
}
