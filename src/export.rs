//! Flat-file artifacts for harvested data.
//!
//! The track sink written by the harvester is line-oriented: each line
//! is one JSON-array-encoded page of flat records. The helpers here
//! read that format back, normalize and deduplicate the records, and
//! write the delimited exports. Writers take any `io::Write` so the
//! path-level functions stay thin.

use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::Result;
use crate::models::{track, Genre};

/// Parse one sink line into its page of track records.
pub fn parse_page_line(line: &str) -> Result<Vec<Value>> {
    let records: Vec<Value> = serde_json::from_str(line.trim_end())?;
    Ok(records)
}

/// Read a whole page-line stream back into flat track records.
///
/// Blank lines are skipped; a malformed line is an error.
pub fn read_track_pages<R: BufRead>(reader: R) -> Result<Vec<Value>> {
    let mut tracks = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        tracks.extend(parse_page_line(&line)?);
    }
    Ok(tracks)
}

/// Read track records from a page-line file on disk.
pub fn read_track_pages_file<P: AsRef<Path>>(path: P) -> Result<Vec<Value>> {
    let reader = BufReader::new(fs::File::open(&path)?);
    let tracks = read_track_pages(reader)?;
    info!(path = %path.as_ref().display(), records = tracks.len(), "Read track pages");
    Ok(tracks)
}

/// Make sure a record carries a `music_genre_id`.
///
/// Records stamped by the harvester already have one; anything else
/// gets the id extracted from its `primary_genres` nesting, falling
/// back to the unknown-genre sentinel. The nesting is dropped either
/// way. Returns whether the sentinel was used, so callers can count
/// degraded records.
pub fn ensure_genre_id(record: &mut Value) -> bool {
    if record.get("music_genre_id").is_some() {
        return false;
    }

    let (genre_id, degraded) = track::primary_genre_id(record);
    if let Some(obj) = record.as_object_mut() {
        obj.remove("primary_genres");
        obj.insert("music_genre_id".to_string(), json!(genre_id));
    }
    degraded
}

/// Sort records by track id and drop duplicates.
///
/// Pagination gives no uniqueness guarantee; deduplication by item
/// identifier is the downstream consumer's job, and this is it.
pub fn dedup_by_track_id(mut records: Vec<Value>) -> Vec<Value> {
    records.sort_by_key(|r| track::track_id(r).unwrap_or(i64::MIN));
    records.dedup_by_key(|r| track::track_id(r).unwrap_or(i64::MIN));
    records
}

/// Track ids of the records flagged as having lyrics.
pub fn lyrics_candidates(records: &[Value]) -> Vec<i64> {
    records
        .iter()
        .filter(|r| track::has_lyrics(r))
        .filter_map(|r| track::track_id(r))
        .collect()
}

/// Render one JSON value as a TSV cell.
///
/// Null renders empty; tabs and line breaks inside strings are replaced
/// so a cell cannot break the row structure.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.replace(['\t', '\n', '\r'], " "),
        other => other.to_string(),
    }
}

/// Write records as TSV with columns in first-appearance order.
pub fn write_tsv<W: Write>(writer: &mut W, records: &[Value]) -> Result<()> {
    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for record in records {
        if let Some(obj) = record.as_object() {
            for key in obj.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }
    }

    writeln!(writer, "{}", columns.join("\t"))?;
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| record.get(column).map(cell).unwrap_or_default())
            .collect();
        writeln!(writer, "{}", row.join("\t"))?;
    }
    Ok(())
}

/// Write records as a TSV file.
pub fn write_tsv_file<P: AsRef<Path>>(path: P, records: &[Value]) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(&path)?);
    write_tsv(&mut writer, records)?;
    writer.flush()?;
    info!(path = %path.as_ref().display(), rows = records.len(), "Wrote TSV");
    Ok(())
}

/// Write the genre catalog as TSV with its fixed columns.
pub fn write_genres_tsv<W: Write>(writer: &mut W, genres: &[Genre]) -> Result<()> {
    writeln!(
        writer,
        "music_genre_id\tmusic_genre_parent_id\tmusic_genre_name\tmusic_genre_name_extended\tmusic_genre_vanity"
    )?;
    for genre in genres {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            genre.music_genre_id,
            genre
                .music_genre_parent_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            genre.music_genre_name,
            genre.music_genre_name_extended.as_deref().unwrap_or(""),
            genre.music_genre_vanity.as_deref().unwrap_or(""),
        )?;
    }
    Ok(())
}

/// Write the genre catalog as a TSV file.
pub fn write_genres_tsv_file<P: AsRef<Path>>(path: P, genres: &[Genre]) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(&path)?);
    write_genres_tsv(&mut writer, genres)?;
    writer.flush()?;
    info!(path = %path.as_ref().display(), rows = genres.len(), "Wrote genres TSV");
    Ok(())
}

/// Write a JSON artifact.
pub fn write_json_file<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&path, &json)?;
    info!(path = %path.as_ref().display(), bytes = json.len(), "Wrote JSON");
    Ok(())
}
