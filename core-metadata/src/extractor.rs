//! Decoder Metadata Extraction
//!
//! Turns the JSON blob returned by the decoder's metadata contract into a
//! display record.
//!
//! ## Overview
//!
//! - `musicName` becomes the title
//! - `artist` is an array of arrays; the first item of each inner array is
//!   one artist name, joined with `" / "` in source order
//! - `album` becomes the album, `albumPic` the remote cover URL
//!
//! Missing or malformed fields fall back to defaults and never fail the
//! extraction. Only a blob that is empty (two characters or fewer) or not a
//! JSON object is an error.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::extractor::{MetadataExtractor, MetadataFallbacks};
//!
//! let extractor = MetadataExtractor::new(decoder);
//! let metadata = extractor.extract(&staged_path).await?;
//! println!("{} - {}", metadata.artist, metadata.title);
//! ```

use bridge_traits::NcmDecoder;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{MetadataError, Result};

/// Artist shown when the blob names no artist.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Album used when the blob names no album.
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

const ARTIST_SEPARATOR: &str = " / ";

/// Normalized metadata for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Remote cover image URL, if the blob carried a non-empty one
    pub cover_url: Option<String>,
}

/// Values substituted for missing title and artist.
///
/// Scans use the file name and [`UNKNOWN_ARTIST`]; conversions reuse the
/// title and artist already shown for the catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFallbacks {
    pub title: String,
    pub artist: String,
}

impl MetadataFallbacks {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    /// Fallbacks used while scanning: the file name and the unknown artist.
    pub fn for_file(file_name: impl Into<String>) -> Self {
        Self::new(file_name, UNKNOWN_ARTIST)
    }
}

/// Parse a decoder metadata blob.
///
/// # Errors
///
/// [`MetadataError::MetadataEmpty`] if `raw` has two characters or fewer or
/// is not a JSON object.
pub fn parse_metadata_json(
    file: &str,
    raw: &str,
    fallbacks: &MetadataFallbacks,
) -> Result<ExtractedMetadata> {
    if raw.chars().count() <= 2 {
        return Err(MetadataError::MetadataEmpty {
            file: file.to_string(),
            reason: format!("decoder returned {:?}", raw),
        });
    }

    let object: Map<String, Value> =
        serde_json::from_str(raw).map_err(|e| MetadataError::MetadataEmpty {
            file: file.to_string(),
            reason: format!("not a JSON object: {}", e),
        })?;

    let title = non_empty_string(object.get("musicName"))
        .unwrap_or_else(|| fallbacks.title.clone());
    let artist = join_artists(object.get("artist")).unwrap_or_else(|| fallbacks.artist.clone());
    let album =
        non_empty_string(object.get("album")).unwrap_or_else(|| UNKNOWN_ALBUM.to_string());
    let cover_url = non_empty_string(object.get("albumPic"));

    Ok(ExtractedMetadata {
        title,
        artist,
        album,
        cover_url,
    })
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// `[["A", 1], ["B", 2]]` -> `"A / B"`. Any other shape yields `None`.
fn join_artists(value: Option<&Value>) -> Option<String> {
    let groups = value?.as_array()?;
    let names = groups
        .iter()
        .map(|group| group.as_array()?.first()?.as_str())
        .collect::<Option<Vec<&str>>>()?;

    if names.is_empty() {
        return None;
    }
    Some(names.join(ARTIST_SEPARATOR))
}

/// Reads metadata through the decoder engine.
pub struct MetadataExtractor {
    decoder: Arc<dyn NcmDecoder>,
}

impl MetadataExtractor {
    pub fn new(decoder: Arc<dyn NcmDecoder>) -> Self {
        Self { decoder }
    }

    /// Extract metadata from a staged container using scan fallbacks.
    pub async fn extract(&self, local_path: &Path) -> Result<ExtractedMetadata> {
        let file_name = file_name_of(local_path);
        self.extract_with(local_path, &MetadataFallbacks::for_file(file_name))
            .await
    }

    /// Extract metadata with caller supplied fallbacks.
    ///
    /// Calling this twice on the same unchanged file yields equal results.
    #[instrument(skip(self, fallbacks), fields(file = %file_name_of(local_path)))]
    pub async fn extract_with(
        &self,
        local_path: &Path,
        fallbacks: &MetadataFallbacks,
    ) -> Result<ExtractedMetadata> {
        let raw = self.decoder.get_metadata(local_path).await?;
        let metadata = parse_metadata_json(&file_name_of(local_path), &raw, fallbacks)?;

        debug!(
            has_cover = metadata.cover_url.is_some(),
            "Extracted metadata"
        );
        Ok(metadata)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
