//! Domain models for the conversion catalog
//!
//! A catalog entry is created by the scanner for every matching file and is
//! mutated afterwards only through its selection flag.

use bridge_traits::storage::DocumentHandle;
use serde::{Deserialize, Serialize};

/// Artist shown for entries whose metadata could not be read.
pub const UNREADABLE_METADATA_ARTIST: &str = "Metadata unreadable";

/// Message shown when a scan produced no entries.
pub const EMPTY_CATALOG_MESSAGE: &str = "No convertible files";

/// One candidate file discovered by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// File name including extension
    pub original_name: String,
    /// Storage reference, never mutated by the core
    pub handle: DocumentHandle,
    /// Stable storage identifier; keys selection and progress
    pub document_id: String,
    pub display_title: String,
    pub display_artist: String,
    /// Last modification time (Unix epoch milliseconds)
    pub last_modified: i64,
    pub selected: bool,
    /// Metadata could not be read when the entry was scanned
    pub degraded: bool,
}

impl CatalogEntry {
    pub fn new(
        original_name: impl Into<String>,
        handle: DocumentHandle,
        document_id: impl Into<String>,
        display_title: impl Into<String>,
        display_artist: impl Into<String>,
        last_modified: i64,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            handle,
            document_id: document_id.into(),
            display_title: display_title.into(),
            display_artist: display_artist.into(),
            last_modified,
            selected: false,
            degraded: false,
        }
    }

    /// Placeholder for a file whose metadata could not be read: the title is
    /// the raw file name and the artist says so.
    pub fn degraded(
        original_name: impl Into<String>,
        handle: DocumentHandle,
        document_id: impl Into<String>,
        last_modified: i64,
    ) -> Self {
        let original_name = original_name.into();
        Self {
            display_title: original_name.clone(),
            display_artist: UNREADABLE_METADATA_ARTIST.to_string(),
            original_name,
            handle,
            document_id: document_id.into(),
            last_modified,
            selected: false,
            degraded: true,
        }
    }

    /// File name with `extension` removed, if it ends with it.
    ///
    /// Decoder outputs are matched against this base name.
    pub fn base_name(&self, extension: &str) -> &str {
        self.original_name
            .strip_suffix(extension)
            .unwrap_or(&self.original_name)
    }

    /// Validate entry data
    pub fn validate(&self) -> Result<(), String> {
        if self.original_name.is_empty() {
            return Err("Entry file name cannot be empty".to_string());
        }

        if self.document_id.is_empty() {
            return Err("Entry document id cannot be empty".to_string());
        }

        if self.original_name.contains('/') {
            return Err(format!(
                "Entry file name '{}' must not contain a path separator",
                self.original_name
            ));
        }

        Ok(())
    }
}
