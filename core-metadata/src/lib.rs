//! # Metadata Module
//!
//! Reads display metadata out of encrypted containers and downloads the
//! cover art they reference.
//!
//! ## Overview
//!
//! This module handles:
//! - Normalizing the decoder's JSON metadata blob ([`extractor`])
//! - Best-effort cover art downloads ([`cover`])

pub mod cover;
pub mod error;
pub mod extractor;

pub use cover::{CoverArt, CoverArtFetcher};
pub use error::{MetadataError, Result};
pub use extractor::{
    parse_metadata_json, ExtractedMetadata, MetadataExtractor, MetadataFallbacks, UNKNOWN_ALBUM,
    UNKNOWN_ARTIST,
};
