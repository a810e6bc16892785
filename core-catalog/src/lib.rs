//! # Conversion Catalog
//!
//! The catalog is the in-memory, ordered set of candidate files found by one
//! scan, together with the user's selection.
//!
//! ## Overview
//!
//! - [`CatalogEntry`]: one discovered file with its display metadata
//! - [`Catalog`]: selection operations (toggle, select all, invert)
//! - [`sort_entries`]: stable ordering by collated title or newest first
//!
//! Everything here is pure data manipulation; no I/O happens in this crate.
//!
//! ## Usage
//!
//! ```ignore
//! use core_catalog::{Catalog, SortMode, UnicodeCollator};
//!
//! let mut catalog = Catalog::from_entries(scanned);
//! catalog.sort(SortMode::ByDate, &UnicodeCollator::new());
//! catalog.select_all();
//! let batch = catalog.selected();
//! ```

pub mod models;
pub mod selection;
pub mod sort;

pub use models::{CatalogEntry, EMPTY_CATALOG_MESSAGE, UNREADABLE_METADATA_ARTIST};
pub use selection::Catalog;
pub use sort::{sort_entries, sorted, SortMode, TitleCollator, UnicodeCollator};
