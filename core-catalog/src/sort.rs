//! Catalog ordering
//!
//! Sorting is stable and touches nothing but the order of entries, so
//! selection flags survive any number of re-sorts.

use feruca::Collator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use crate::models::CatalogEntry;

/// Display order of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Collated ascending on display title
    #[default]
    ByTitle,
    /// Most recently modified first
    ByDate,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::ByTitle => "by_title",
            SortMode::ByDate => "by_date",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by_title" => Ok(SortMode::ByTitle),
            "by_date" => Ok(SortMode::ByDate),
            other => Err(format!("Unknown sort mode: {}", other)),
        }
    }
}

/// Locale-aware title comparison.
///
/// Hosts with access to platform collation (ICU, `java.text.Collator`)
/// inject their own implementation.
pub trait TitleCollator: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Default collator: the Unicode Collation Algorithm over the CLDR root
/// tailoring.
///
/// Accents and case only break ties between otherwise equal titles, and
/// scripts follow the root order (Latin, Greek, Cyrillic, ..., Han).
pub struct UnicodeCollator {
    inner: Mutex<Collator>,
}

impl UnicodeCollator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Collator::default()),
        }
    }
}

impl Default for UnicodeCollator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UnicodeCollator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UnicodeCollator")
    }
}

impl TitleCollator for UnicodeCollator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        // The collator keeps scratch buffers between calls
        let mut collator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        collator.collate(a, b)
    }
}

/// Sort entries in place.
///
/// `ByTitle` is collated ascending, `ByDate` is `last_modified` descending.
/// Entries comparing equal keep their relative order.
pub fn sort_entries(entries: &mut [CatalogEntry], mode: SortMode, collator: &dyn TitleCollator) {
    match mode {
        SortMode::ByTitle => {
            entries.sort_by(|a, b| collator.compare(&a.display_title, &b.display_title))
        }
        SortMode::ByDate => entries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified)),
    }
}

/// Return a sorted copy, leaving `entries` untouched.
pub fn sorted(
    entries: &[CatalogEntry],
    mode: SortMode,
    collator: &dyn TitleCollator,
) -> Vec<CatalogEntry> {
    let mut copy = entries.to_vec();
    sort_entries(&mut copy, mode, collator);
    copy
}
