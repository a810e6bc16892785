//! In-memory catalog with selection state
//!
//! Holds the entries of one scan in display order. Entries are addressed by
//! their stable `document_id`, so selection keeps working across re-sorts
//! and when two files share a display title.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CatalogEntry, EMPTY_CATALOG_MESSAGE};
use crate::sort::{sort_entries, SortMode, TitleCollator};

/// Ordered set of candidate files discovered by one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Wrap scanned entries, keeping enumeration order.
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<CatalogEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// User-facing message for an empty catalog.
    pub fn empty_message(&self) -> Option<&'static str> {
        self.is_empty().then_some(EMPTY_CATALOG_MESSAGE)
    }

    pub fn get(&self, document_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.document_id == document_id)
    }

    /// Reorder for display. Selection flags are untouched.
    pub fn sort(&mut self, mode: SortMode, collator: &dyn TitleCollator) {
        sort_entries(&mut self.entries, mode, collator);
        debug!(mode = %mode, count = self.entries.len(), "Sorted catalog");
    }

    /// Flip one entry's selection. Returns the new state, or `None` if the
    /// id is unknown.
    pub fn toggle(&mut self, document_id: &str) -> Option<bool> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.document_id == document_id)?;
        entry.selected = !entry.selected;
        Some(entry.selected)
    }

    /// Set one entry's selection. Returns `false` if the id is unknown.
    pub fn set_selected(&mut self, document_id: &str, selected: bool) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|e| e.document_id == document_id)
        {
            Some(entry) => {
                entry.selected = selected;
                true
            }
            None => false,
        }
    }

    /// Select everything, or deselect everything when all entries are
    /// already selected. Returns whether entries are now selected.
    pub fn select_all(&mut self) -> bool {
        let target = !self.all_selected();
        for entry in &mut self.entries {
            entry.selected = target;
        }
        target
    }

    pub fn clear_selection(&mut self) {
        for entry in &mut self.entries {
            entry.selected = false;
        }
    }

    pub fn invert_selection(&mut self) {
        for entry in &mut self.entries {
            entry.selected = !entry.selected;
        }
    }

    fn all_selected(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.selected)
    }

    /// Selected entries in current display order.
    pub fn selected(&self) -> Vec<CatalogEntry> {
        self.entries.iter().filter(|e| e.selected).cloned().collect()
    }

    /// `(selected, total)` counts.
    pub fn selection_counts(&self) -> (usize, usize) {
        let selected = self.entries.iter().filter(|e| e.selected).count();
        (selected, self.entries.len())
    }
}
