//! # Directory Scanner
//!
//! Builds the catalog for a source folder. Every child whose name ends with
//! the source extension (case-sensitive) is staged, its metadata read and
//! the staged copy removed again before the next child is looked at.
//!
//! A file whose metadata cannot be read still appears in the catalog as a
//! degraded entry so the user sees it. Only a failure to enumerate the
//! folder itself aborts the scan.

use bridge_traits::storage::{DocumentEntry, DocumentHandle, DocumentTree};
use core_catalog::CatalogEntry;
use core_metadata::MetadataExtractor;
use core_runtime::logging::strip_path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{ConvertError, Result};
use crate::staging::StagingCache;

pub struct DirectoryScanner {
    staging: Arc<StagingCache>,
    extractor: Arc<MetadataExtractor>,
    source_extension: String,
}

impl DirectoryScanner {
    pub fn new(
        staging: Arc<StagingCache>,
        extractor: Arc<MetadataExtractor>,
        source_extension: impl Into<String>,
    ) -> Self {
        Self {
            staging,
            extractor,
            source_extension: source_extension.into(),
        }
    }

    fn is_candidate(&self, child: &DocumentEntry) -> bool {
        !child.is_directory && child.name.ends_with(&self.source_extension)
    }

    /// Enumerate `source` and build one catalog entry per matching file, in
    /// enumeration order.
    ///
    /// # Errors
    ///
    /// - [`ConvertError::ScanAborted`] if the folder cannot be listed
    /// - [`ConvertError::Cancelled`] if `cancel` fires between files
    #[instrument(skip(self, tree, cancel), fields(source = %source))]
    pub async fn scan(
        &self,
        tree: &dyn DocumentTree,
        source: &DocumentHandle,
        cancel: &CancellationToken,
    ) -> Result<Vec<CatalogEntry>> {
        let children = tree
            .list_children(source)
            .await
            .map_err(|e| ConvertError::ScanAborted(e.to_string()))?;

        let candidates: Vec<DocumentEntry> = children
            .into_iter()
            .filter(|child| self.is_candidate(child))
            .collect();
        debug!(candidates = candidates.len(), "Enumerated source folder");

        let mut entries = Vec::with_capacity(candidates.len());
        for child in candidates {
            if cancel.is_cancelled() {
                info!(scanned = entries.len(), "Scan cancelled");
                return Err(ConvertError::Cancelled);
            }
            entries.push(self.scan_entry(tree, child).await);
        }

        info!(
            entries = entries.len(),
            degraded = entries.iter().filter(|e| e.degraded).count(),
            "Scan finished"
        );
        Ok(entries)
    }

    async fn scan_entry(&self, tree: &dyn DocumentTree, child: DocumentEntry) -> CatalogEntry {
        let staged = match self.staging.stage(tree, &child.handle, &child.name).await {
            Ok(path) => path,
            Err(e) => {
                warn!(file = %strip_path(&child.name), error = %e, "Could not stage file for scan");
                return Self::degraded(child);
            }
        };

        let metadata = self.extractor.extract(&staged).await;
        self.staging.remove(&staged).await;

        match metadata {
            Ok(metadata) => CatalogEntry::new(
                child.name,
                child.handle,
                child.document_id,
                metadata.title,
                metadata.artist,
                child.last_modified,
            ),
            Err(e) => {
                warn!(file = %strip_path(&child.name), error = %e, "Metadata unreadable");
                Self::degraded(child)
            }
        }
    }

    fn degraded(child: DocumentEntry) -> CatalogEntry {
        CatalogEntry::degraded(
            child.name,
            child.handle,
            child.document_id,
            child.last_modified,
        )
    }
}
