//! # Batch Converter
//!
//! Runs the selected entries through the decoder one at a time, strictly in
//! input order. Each file goes through:
//!
//! 1. Stage the source into scratch
//! 2. Read metadata, falling back to what the catalog already shows
//! 3. Fetch the cover art (best effort)
//! 4. Decode into the scratch directory
//! 5. Locate the decoded `mp3`/`flac`
//! 6. Stream it into a new document under the destination
//! 7. Optionally delete the source
//! 8. Remove every scratch file the entry produced
//!
//! A failing file becomes a [`ConversionOutcome`] and the batch moves on.
//! Cancellation is checked between files only.

use bridge_traits::decoder::{DecodeRequest, NcmDecoder, DECODE_SUCCESS};
use bridge_traits::storage::{DocumentHandle, DocumentTree};
use chrono::Utc;
use core_catalog::CatalogEntry;
use core_metadata::{CoverArtFetcher, MetadataExtractor, MetadataFallbacks};
use core_runtime::logging::strip_path;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{ConvertError, FailureClass, Result};
use crate::progress::ProgressReporter;
use crate::report::{summarize, BatchReport, ConversionOutcome};
use crate::staging::StagingCache;

/// MIME type the destination document is created with.
pub fn mime_for_extension(extension: &str) -> &'static str {
    if extension.eq_ignore_ascii_case("flac") {
        "audio/flac"
    } else {
        "audio/mpeg"
    }
}

/// What a batch run needs besides the entries.
pub struct BatchTarget<'a> {
    pub tree: &'a dyn DocumentTree,
    pub destination: &'a DocumentHandle,
    pub delete_source: bool,
}

struct Exported {
    handle: DocumentHandle,
    cover_missing: bool,
}

pub struct BatchConverter {
    staging: Arc<StagingCache>,
    extractor: Arc<MetadataExtractor>,
    covers: Arc<CoverArtFetcher>,
    decoder: Arc<dyn NcmDecoder>,
    source_extension: String,
    output_extensions: Vec<String>,
}

impl BatchConverter {
    pub fn new(
        staging: Arc<StagingCache>,
        extractor: Arc<MetadataExtractor>,
        covers: Arc<CoverArtFetcher>,
        decoder: Arc<dyn NcmDecoder>,
        source_extension: impl Into<String>,
        output_extensions: Vec<String>,
    ) -> Self {
        Self {
            staging,
            extractor,
            covers,
            decoder,
            source_extension: source_extension.into(),
            output_extensions,
        }
    }

    /// Convert `entries` and summarize the run.
    ///
    /// Never fails as a whole: every per-file error is recorded in the
    /// report. When `cancel` fires the run stops before the next file and
    /// the report covers only the files processed so far.
    #[instrument(skip_all, fields(batch_id = %progress.batch_id(), total = entries.len()))]
    pub async fn convert(
        &self,
        entries: &[CatalogEntry],
        target: BatchTarget<'_>,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let started_at = Utc::now();
        let total = entries.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut cancelled = false;

        for (position, entry) in entries.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(processed = outcomes.len(), "Batch cancelled at file boundary");
                cancelled = true;
                break;
            }

            let index = position + 1;
            progress.file_started(index, total, &entry.display_title);

            let outcome = self.convert_one(entry, &target).await;
            progress.file_finished(index, &entry.original_name, outcome.failure);
            outcomes.push(outcome);
        }

        let mut report = summarize(&outcomes, started_at, Utc::now());
        report.cancelled = cancelled;

        info!(
            succeeded = report.success_count,
            failed = report.failure_count(),
            cover_warnings = report.cover_warnings.len(),
            "Batch finished"
        );
        report
    }

    #[instrument(skip_all, fields(file = %strip_path(&entry.original_name)))]
    async fn convert_one(&self, entry: &CatalogEntry, target: &BatchTarget<'_>) -> ConversionOutcome {
        let staged = self.staging.scratch_path(&entry.original_name);
        let result = self.run_steps(entry, target, &staged).await;

        let outcome = match result {
            Ok(exported) => {
                debug!(output = %exported.handle, "Exported");
                if target.delete_source {
                    self.delete_source(target.tree, entry).await;
                }
                ConversionOutcome::success(entry.clone(), exported.cover_missing)
            }
            Err(e) => {
                warn!(error = %e, "File conversion failed");
                let class = e.failure_class().unwrap_or(FailureClass::DecodeFailed);
                ConversionOutcome::failed(entry.clone(), class)
            }
        };

        self.staging
            .cleanup_entry(&staged, entry.base_name(&self.source_extension))
            .await;
        outcome
    }

    async fn run_steps(
        &self,
        entry: &CatalogEntry,
        target: &BatchTarget<'_>,
        staged: &Path,
    ) -> Result<Exported> {
        let file = entry.original_name.clone();

        self.staging
            .stage(target.tree, &entry.handle, &entry.original_name)
            .await?;

        let fallbacks = MetadataFallbacks::new(&entry.display_title, &entry.display_artist);
        let metadata = self
            .extractor
            .extract_with(staged, &fallbacks)
            .await
            .map_err(|e| ConvertError::MetadataEmpty {
                file: file.clone(),
                reason: e.to_string(),
            })?;

        let cover = self.covers.fetch(metadata.cover_url.as_deref()).await;

        let request = DecodeRequest {
            input_path: staged.to_path_buf(),
            output_dir: self.staging.scratch_dir().to_path_buf(),
            title: metadata.title,
            artist: metadata.artist,
            album: metadata.album,
            cover: cover.bytes(),
        };
        let status = self
            .decoder
            .decode(request)
            .await
            .map_err(|e| ConvertError::DecodeFailed {
                file: file.clone(),
                reason: e.to_string(),
            })?;
        if status != DECODE_SUCCESS {
            return Err(ConvertError::DecodeFailed {
                file,
                reason: format!("decoder returned status {}", status),
            });
        }

        let base_name = entry.base_name(&self.source_extension);
        let output = self
            .staging
            .locate_output(base_name, &self.output_extensions)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| ConvertError::OutputNotFound { file: file.clone() })?;

        let handle = self.export(target, &output, &file).await?;
        Ok(Exported {
            handle,
            cover_missing: cover.is_missing(),
        })
    }

    /// Create a document under the destination and stream `output` into it.
    /// A document that was created but not fully written is deleted again.
    async fn export(
        &self,
        target: &BatchTarget<'_>,
        output: &Path,
        file: &str,
    ) -> Result<DocumentHandle> {
        let export_failed = |reason: String| ConvertError::ExportFailed {
            file: file.to_string(),
            reason,
        };

        let display_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| export_failed("decoder output has no file name".to_string()))?;
        let extension = output
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let created = target
            .tree
            .create_document(
                target.destination,
                mime_for_extension(&extension),
                &display_name,
            )
            .await
            .map_err(|e| export_failed(format!("cannot create document: {}", e)))?;

        if let Err(reason) = self.write_document(target.tree, &created, output).await {
            if let Err(e) = target.tree.delete(&created).await {
                warn!(error = %e, "Could not remove partial export");
            }
            return Err(export_failed(reason));
        }

        Ok(created)
    }

    async fn write_document(
        &self,
        tree: &dyn DocumentTree,
        created: &DocumentHandle,
        output: &Path,
    ) -> std::result::Result<(), String> {
        let mut reader = self
            .staging
            .open(output)
            .await
            .map_err(|e| format!("cannot read decoder output: {}", e))?;
        let mut writer = tree
            .open_write(created)
            .await
            .map_err(|e| format!("cannot open document for writing: {}", e))?;

        let bytes = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| format!("copy interrupted: {}", e))?;
        writer
            .shutdown()
            .await
            .map_err(|e| format!("cannot flush document: {}", e))?;

        debug!(bytes, "Wrote exported document");
        Ok(())
    }

    async fn delete_source(&self, tree: &dyn DocumentTree, entry: &CatalogEntry) {
        if let Err(e) = tree.delete(&entry.handle).await {
            let error = ConvertError::SourceDeleteFailed {
                file: entry.original_name.clone(),
                reason: e.to_string(),
            };
            warn!(error = %error, "Converted file kept its source");
        }
    }
}
