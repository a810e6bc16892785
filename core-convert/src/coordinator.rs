//! # Conversion Coordinator
//!
//! Owns the scratch directory and runs scans and batches as background
//! tasks.
//!
//! ## Overview
//!
//! The `ConversionCoordinator` wires the staging cache, metadata extractor,
//! scanner and batch converter together and enforces that only one pipeline
//! touches the scratch directory at a time. A second scan or batch started
//! while one is running is rejected with [`ConvertError::PipelineBusy`].
//!
//! ## Workflow
//!
//! ### Scan
//! 1. Claim the pipeline slot and emit `ScanEvent::Started`
//! 2. Enumerate the source and build the catalog off the calling task
//! 3. Sort with the remembered sort mode
//! 4. Emit `Completed`, `Aborted` or `Cancelled` and release the slot
//!
//! ### Batch
//! 1. Claim the pipeline slot
//! 2. Persist the preferences and emit `ConversionEvent::Started`
//! 3. Convert the entries sequentially, reporting progress
//! 4. Sweep the scratch directory
//! 5. Emit `Completed` or `Cancelled` and release the slot
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_convert::ConversionCoordinator;
//!
//! let coordinator = ConversionCoordinator::new(&config, tree, event_bus);
//!
//! let scan = coordinator.start_scan(source, prefs.sort_mode)?;
//! let mut catalog = scan.join().await?;
//! catalog.select_all();
//!
//! let mut batch = coordinator.start_batch(catalog.selected(), destination, prefs).await?;
//! let mut progress = batch.take_progress().unwrap();
//! while progress.changed().await.is_ok() {
//!     if let Some(update) = progress.borrow_and_update().clone() {
//!         println!("{}/{} {}", update.index, update.total, update.title);
//!     }
//! }
//! let report = batch.join().await?;
//! ```

use bridge_traits::storage::{DocumentHandle, DocumentTree, SettingsStore};
use core_catalog::{Catalog, CatalogEntry, SortMode, TitleCollator, UnicodeCollator};
use core_metadata::{CoverArtFetcher, MetadataExtractor};
use core_runtime::config::ConverterConfig;
use core_runtime::events::{ConversionEvent, CoreEvent, EventBus, ScanEvent};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{error, info, instrument, warn, Instrument};
use uuid::Uuid;

use crate::converter::{BatchConverter, BatchTarget};
use crate::error::{ConvertError, Result};
use crate::path_hint::path_hint;
use crate::preferences::{PersistedRoots, UserPreferences};
use crate::progress::{ProgressReceiver, ProgressReporter};
use crate::report::BatchReport;
use crate::scanner::DirectoryScanner;
use crate::staging::StagingCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Scan,
    Batch,
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineKind::Scan => f.write_str("scan"),
            PipelineKind::Batch => f.write_str("batch"),
        }
    }
}

/// The run currently owning the scratch directory.
#[derive(Clone)]
struct ActivePipeline {
    kind: PipelineKind,
    run_id: String,
    cancellation_token: CancellationToken,
}

type PipelineSlot = Arc<Mutex<Option<ActivePipeline>>>;

/// Releases the pipeline slot when the background task ends, even if it
/// panicked.
struct PipelineGuard {
    slot: PipelineSlot,
    run_id: String,
}

impl PipelineGuard {
    fn claim(slot: &PipelineSlot, active: ActivePipeline) -> Result<Self> {
        let mut current = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = current.as_ref() {
            warn!(running = %running.kind, run_id = %running.run_id, "Pipeline busy");
            return Err(ConvertError::PipelineBusy);
        }
        let run_id = active.run_id.clone();
        *current = Some(active);
        Ok(Self {
            slot: Arc::clone(slot),
            run_id,
        })
    }
}

impl Drop for PipelineGuard {
    fn drop(&mut self) {
        let mut current = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().map(|a| a.run_id == self.run_id).unwrap_or(false) {
            *current = None;
        }
    }
}

/// Handle to a running scan.
///
/// Dropping the handle cancels the scan, so a closed picker releases the
/// pipeline at the next file boundary.
#[derive(Debug)]
pub struct ScanHandle {
    scan_id: String,
    cancellation_token: CancellationToken,
    cancel_on_drop: DropGuard,
    task: JoinHandle<Result<Catalog>>,
}

impl ScanHandle {
    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    /// Stop the scan before its next file.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    /// Wait for the sorted catalog.
    ///
    /// # Errors
    ///
    /// [`ConvertError::ScanAborted`] when the source could not be listed,
    /// [`ConvertError::Cancelled`] after a cancel request.
    pub async fn join(self) -> Result<Catalog> {
        let ScanHandle {
            task,
            cancel_on_drop,
            ..
        } = self;
        let result = task.await;
        let _ = cancel_on_drop.disarm();
        result.map_err(|e| ConvertError::TaskFailed(e.to_string()))?
    }
}

/// Handle to a running batch.
pub struct BatchHandle {
    batch_id: String,
    cancellation_token: CancellationToken,
    progress: Option<ProgressReceiver>,
    task: JoinHandle<BatchReport>,
}

impl BatchHandle {
    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    /// Stop the batch at the next file boundary.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    /// Take the receiver holding the file currently being converted.
    /// Returns `None` the second time.
    pub fn take_progress(&mut self) -> Option<ProgressReceiver> {
        self.progress.take()
    }

    /// Wait for the batch report.
    pub async fn join(self) -> Result<BatchReport> {
        self.task
            .await
            .map_err(|e| ConvertError::TaskFailed(e.to_string()))
    }
}

/// Coordinator for scans and batch conversions.
#[derive(Clone)]
pub struct ConversionCoordinator {
    tree: Arc<dyn DocumentTree>,
    settings_store: Arc<dyn SettingsStore>,
    event_bus: EventBus,
    staging: Arc<StagingCache>,
    scanner: Arc<DirectoryScanner>,
    converter: Arc<BatchConverter>,
    collator: Arc<dyn TitleCollator>,
    active: PipelineSlot,
}

impl ConversionCoordinator {
    /// Build a coordinator from a validated configuration.
    ///
    /// `tree` must be able to resolve both the source and the destination
    /// roots the user picks.
    pub fn new(config: &ConverterConfig, tree: Arc<dyn DocumentTree>, event_bus: EventBus) -> Self {
        let staging = Arc::new(StagingCache::new(
            Arc::clone(&config.file_system),
            config.scratch_dir.clone(),
        ));
        let extractor = Arc::new(MetadataExtractor::new(Arc::clone(&config.decoder)));
        let covers = Arc::new(CoverArtFetcher::new(
            config.http_client.clone(),
            config.cover_fetch_timeout,
        ));

        let scanner = Arc::new(DirectoryScanner::new(
            Arc::clone(&staging),
            Arc::clone(&extractor),
            config.source_extension.clone(),
        ));
        let converter = Arc::new(BatchConverter::new(
            Arc::clone(&staging),
            extractor,
            covers,
            Arc::clone(&config.decoder),
            config.source_extension.clone(),
            config.output_extensions.clone(),
        ));

        Self {
            tree,
            settings_store: Arc::clone(&config.settings_store),
            event_bus,
            staging,
            scanner,
            converter,
            collator: Arc::new(UnicodeCollator::new()),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the title collator used for `SortMode::ByTitle`.
    pub fn with_collator(mut self, collator: Arc<dyn TitleCollator>) -> Self {
        self.collator = collator;
        self
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn collator(&self) -> &dyn TitleCollator {
        self.collator.as_ref()
    }

    /// Whether a scan or batch currently owns the scratch directory.
    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub async fn preferences(&self) -> UserPreferences {
        UserPreferences::load(self.settings_store.as_ref()).await
    }

    pub async fn roots(&self) -> Result<PersistedRoots> {
        PersistedRoots::load(self.settings_store.as_ref()).await
    }

    pub async fn set_source_root(&self, root: &DocumentHandle) -> Result<()> {
        PersistedRoots::save_source(self.settings_store.as_ref(), root).await
    }

    pub async fn set_destination_root(&self, root: &DocumentHandle) -> Result<()> {
        PersistedRoots::save_destination(self.settings_store.as_ref(), root).await
    }

    /// Readable location of an entry, if the storage can tell.
    pub fn location_hint(&self, entry: &CatalogEntry) -> Option<String> {
        self.tree
            .path_hint(&entry.handle)
            .or_else(|| path_hint(&entry.document_id))
    }

    /// Start scanning `source` in the background.
    ///
    /// # Errors
    ///
    /// [`ConvertError::PipelineBusy`] if a scan or batch is already running.
    #[instrument(skip(self, source), fields(source = %source))]
    pub fn start_scan(&self, source: DocumentHandle, sort_mode: SortMode) -> Result<ScanHandle> {
        let scan_id = Uuid::new_v4().to_string();
        let cancellation_token = CancellationToken::new();
        let guard = PipelineGuard::claim(
            &self.active,
            ActivePipeline {
                kind: PipelineKind::Scan,
                run_id: scan_id.clone(),
                cancellation_token: cancellation_token.clone(),
            },
        )?;

        self.emit(CoreEvent::Scan(ScanEvent::Started {
            scan_id: scan_id.clone(),
            source: source.to_string(),
        }));

        let coordinator = self.clone();
        let task_scan_id = scan_id.clone();
        let token = cancellation_token.clone();
        let span = tracing::info_span!("scan", scan_id = %scan_id);
        let task = tokio::spawn(
            async move {
                let _guard = guard;
                coordinator
                    .run_scan(&task_scan_id, &source, sort_mode, &token)
                    .await
            }
            .instrument(span),
        );

        info!(scan_id = %scan_id, "Started scan");
        Ok(ScanHandle {
            scan_id,
            cancel_on_drop: cancellation_token.clone().drop_guard(),
            cancellation_token,
            task,
        })
    }

    async fn run_scan(
        &self,
        scan_id: &str,
        source: &DocumentHandle,
        sort_mode: SortMode,
        cancellation_token: &CancellationToken,
    ) -> Result<Catalog> {
        let result = self
            .scanner
            .scan(self.tree.as_ref(), source, cancellation_token)
            .await;

        match result {
            Ok(entries) => {
                let mut catalog = Catalog::from_entries(entries);
                catalog.sort(sort_mode, self.collator.as_ref());
                self.emit(CoreEvent::Scan(ScanEvent::Completed {
                    scan_id: scan_id.to_string(),
                    entry_count: catalog.len(),
                }));
                Ok(catalog)
            }
            Err(ConvertError::Cancelled) => {
                self.emit(CoreEvent::Scan(ScanEvent::Cancelled {
                    scan_id: scan_id.to_string(),
                }));
                Err(ConvertError::Cancelled)
            }
            Err(e) => {
                error!(error = %e, "Scan failed");
                self.emit(CoreEvent::Scan(ScanEvent::Aborted {
                    scan_id: scan_id.to_string(),
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    /// Start converting `entries` into `destination` in the background.
    ///
    /// `preferences` are persisted before the batch starts.
    ///
    /// # Errors
    ///
    /// [`ConvertError::PipelineBusy`] if a scan or batch is already running.
    #[instrument(skip(self, entries, destination), fields(count = entries.len(), destination = %destination))]
    pub async fn start_batch(
        &self,
        entries: Vec<CatalogEntry>,
        destination: DocumentHandle,
        preferences: UserPreferences,
    ) -> Result<BatchHandle> {
        let batch_id = Uuid::new_v4().to_string();
        let cancellation_token = CancellationToken::new();
        let guard = PipelineGuard::claim(
            &self.active,
            ActivePipeline {
                kind: PipelineKind::Batch,
                run_id: batch_id.clone(),
                cancellation_token: cancellation_token.clone(),
            },
        )?;

        if let Err(e) = preferences.save(self.settings_store.as_ref()).await {
            warn!(error = %e, "Could not persist preferences");
        }

        let (reporter, progress) =
            ProgressReporter::channel(batch_id.clone(), Some(self.event_bus.clone()));
        self.emit(CoreEvent::Conversion(ConversionEvent::Started {
            batch_id: batch_id.clone(),
            total: entries.len(),
        }));

        let coordinator = self.clone();
        let token = cancellation_token.clone();
        let span = tracing::info_span!("batch", batch_id = %batch_id);
        let task = tokio::spawn(
            async move {
                let _guard = guard;
                coordinator
                    .run_batch(entries, destination, preferences, reporter, token)
                    .await
            }
            .instrument(span),
        );

        info!(batch_id = %batch_id, "Started batch");
        Ok(BatchHandle {
            batch_id,
            cancellation_token,
            progress: Some(progress),
            task,
        })
    }

    async fn run_batch(
        &self,
        entries: Vec<CatalogEntry>,
        destination: DocumentHandle,
        preferences: UserPreferences,
        reporter: ProgressReporter,
        cancellation_token: CancellationToken,
    ) -> BatchReport {
        let target = BatchTarget {
            tree: self.tree.as_ref(),
            destination: &destination,
            delete_source: preferences.delete_source,
        };
        let report = self
            .converter
            .convert(&entries, target, &reporter, &cancellation_token)
            .await;

        if let Err(e) = self.staging.sweep().await {
            warn!(error = %e, "Scratch sweep failed");
        }

        let batch_id = reporter.batch_id().to_string();
        if report.cancelled {
            reporter.emit(ConversionEvent::Cancelled {
                batch_id,
                processed: report.processed(),
                success_count: report.success_count,
            });
        } else {
            reporter.emit(ConversionEvent::Completed {
                batch_id,
                success_count: report.success_count,
                failed_names: report.failed_names(),
                duration_ms: report.duration().as_millis() as u64,
            });
        }
        report
    }

    /// Cancel the running scan with `scan_id`.
    pub fn cancel_scan(&self, scan_id: &str) -> Result<()> {
        self.cancel_run(PipelineKind::Scan, scan_id)
    }

    /// Cancel the running batch with `batch_id` at its next file boundary.
    pub fn cancel_batch(&self, batch_id: &str) -> Result<()> {
        self.cancel_run(PipelineKind::Batch, batch_id)
    }

    fn cancel_run(&self, kind: PipelineKind, run_id: &str) -> Result<()> {
        let active = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match active {
            Some(run) if run.kind == kind && run.run_id == run_id => {
                run.cancellation_token.cancel();
                info!(kind = %kind, run_id, "Cancellation requested");
                Ok(())
            }
            _ => Err(ConvertError::RunNotFound {
                run_id: run_id.to_string(),
            }),
        }
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is not an error
        self.event_bus.emit(event).ok();
    }
}
