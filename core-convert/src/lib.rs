//! # Conversion Pipeline
//!
//! Scans a source folder for encrypted containers and converts a selection
//! of them into playable audio files.
//!
//! ## Overview
//!
//! This module manages both pipelines and the scratch directory they share:
//! - Staging documents into local scratch files for the path-based decoder
//! - Building the catalog, with degraded entries for unreadable files
//! - Converting a selection sequentially with per-file failure isolation
//! - Folding per-file outcomes into a batch report and user notice
//! - Remembering sort mode, delete-source flag and picked roots
//!
//! ## Components
//!
//! - **Staging Cache** (`staging`): Copies documents into scratch and cleans up
//! - **Directory Scanner** (`scanner`): Builds catalog entries for one folder
//! - **Batch Converter** (`converter`): Stage, decode, locate, export, delete
//! - **Batch Results** (`report`): Outcomes, report aggregation and notices
//! - **Progress** (`progress`): Bounded, non-blocking progress hand-off
//! - **Preferences** (`preferences`): Persisted user choices
//! - **Path Hints** (`path_hint`): Readable locations for tree document ids
//! - **Coordinator** (`coordinator`): Background tasks, single active pipeline

pub mod converter;
pub mod coordinator;
pub mod error;
pub mod path_hint;
pub mod preferences;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod staging;

pub use converter::{mime_for_extension, BatchConverter, BatchTarget};
pub use coordinator::{BatchHandle, ConversionCoordinator, PipelineKind, ScanHandle};
pub use error::{ConvertError, FailureClass, Result};
pub use path_hint::path_hint;
pub use preferences::{PersistedRoots, UserPreferences};
pub use progress::{BatchProgress, ProgressReceiver, ProgressReporter};
pub use report::{
    summarize, BatchReport, ConversionOutcome, FailedFile, Notice, NoticeKind,
    FAILURE_NOTICE_DURATION, SUCCESS_NOTICE_DURATION,
};
pub use scanner::DirectoryScanner;
pub use staging::StagingCache;
