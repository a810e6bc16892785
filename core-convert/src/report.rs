//! # Batch Results
//!
//! Per-file outcomes are folded into a [`BatchReport`], which also renders
//! the notice shown to the user once a run ends.

use chrono::{DateTime, Utc};
use core_catalog::CatalogEntry;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::FailureClass;

/// How long a notice for a clean run stays visible.
pub const SUCCESS_NOTICE_DURATION: Duration = Duration::from_secs(8);

/// How long a notice listing failures stays visible unless dismissed.
pub const FAILURE_NOTICE_DURATION: Duration = Duration::from_secs(20);

/// Result of converting one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub entry: CatalogEntry,
    /// `None` on success
    pub failure: Option<FailureClass>,
    /// The metadata named a cover that could not be embedded
    pub cover_missing: bool,
}

impl ConversionOutcome {
    pub fn success(entry: CatalogEntry, cover_missing: bool) -> Self {
        Self {
            entry,
            failure: None,
            cover_missing,
        }
    }

    pub fn failed(entry: CatalogEntry, class: FailureClass) -> Self {
        Self {
            entry,
            failure: Some(class),
            cover_missing: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// One failed file in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub original_name: String,
    pub class: FailureClass,
}

/// Aggregate summary of one conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub success_count: usize,
    /// Failed files in processing order
    pub failures: Vec<FailedFile>,
    /// Converted files written without their cover art
    pub cover_warnings: Vec<String>,
    /// Set when the run stopped early at a cancellation checkpoint
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Files accounted for by this report.
    pub fn processed(&self) -> usize {
        self.success_count + self.failures.len()
    }

    pub fn failed_names(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| f.original_name.clone())
            .collect()
    }

    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Notice summarizing the run.
    pub fn notice(&self) -> Notice {
        if self.failures.is_empty() {
            return Notice {
                kind: NoticeKind::Success,
                headline: format!("Converted {} file(s)", self.success_count),
                details: Vec::new(),
                dismiss_after: SUCCESS_NOTICE_DURATION,
            };
        }

        Notice {
            kind: NoticeKind::Failure,
            headline: format!(
                "Succeeded: {} / Failed: {}",
                self.success_count,
                self.failures.len()
            ),
            details: self.failed_names(),
            dismiss_after: FAILURE_NOTICE_DURATION,
        }
    }
}

/// Fold outcomes into a report. Failure order follows outcome order and
/// repeated names are kept.
pub fn summarize(
    outcomes: &[ConversionOutcome],
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> BatchReport {
    let mut report = BatchReport {
        success_count: 0,
        failures: Vec::new(),
        cover_warnings: Vec::new(),
        cancelled: false,
        started_at,
        finished_at,
    };

    for outcome in outcomes {
        match outcome.failure {
            None => {
                report.success_count += 1;
                if outcome.cover_missing {
                    report
                        .cover_warnings
                        .push(outcome.entry.original_name.clone());
                }
            }
            Some(class) => report.failures.push(FailedFile {
                original_name: outcome.entry.original_name.clone(),
                class,
            }),
        }
    }

    report
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeKind {
    Success,
    Failure,
}

/// User-facing message for a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub headline: String,
    /// Failed file names, one per line
    pub details: Vec<String>,
    pub dismiss_after: Duration,
}

impl Notice {
    pub fn render(&self) -> String {
        if self.details.is_empty() {
            return self.headline.clone();
        }
        format!("{}\n\n{}", self.headline, self.details.join("\n"))
    }
}
