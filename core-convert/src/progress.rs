//! Progress reporting for batch runs
//!
//! The converter publishes the file it is working on through a `watch`
//! channel and the event bus. Neither hand-off blocks: the watch slot keeps
//! only the latest update, so a slow reader always sees the current file,
//! and the bus never waits for subscribers. The full per-file history is on
//! the bus as `ConversionEvent::Progress`.

use core_runtime::events::{ConversionEvent, CoreEvent, EventBus};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::FailureClass;

/// Per-file progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// One-based position in the batch
    pub index: usize,
    pub total: usize,
    pub title: String,
}

/// Receiving half handed to the caller of a batch. Holds `None` until the
/// first file starts.
pub type ProgressReceiver = watch::Receiver<Option<BatchProgress>>;

/// Sending side used by the converter.
#[derive(Clone)]
pub struct ProgressReporter {
    batch_id: String,
    channel: Option<watch::Sender<Option<BatchProgress>>>,
    event_bus: Option<EventBus>,
}

impl ProgressReporter {
    /// Reporter publishing the latest update to a watch channel.
    pub fn channel(
        batch_id: impl Into<String>,
        event_bus: Option<EventBus>,
    ) -> (Self, ProgressReceiver) {
        let (tx, rx) = watch::channel(None);
        let reporter = Self {
            batch_id: batch_id.into(),
            channel: Some(tx),
            event_bus,
        };
        (reporter, rx)
    }

    /// Reporter that only emits bus events.
    pub fn events_only(batch_id: impl Into<String>, event_bus: EventBus) -> Self {
        Self {
            batch_id: batch_id.into(),
            channel: None,
            event_bus: Some(event_bus),
        }
    }

    /// Reporter that discards everything.
    pub fn silent() -> Self {
        Self {
            batch_id: String::new(),
            channel: None,
            event_bus: None,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn file_started(&self, index: usize, total: usize, title: &str) {
        if let Some(tx) = &self.channel {
            let update = BatchProgress {
                index,
                total,
                title: title.to_string(),
            };
            // Succeeds with or without a receiver
            tx.send_replace(Some(update));
        }

        self.emit(ConversionEvent::Progress {
            batch_id: self.batch_id.clone(),
            index,
            total,
            title: title.to_string(),
        });
    }

    pub fn file_finished(&self, index: usize, name: &str, failure: Option<FailureClass>) {
        self.emit(ConversionEvent::FileFinished {
            batch_id: self.batch_id.clone(),
            index,
            name: name.to_string(),
            failure: failure.map(|class| class.as_str().to_string()),
        });
    }

    pub(crate) fn emit(&self, event: ConversionEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is not an error
            bus.emit(CoreEvent::Conversion(event)).ok();
        }
    }
}
