//! # Event Bus System
//!
//! Provides an event-driven channel between the conversion core and its host
//! using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for scans and batches
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Scan task    ├──────────────>│           │     subscribe    ┌────────────┐
//! └──────────────┘               │ EventBus  ├─────────────────>│ Host UI    │
//!                                │ (broadcast│                  └────────────┘
//! ┌──────────────┐     emit      │  channel) │     subscribe    ┌────────────┐
//! │ Batch task   ├──────────────>│           ├─────────────────>│ Logger     │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! Events are notifications. The catalog produced by a scan and the report
//! produced by a batch are handed back through the coordinator's task
//! handles; events carry only what a UI needs to render status.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{ConversionEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Conversion(ConversionEvent::Progress {
//!         batch_id: "batch-1".to_string(),
//!         index: 1,
//!         total: 3,
//!         title: "Alpha".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! println!("{}", event.description());
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; progress events are superseded by later ones anyway.
//! - **`RecvError::Closed`**: All senders have been dropped. Treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Directory scan events
    Scan(ScanEvent),
    /// Batch conversion events
    Conversion(ConversionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Scan(e) => e.description(),
            CoreEvent::Conversion(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Scan(ScanEvent::Aborted { .. }) => EventSeverity::Error,
            CoreEvent::Conversion(ConversionEvent::FileFinished {
                failure: Some(_), ..
            }) => EventSeverity::Warning,
            CoreEvent::Conversion(ConversionEvent::Completed { failed_names, .. })
                if !failed_names.is_empty() =>
            {
                EventSeverity::Warning
            }
            CoreEvent::Scan(ScanEvent::Completed { .. })
            | CoreEvent::Conversion(ConversionEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Scan Events
// ============================================================================

/// Events emitted while enumerating a source directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ScanEvent {
    /// Scan task started.
    Started {
        /// Unique identifier for this scan.
        scan_id: String,
        /// Opaque source root reference.
        source: String,
    },
    /// Scan finished; the catalog is available from the scan handle.
    Completed {
        scan_id: String,
        /// Number of catalog entries, degraded ones included.
        entry_count: usize,
    },
    /// Enumerating the source failed; the catalog is empty.
    Aborted {
        scan_id: String,
        /// Human-readable error message.
        message: String,
    },
    /// Scan was cancelled before it finished.
    Cancelled { scan_id: String },
}

impl ScanEvent {
    fn description(&self) -> &str {
        match self {
            ScanEvent::Started { .. } => "Scan started",
            ScanEvent::Completed { .. } => "Scan completed",
            ScanEvent::Aborted { .. } => "Scan aborted",
            ScanEvent::Cancelled { .. } => "Scan cancelled",
        }
    }
}

// ============================================================================
// Conversion Events
// ============================================================================

/// Events emitted by a batch conversion run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConversionEvent {
    /// Batch task started.
    Started {
        /// Unique identifier for this batch.
        batch_id: String,
        /// Number of selected entries.
        total: usize,
    },
    /// A file is about to be processed.
    Progress {
        batch_id: String,
        /// One-based position of the file in the batch.
        index: usize,
        total: usize,
        /// Display title of the file.
        title: String,
    },
    /// A file finished, successfully or not.
    FileFinished {
        batch_id: String,
        index: usize,
        /// Original file name including extension.
        name: String,
        /// Failure class name, `None` on success.
        failure: Option<String>,
    },
    /// Batch finished; the full report is available from the batch handle.
    Completed {
        batch_id: String,
        success_count: usize,
        /// Original names of failed files, in processing order.
        failed_names: Vec<String>,
        /// Wall-clock duration of the batch in milliseconds.
        duration_ms: u64,
    },
    /// Batch stopped at a file boundary after a cancel request.
    Cancelled {
        batch_id: String,
        /// Files processed before the checkpoint.
        processed: usize,
        success_count: usize,
    },
}

impl ConversionEvent {
    fn description(&self) -> &str {
        match self {
            ConversionEvent::Started { .. } => "Conversion started",
            ConversionEvent::Progress { .. } => "Conversion in progress",
            ConversionEvent::FileFinished { failure: None, .. } => "File converted",
            ConversionEvent::FileFinished { .. } => "File conversion failed",
            ConversionEvent::Completed { .. } => "Conversion completed",
            ConversionEvent::Cancelled { .. } => "Conversion cancelled",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are no active subscribers. Never blocks.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let scans_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Scan(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
