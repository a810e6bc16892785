//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the conversion core and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that differs per platform (desktop, Android, iOS).
//!
//! ## Traits
//!
//! ### Storage
//! - [`DocumentTree`](storage::DocumentTree) - User-granted source/destination folders
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local scratch file I/O
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Decoding & Networking
//! - [`NcmDecoder`](decoder::NcmDecoder) - Metadata read and container decode engine
//! - [`HttpClient`](http::HttpClient) - Single-attempt HTTP for cover art downloads
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Android  | TBD                 | 📋 Planned |
//!
//! The decoder engine has no desktop default; every host injects its own.
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! let decoder = builder.decoder
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "NcmDecoder".to_string(),
//!         message: "No decoder engine provided. Inject a host implementation.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and include context such as the offending path or handle.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so they can be shared across
//! the background tasks the pipeline runs on.

pub mod decoder;
pub mod error;
pub mod http;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use decoder::{DecodeRequest, NcmDecoder, DECODE_SUCCESS};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use storage::{
    DocumentEntry, DocumentHandle, DocumentTree, DynAsyncRead, DynAsyncWrite, FileMetadata,
    FileSystemAccess, SettingsStore,
};
