//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the converter core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other core crates depend
//! on. It establishes the logging conventions, the fail-fast configuration
//! builder and the broadcast channel scans and batches report through.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use error::{Error, Result};
pub use events::{ConversionEvent, CoreEvent, EventBus, EventStream, ScanEvent};
