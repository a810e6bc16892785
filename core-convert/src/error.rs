use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Scan aborted: {0}")]
    ScanAborted(String),

    #[error("Failed to stage {file}: {reason}")]
    StageFailed { file: String, reason: String },

    #[error("No usable metadata in {file}: {reason}")]
    MetadataEmpty { file: String, reason: String },

    #[error("Decoding {file} failed: {reason}")]
    DecodeFailed { file: String, reason: String },

    #[error("Decoder produced no output for {file}")]
    OutputNotFound { file: String },

    #[error("Failed to export {file}: {reason}")]
    ExportFailed { file: String, reason: String },

    #[error("Failed to delete source {file}: {reason}")]
    SourceDeleteFailed { file: String, reason: String },

    #[error("A scan or conversion is already running")]
    PipelineBusy,

    #[error("No active run with id {run_id}")]
    RunNotFound { run_id: String },

    #[error("Missing {0}: pick it before starting a conversion")]
    RootNotSet(&'static str),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl ConvertError {
    /// Per-file failure class, `None` for errors that are not about one file.
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            ConvertError::StageFailed { .. } => Some(FailureClass::StageFailed),
            ConvertError::MetadataEmpty { .. } => Some(FailureClass::MetadataEmpty),
            ConvertError::DecodeFailed { .. } => Some(FailureClass::DecodeFailed),
            ConvertError::OutputNotFound { .. } => Some(FailureClass::OutputNotFound),
            ConvertError::ExportFailed { .. } => Some(FailureClass::ExportFailed),
            _ => None,
        }
    }
}

/// Why a single file in a batch did not convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureClass {
    StageFailed,
    MetadataEmpty,
    DecodeFailed,
    OutputNotFound,
    ExportFailed,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::StageFailed => "StageFailed",
            FailureClass::MetadataEmpty => "MetadataEmpty",
            FailureClass::DecodeFailed => "DecodeFailed",
            FailureClass::OutputNotFound => "OutputNotFound",
            FailureClass::ExportFailed => "ExportFailed",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
