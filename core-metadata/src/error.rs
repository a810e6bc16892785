use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    /// The decoder returned nothing usable (two characters or fewer, or text
    /// that is not a JSON object).
    #[error("No usable metadata in {file}: {reason}")]
    MetadataEmpty { file: String, reason: String },

    #[error("Cover art fetch failed: {0}")]
    CoverFetchFailed(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
