//! Cover Art Download
//!
//! Fetches the remote cover referenced by `albumPic` so it can be embedded
//! by the decoder. A download is one bounded attempt: no retries, and any
//! failure simply means the output has no embedded cover.

use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{MetadataError, Result};

/// Outcome of a cover download attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverArt {
    /// Image bytes to embed
    Fetched(Bytes),
    /// The metadata named no cover
    NotRequested,
    /// A cover was named but could not be downloaded
    Unavailable,
}

impl CoverArt {
    pub fn bytes(&self) -> Option<Bytes> {
        match self {
            CoverArt::Fetched(bytes) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// True when a named cover could not be embedded.
    pub fn is_missing(&self) -> bool {
        matches!(self, CoverArt::Unavailable)
    }
}

/// Best-effort cover downloader.
pub struct CoverArtFetcher {
    http_client: Option<Arc<dyn HttpClient>>,
    timeout: Duration,
}

impl CoverArtFetcher {
    pub fn new(http_client: Option<Arc<dyn HttpClient>>, timeout: Duration) -> Self {
        Self {
            http_client,
            timeout,
        }
    }

    /// Fetch the cover at `url`, tolerating every failure.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: Option<&str>) -> CoverArt {
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            return CoverArt::NotRequested;
        };

        match self.try_fetch(url).await {
            Ok(bytes) => {
                debug!(size = bytes.len(), "Fetched cover art");
                CoverArt::Fetched(bytes)
            }
            Err(e) => {
                warn!(error = %e, "Cover art unavailable, continuing without it");
                CoverArt::Unavailable
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<Bytes> {
        let client = self.http_client.as_ref().ok_or_else(|| {
            MetadataError::CoverFetchFailed("cover downloads are disabled".to_string())
        })?;

        let request = HttpRequest::get(url).timeout(self.timeout);
        let response = tokio::time::timeout(self.timeout, client.execute(request))
            .await
            .map_err(|_| {
                MetadataError::CoverFetchFailed(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })??;

        if !response.is_success() {
            return Err(MetadataError::CoverFetchFailed(format!(
                "HTTP {}",
                response.status
            )));
        }

        if response.body.is_empty() {
            return Err(MetadataError::CoverFetchFailed("empty body".to_string()));
        }

        Ok(response.body)
    }
}
