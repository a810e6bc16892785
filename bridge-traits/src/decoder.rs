//! Decoder Engine Abstraction
//!
//! The decoder turns a staged `.ncm` container into a playable `mp3`/`flac`
//! file. Its container parsing and key derivation live outside the core; the
//! core only sees the two path-based contracts below.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;

use crate::error::Result;

/// Status code the decoder returns for a successful decode.
pub const DECODE_SUCCESS: i32 = 1;

/// Everything the decoder needs to produce one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    /// Staged input container
    pub input_path: PathBuf,
    /// Working directory the output is written into
    pub output_dir: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Cover art to embed, if any was fetched
    pub cover: Option<Bytes>,
}

/// Decoder engine trait
///
/// Implementations are assumed to be single-instance and possibly stateful;
/// callers never invoke them concurrently.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::decoder::{DecodeRequest, NcmDecoder, DECODE_SUCCESS};
///
/// async fn unlock(decoder: &dyn NcmDecoder, request: DecodeRequest) -> Result<bool> {
///     Ok(decoder.decode(request).await? == DECODE_SUCCESS)
/// }
/// ```
#[async_trait]
pub trait NcmDecoder: Send + Sync {
    /// Read the embedded metadata block as JSON text
    ///
    /// Returns `"{}"` (or any text of two characters or fewer) when the
    /// container carries no usable metadata.
    async fn get_metadata(&self, input_path: &std::path::Path) -> Result<String>;

    /// Decode the container into `request.output_dir`
    ///
    /// Returns [`DECODE_SUCCESS`] on success; any other value is a failure.
    /// On success exactly one file named after the input's base name with an
    /// `mp3` or `flac` extension appears in the output directory.
    async fn decode(&self, request: DecodeRequest) -> Result<i32>;
}
