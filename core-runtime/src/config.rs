//! # Converter Configuration Module
//!
//! Provides configuration management for the NCM converter core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `ConverterConfig` holding every bridge and tunable the pipeline needs. It
//! enforces fail-fast validation so a missing capability is reported when the
//! host wires the core up, not halfway through a batch.
//!
//! ## Required Dependencies
//!
//! - `NcmDecoder` - Metadata and decode engine (no platform default)
//! - Scratch directory - Local working area for staged files
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `FileSystemAccess` - Scratch I/O (desktop default: tokio fs)
//! - `SettingsStore` - Persisted preferences (desktop default: JSON file)
//! - `HttpClient` - Cover art downloads (desktop default: reqwest)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults are
//! injected automatically if not provided. Without it, a missing file system
//! or settings store is a `CapabilityMissing` error, while a missing HTTP
//! client simply disables cover downloads.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ConverterConfig;
//! use std::sync::Arc;
//!
//! let config = ConverterConfig::builder()
//!     .scratch_dir("/data/user/0/app/cache/ncm")
//!     .decoder(Arc::new(MyDecoder))
//!     .file_system(Arc::new(MyFileSystem))
//!     .settings_store(Arc::new(MySettings))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{FileSystemAccess, HttpClient, NcmDecoder, SettingsStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Extension of convertible input files. Matching is case-sensitive.
pub const DEFAULT_SOURCE_EXTENSION: &str = ".ncm";

/// Output extensions the decoder may produce.
pub const DEFAULT_OUTPUT_EXTENSIONS: &[&str] = &["mp3", "flac"];

/// Upper bound for a single cover art download.
pub const DEFAULT_COVER_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_COVER_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration for the converter core.
///
/// Use [`ConverterConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ConverterConfig {
    /// Directory staged inputs and decoder outputs are written to
    pub scratch_dir: PathBuf,

    /// File name suffix selecting convertible inputs
    pub source_extension: String,

    /// Extensions accepted when locating decoder output (lowercase, no dot)
    pub output_extensions: Vec<String>,

    /// Timeout for one cover art request
    pub cover_fetch_timeout: Duration,


    /// Broadcast buffer for the event bus
    pub event_buffer_size: usize,

    /// Decoder engine (required)
    pub decoder: Arc<dyn NcmDecoder>,

    /// Scratch file I/O
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Preference persistence
    pub settings_store: Arc<dyn SettingsStore>,

    /// HTTP client for cover art; `None` disables cover downloads
    pub http_client: Option<Arc<dyn HttpClient>>,
}

impl std::fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("scratch_dir", &self.scratch_dir)
            .field("source_extension", &self.source_extension)
            .field("output_extensions", &self.output_extensions)
            .field("cover_fetch_timeout", &self.cover_fetch_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("decoder", &"NcmDecoder { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Creates a new builder for constructing a `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Scratch directory is not empty
    /// - Source extension starts with a dot
    /// - At least one output extension is accepted
    /// - Cover timeout is within (0, 120s]
    /// - Event buffer size is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.scratch_dir.as_os_str().is_empty() {
            return Err(Error::Config("Scratch directory cannot be empty".to_string()));
        }

        if self.source_extension.len() < 2 || !self.source_extension.starts_with('.') {
            return Err(Error::Config(format!(
                "Source extension must look like '.ncm', got '{}'",
                self.source_extension
            )));
        }

        if self.output_extensions.is_empty() {
            return Err(Error::Config(
                "At least one output extension must be accepted".to_string(),
            ));
        }

        if self
            .output_extensions
            .iter()
            .any(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(Error::Config(
                "Output extensions are bare names such as 'mp3'".to_string(),
            ));
        }

        if self.cover_fetch_timeout.is_zero() {
            return Err(Error::Config(
                "Cover fetch timeout must be greater than zero".to_string(),
            ));
        }

        if self.cover_fetch_timeout > MAX_COVER_FETCH_TIMEOUT {
            return Err(Error::Config(
                "Cover fetch timeout exceeds maximum of 120 seconds".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn decoder_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "NcmDecoder".to_string(),
        message: "A decoder engine is required to read metadata and unlock files. \
                 There is no built-in default: inject the host's decoder implementation."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for the scratch area. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioFileSystem. \
                 Mobile: inject a platform file system adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Option<Arc<dyn HttpClient>> {
    None
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Option<Arc<dyn HttpClient>> {
    Some(Arc::new(bridge_desktop::ReqwestHttpClient::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for user preferences. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default JsonSettingsStore. \
                 Mobile: inject platform-native settings (SharedPreferences/UserDefaults)."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(path: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::JsonSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let init_store = |path: PathBuf| -> Result<JsonSettingsStore> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

        runtime.block_on(JsonSettingsStore::open(path)).map_err(|e| {
            Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
        })
    };

    // block_on panics inside a runtime, so hop to a plain thread when needed
    let store = match Handle::try_current() {
        Ok(_) => {
            let path = path.to_path_buf();
            thread::spawn(move || init_store(path))
                .join()
                .map_err(|_| {
                    Error::Internal(
                        "Worker thread panicked while creating default SettingsStore".to_string(),
                    )
                })??
        }
        Err(_) => init_store(path.to_path_buf())?,
    };

    Ok(Arc::new(store))
}

/// Settings live next to the scratch directory, never inside it, because the
/// scratch directory is swept after every batch.
fn default_settings_path(scratch_dir: &Path) -> Result<PathBuf> {
    scratch_dir
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| parent.join("ncm-converter-settings.json"))
        .ok_or_else(|| {
            Error::Config(
                "Scratch directory has no parent; set .settings_path() explicitly".to_string(),
            )
        })
}

/// Builder for [`ConverterConfig`].
#[derive(Default)]
pub struct ConverterConfigBuilder {
    scratch_dir: Option<PathBuf>,
    settings_path: Option<PathBuf>,
    source_extension: Option<String>,
    output_extensions: Option<Vec<String>>,
    cover_fetch_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    decoder: Option<Arc<dyn NcmDecoder>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    http_client: Option<Arc<dyn HttpClient>>,
    disable_cover_download: bool,
}

impl ConverterConfigBuilder {
    /// Sets the scratch directory (required).
    pub fn scratch_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.scratch_dir = Some(path.into());
        self
    }

    /// Sets where the default desktop settings store keeps its file.
    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn source_extension(mut self, extension: impl Into<String>) -> Self {
        self.source_extension = Some(extension.into());
        self
    }

    pub fn output_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.into().to_lowercase())
                .collect(),
        );
        self
    }

    pub fn cover_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.cover_fetch_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the decoder engine (required).
    pub fn decoder(mut self, decoder: Arc<dyn NcmDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Never download cover art, even when a desktop default is available.
    pub fn disable_cover_download(mut self) -> Self {
        self.disable_cover_download = true;
        self
    }

    /// Builds the configuration, injecting platform defaults where allowed.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the scratch directory is missing or a value
    ///   is out of range
    /// - [`Error::CapabilityMissing`] when a required bridge is absent
    pub fn build(self) -> Result<ConverterConfig> {
        let scratch_dir = self.scratch_dir.ok_or_else(|| {
            Error::Config(
                "Scratch directory is required. Use .scratch_dir() to set it.".to_string(),
            )
        })?;

        let decoder = self.decoder.ok_or_else(decoder_missing_error)?;

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => {
                let path = match self.settings_path {
                    Some(path) => path,
                    None => default_settings_path(&scratch_dir)?,
                };
                provide_default_settings_store(&path)?
            }
        };

        let http_client = if self.disable_cover_download {
            None
        } else {
            self.http_client.or_else(provide_default_http_client)
        };

        let config = ConverterConfig {
            scratch_dir,
            source_extension: self
                .source_extension
                .unwrap_or_else(|| DEFAULT_SOURCE_EXTENSION.to_string()),
            output_extensions: self.output_extensions.unwrap_or_else(|| {
                DEFAULT_OUTPUT_EXTENSIONS
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect()
            }),
            cover_fetch_timeout: self
                .cover_fetch_timeout
                .unwrap_or(DEFAULT_COVER_FETCH_TIMEOUT),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            decoder,
            file_system,
            settings_store,
            http_client,
        };

        config.validate()?;

        Ok(config)
    }
}
