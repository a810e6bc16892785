//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (decoder, document
//! tree, scratch file system, settings, HTTP) into the conversion core.
//! Desktop apps typically enable the `desktop-shims` feature (which depends
//! on `bridge-desktop`) and call [`bootstrap_desktop`]; mobile hosts build a
//! [`CoreDependencies`] from their own adapters.

pub mod error;

pub use error::{CoreError, Result};

pub use core_catalog::{Catalog, CatalogEntry, SortMode};
pub use core_convert::{
    BatchHandle, BatchProgress, BatchReport, Notice, PersistedRoots, ScanHandle, UserPreferences,
};
pub use core_runtime::events::{CoreEvent, EventStream};

use std::path::PathBuf;
use std::sync::Arc;

use bridge_traits::{
    decoder::NcmDecoder,
    http::HttpClient,
    storage::{DocumentHandle, DocumentTree, FileSystemAccess, SettingsStore},
};
use core_convert::ConversionCoordinator;
use core_runtime::config::ConverterConfig;
use core_runtime::events::EventBus;
use tracing::info;

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub decoder: Arc<dyn NcmDecoder>,
    pub document_tree: Arc<dyn DocumentTree>,
    pub filesystem: Option<Arc<dyn FileSystemAccess>>,
    pub settings_store: Option<Arc<dyn SettingsStore>>,
    pub http_client: Option<Arc<dyn HttpClient>>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from the two bridges that have no
    /// platform default.
    pub fn new(decoder: Arc<dyn NcmDecoder>, document_tree: Arc<dyn DocumentTree>) -> Self {
        Self {
            decoder,
            document_tree,
            filesystem: None,
            settings_store: None,
            http_client: None,
        }
    }

    pub fn with_filesystem(mut self, filesystem: Arc<dyn FileSystemAccess>) -> Self {
        self.filesystem = Some(filesystem);
        self
    }

    pub fn with_settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    coordinator: ConversionCoordinator,
    event_bus: EventBus,
}

impl CoreService {
    /// Create a new service from the provided dependencies.
    ///
    /// Missing optional bridges fall back to desktop defaults when the
    /// `desktop-shims` feature is enabled.
    pub fn new(deps: CoreDependencies, scratch_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut builder = ConverterConfig::builder()
            .scratch_dir(scratch_dir)
            .decoder(deps.decoder);
        if let Some(fs) = deps.filesystem {
            builder = builder.file_system(fs);
        }
        if let Some(store) = deps.settings_store {
            builder = builder.settings_store(store);
        }
        if let Some(client) = deps.http_client {
            builder = builder.http_client(client);
        }

        Self::with_config(builder.build()?, deps.document_tree)
    }

    /// Create a service from a fully built configuration.
    pub fn with_config(
        config: ConverterConfig,
        document_tree: Arc<dyn DocumentTree>,
    ) -> Result<Self> {
        config.validate()?;
        let event_bus = EventBus::new(config.event_buffer_size);
        let coordinator = ConversionCoordinator::new(&config, document_tree, event_bus.clone());

        info!(scratch_dir = ?config.scratch_dir, "Converter core initialized");
        Ok(Self {
            coordinator,
            event_bus,
        })
    }

    /// Subscribe to scan and conversion events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn coordinator(&self) -> &ConversionCoordinator {
        &self.coordinator
    }

    /// Preferences to pre-fill the picker with.
    pub async fn preferences(&self) -> UserPreferences {
        self.coordinator.preferences().await
    }

    pub async fn roots(&self) -> Result<PersistedRoots> {
        Ok(self.coordinator.roots().await?)
    }

    pub async fn set_source_root(&self, root: &DocumentHandle) -> Result<()> {
        Ok(self.coordinator.set_source_root(root).await?)
    }

    pub async fn set_destination_root(&self, root: &DocumentHandle) -> Result<()> {
        Ok(self.coordinator.set_destination_root(root).await?)
    }

    /// Scan the remembered source root.
    pub async fn scan(&self, sort_mode: SortMode) -> Result<ScanHandle> {
        let roots = self.coordinator.roots().await?;
        let source = roots
            .source
            .ok_or(core_convert::ConvertError::RootNotSet("source folder"))?;
        Ok(self.coordinator.start_scan(source, sort_mode)?)
    }

    /// Convert the selected catalog entries into the remembered destination.
    ///
    /// Both roots must be set. `preferences` are persisted as the batch
    /// starts.
    pub async fn convert(
        &self,
        catalog: &Catalog,
        preferences: UserPreferences,
    ) -> Result<BatchHandle> {
        let roots = self.coordinator.roots().await?;
        let (_, destination) = roots.require()?;
        Ok(self
            .coordinator
            .start_batch(catalog.selected(), destination.clone(), preferences)
            .await?)
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Uses plain directories as document trees and the desktop bridges for
/// everything except the decoder.
///
/// ```ignore
/// use core_service::{bootstrap_desktop, SortMode};
///
/// let core = bootstrap_desktop(Arc::new(MyDecoder), cache_dir.join("ncm"))?;
/// core.set_source_root(&LocalDocumentTree::handle_for("/music/ncm")).await?;
/// let catalog = core.scan(SortMode::ByTitle).await?.join().await?;
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    decoder: Arc<dyn NcmDecoder>,
    scratch_dir: impl Into<PathBuf>,
) -> Result<CoreService> {
    let tree = Arc::new(bridge_desktop::LocalDocumentTree::new());
    CoreService::new(CoreDependencies::new(decoder, tree), scratch_dir)
}
