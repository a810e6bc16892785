//! # User Preferences
//!
//! The last sort mode, the delete-source flag and the two picked roots are
//! remembered between sessions. They are read when the picker opens and
//! written when a batch starts.

use bridge_traits::storage::{DocumentHandle, SettingsStore};
use core_catalog::SortMode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConvertError, Result};

const KEY_SORT_MODE: &str = "converter.sort_mode";
const KEY_DELETE_SOURCE: &str = "converter.delete_source";
const KEY_SOURCE_ROOT: &str = "converter.source_root";
const KEY_DESTINATION_ROOT: &str = "converter.destination_root";

/// Choices passed into a batch and persisted afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub sort_mode: SortMode,
    pub delete_source: bool,
}

impl UserPreferences {
    /// Load preferences, using defaults for anything missing or unreadable.
    pub async fn load(store: &dyn SettingsStore) -> Self {
        let sort_mode = match store.get_string(KEY_SORT_MODE).await {
            Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring stored sort mode");
                SortMode::default()
            }),
            Ok(None) => SortMode::default(),
            Err(e) => {
                warn!(error = %e, "Could not read sort mode");
                SortMode::default()
            }
        };

        let delete_source = match store.get_bool(KEY_DELETE_SOURCE).await {
            Ok(value) => value.unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "Could not read delete-source flag");
                false
            }
        };

        Self {
            sort_mode,
            delete_source,
        }
    }

    pub async fn save(&self, store: &dyn SettingsStore) -> Result<()> {
        store
            .set_string(KEY_SORT_MODE, self.sort_mode.as_str())
            .await?;
        store.set_bool(KEY_DELETE_SOURCE, self.delete_source).await?;
        debug!(sort_mode = %self.sort_mode, delete_source = self.delete_source, "Saved preferences");
        Ok(())
    }
}

/// Source and destination roots the user granted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRoots {
    pub source: Option<DocumentHandle>,
    pub destination: Option<DocumentHandle>,
}

impl PersistedRoots {
    pub async fn load(store: &dyn SettingsStore) -> Result<Self> {
        Ok(Self {
            source: store
                .get_string(KEY_SOURCE_ROOT)
                .await?
                .filter(|s| !s.is_empty())
                .map(DocumentHandle::new),
            destination: store
                .get_string(KEY_DESTINATION_ROOT)
                .await?
                .filter(|s| !s.is_empty())
                .map(DocumentHandle::new),
        })
    }

    pub async fn save_source(store: &dyn SettingsStore, root: &DocumentHandle) -> Result<()> {
        store.set_string(KEY_SOURCE_ROOT, root.as_str()).await?;
        Ok(())
    }

    pub async fn save_destination(store: &dyn SettingsStore, root: &DocumentHandle) -> Result<()> {
        store.set_string(KEY_DESTINATION_ROOT, root.as_str()).await?;
        Ok(())
    }

    /// A batch can only start once both roots are known.
    pub fn can_start(&self) -> bool {
        self.source.is_some() && self.destination.is_some()
    }

    /// Both roots, or the first one that is missing.
    pub fn require(&self) -> Result<(&DocumentHandle, &DocumentHandle)> {
        let source = self
            .source
            .as_ref()
            .ok_or(ConvertError::RootNotSet("source folder"))?;
        let destination = self
            .destination
            .as_ref()
            .ok_or(ConvertError::RootNotSet("destination folder"))?;
        Ok((source, destination))
    }
}
