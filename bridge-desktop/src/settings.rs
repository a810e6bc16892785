//! Settings Storage using a JSON file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// JSON-file-backed settings store implementation
///
/// The whole document is kept in memory and rewritten on every mutation.
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash never leaves a half-written settings file behind. The in-memory
/// copy only changes once the file has been written.
pub struct JsonSettingsStore {
    path: Option<PathBuf>,
    values: Mutex<Map<String, Value>>,
}

impl JsonSettingsStore {
    /// Open (or create) a settings store at the given path
    pub async fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let values = match tokio::fs::read(&path).await {
            Ok(raw) => match serde_json::from_slice::<Map<String, Value>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    error!(path = ?path, error = %e, "Settings file is corrupt, starting empty");
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = ?path, keys = values.len(), "Initialized settings store");

        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// Create an in-memory settings store (for testing)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Map::new()),
        }
    }

    async fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let raw = serde_json::to_vec_pretty(values).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode settings: {}", e))
        })?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await.map_err(BridgeError::Io)?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(BridgeError::Io)?;
        Ok(())
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().await;
        let mut updated = values.clone();
        updated.insert(key.to_string(), value);
        self.persist(&updated).await?;
        *values = updated;
        debug!(key = key, "Stored setting");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, Value::String(value.to_string())).await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().await;
        match values.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(BridgeError::OperationFailed(format!(
                "Type mismatch for {}: expected string, got {}",
                key, other
            ))),
        }
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, Value::Bool(value)).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let values = self.values.lock().await;
        match values.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(BridgeError::OperationFailed(format!(
                "Type mismatch for {}: expected bool, got {}",
                key, other
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().await;
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut updated = values.clone();
        updated.remove(key);
        self.persist(&updated).await?;
        *values = updated;
        debug!(key = key, "Deleted setting");
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let values = self.values.lock().await;
        let mut keys: Vec<String> = values.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
