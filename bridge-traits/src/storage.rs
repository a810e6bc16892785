//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for capability-scoped document trees
//! (the user-granted source and destination folders), local scratch file I/O,
//! and key-value settings storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Dynamic async reader handed out by storage bridges.
pub type DynAsyncRead = dyn tokio::io::AsyncRead + Send + Unpin;

/// Dynamic async writer handed out by storage bridges.
pub type DynAsyncWrite = dyn tokio::io::AsyncWrite + Send + Unpin;

/// Opaque reference to a document or directory inside a user-granted tree.
///
/// The core never interprets the inner value. Android hosts store a document
/// URI here, desktop hosts an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One child returned when enumerating a directory handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    /// Handle used for reading or deleting this child
    pub handle: DocumentHandle,
    /// Display name including extension
    pub name: String,
    /// Identifier that stays stable for the lifetime of the grant
    pub document_id: String,
    /// Last modification time (Unix epoch milliseconds)
    pub last_modified: i64,
    pub is_directory: bool,
}

/// Capability-scoped document tree
///
/// Abstracts user-granted folder access:
/// - Android: Storage Access Framework tree URIs
/// - iOS: security-scoped bookmarks
/// - Desktop: plain directories chosen in a picker
///
/// Handles are only valid for the tree that produced them.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::DocumentTree;
///
/// async fn count_children(tree: &dyn DocumentTree, root: &DocumentHandle) -> Result<usize> {
///     Ok(tree.list_children(root).await?.len())
/// }
/// ```
#[async_trait]
pub trait DocumentTree: Send + Sync {
    /// List direct children of a directory handle, in storage order
    async fn list_children(&self, parent: &DocumentHandle) -> Result<Vec<DocumentEntry>>;

    /// Open a document for streaming reads
    async fn open_read(&self, handle: &DocumentHandle) -> Result<Box<DynAsyncRead>>;

    /// Create a new document under `parent` and return its handle
    ///
    /// The host may adjust `display_name` to avoid collisions.
    async fn create_document(
        &self,
        parent: &DocumentHandle,
        mime_type: &str,
        display_name: &str,
    ) -> Result<DocumentHandle>;

    /// Open a document for streaming writes, truncating existing content
    async fn open_write(&self, handle: &DocumentHandle) -> Result<Box<DynAsyncWrite>>;

    /// Delete a document
    async fn delete(&self, handle: &DocumentHandle) -> Result<()>;

    /// Best-effort human readable location for a handle
    ///
    /// Never required for correctness.
    fn path_hint(&self, handle: &DocumentHandle) -> Option<String> {
        let _ = handle;
        None
    }
}

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// Local file system access trait
///
/// Used for the scratch area where staged inputs and decoder outputs live.
/// The decoder needs concrete paths, so everything here is path based.
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's cache directory
    ///
    /// This directory is suitable for temporary files that can be deleted
    /// by the system when storage is low.
    async fn get_cache_directory(&self) -> Result<PathBuf>;

    /// Get the application's data directory
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Delete a directory and all its contents
    async fn delete_dir_all(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Open a file for streaming reads
    async fn open_read_stream(&self, path: &Path) -> Result<Box<DynAsyncRead>>;

    /// Open a file for streaming writes
    async fn open_write_stream(&self, path: &Path) -> Result<Box<DynAsyncWrite>>;
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences/settings storage:
/// - Android: SharedPreferences / DataStore
/// - iOS: UserDefaults
/// - Desktop: a settings file in the data directory
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("sort_mode", "by_date").await?;
///     store.set_bool("delete_source", true).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store a boolean value
    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    /// Retrieve a boolean value
    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;
}
