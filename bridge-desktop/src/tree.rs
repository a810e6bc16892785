//! Document tree backed by plain local directories
//!
//! Desktop hosts grant access by letting the user pick a folder, so a handle
//! is simply the absolute path of a file or directory.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{DocumentEntry, DocumentHandle, DocumentTree, DynAsyncRead, DynAsyncWrite},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Upper bound on `name (n).ext` probes before giving up on a collision.
const MAX_NAME_PROBES: u32 = 1000;

/// [`DocumentTree`] over the local file system.
#[derive(Debug, Default, Clone)]
pub struct LocalDocumentTree;

impl LocalDocumentTree {
    pub fn new() -> Self {
        Self
    }

    /// Handle for a local directory or file.
    pub fn handle_for(path: impl AsRef<Path>) -> DocumentHandle {
        DocumentHandle::new(path.as_ref().to_string_lossy().into_owned())
    }

    fn path_of(handle: &DocumentHandle) -> PathBuf {
        PathBuf::from(handle.as_str())
    }

    fn map_io_error(path: &Path, e: std::io::Error) -> BridgeError {
        match e.kind() {
            std::io::ErrorKind::NotFound => {
                BridgeError::NotFound(format!("{}: {}", path.display(), e))
            }
            std::io::ErrorKind::PermissionDenied => {
                BridgeError::PermissionDenied(format!("{}: {}", path.display(), e))
            }
            _ => BridgeError::Io(e),
        }
    }

    /// `song.mp3` -> `song (1).mp3`, `song (2).mp3`, ...
    fn candidate_name(display_name: &str, attempt: u32) -> String {
        if attempt == 0 {
            return display_name.to_string();
        }
        match display_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, attempt, ext),
            _ => format!("{} ({})", display_name, attempt),
        }
    }
}

#[async_trait]
impl DocumentTree for LocalDocumentTree {
    async fn list_children(&self, parent: &DocumentHandle) -> Result<Vec<DocumentEntry>> {
        let dir = Self::path_of(parent);
        let mut read_dir = fs::read_dir(&dir)
            .await
            .map_err(|e| Self::map_io_error(&dir, e))?;

        let mut children = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| Self::map_io_error(&dir, e))?
        {
            let path = entry.path();
            // Follows symlinks; an unreadable child is left out of the listing
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let last_modified = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or_default();

            children.push(DocumentEntry {
                handle: Self::handle_for(&path),
                name: entry.file_name().to_string_lossy().into_owned(),
                document_id: path.to_string_lossy().into_owned(),
                last_modified,
                is_directory: metadata.is_dir(),
            });
        }

        debug!(path = ?dir, count = children.len(), "Listed document tree");
        Ok(children)
    }

    async fn open_read(&self, handle: &DocumentHandle) -> Result<Box<DynAsyncRead>> {
        let path = Self::path_of(handle);
        let file = fs::File::open(&path)
            .await
            .map_err(|e| Self::map_io_error(&path, e))?;
        Ok(Box::new(file))
    }

    async fn create_document(
        &self,
        parent: &DocumentHandle,
        mime_type: &str,
        display_name: &str,
    ) -> Result<DocumentHandle> {
        let dir = Self::path_of(parent);

        for attempt in 0..MAX_NAME_PROBES {
            let path = dir.join(Self::candidate_name(display_name, attempt));
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(_) => {
                    debug!(path = ?path, mime_type, "Created document");
                    return Ok(Self::handle_for(&path));
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Self::map_io_error(&path, e)),
            }
        }

        Err(BridgeError::OperationFailed(format!(
            "No free name for {} in {}",
            display_name,
            dir.display()
        )))
    }

    async fn open_write(&self, handle: &DocumentHandle) -> Result<Box<DynAsyncWrite>> {
        let path = Self::path_of(handle);
        let file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .await
            .map_err(|e| Self::map_io_error(&path, e))?;
        Ok(Box::new(file))
    }

    async fn delete(&self, handle: &DocumentHandle) -> Result<()> {
        let path = Self::path_of(handle);
        fs::remove_file(&path)
            .await
            .map_err(|e| Self::map_io_error(&path, e))?;
        debug!(path = ?path, "Deleted document");
        Ok(())
    }

    fn path_hint(&self, handle: &DocumentHandle) -> Option<String> {
        Some(Self::path_of(handle).display().to_string())
    }
}
