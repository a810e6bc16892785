//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{DynAsyncRead, DynAsyncWrite, FileMetadata, FileSystemAccess},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const APP_DIR_NAME: &str = "ncm-converter";

/// Tokio-based file system implementation
///
/// Backs the scratch area used for staging inputs and collecting decoder
/// outputs. Directories default to the platform cache/data locations.
pub struct TokioFileSystem {
    cache_dir: PathBuf,
    data_dir: PathBuf,
}

impl TokioFileSystem {
    /// Create a new file system accessor with default directories
    pub fn new() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR_NAME);

        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIR_NAME);

        Self {
            cache_dir,
            data_dir,
        }
    }

    /// Create a new file system accessor with custom directories
    pub fn with_directories(cache_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data_dir,
        }
    }

    fn map_io_error(e: std::io::Error) -> BridgeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            BridgeError::NotFound(e.to_string())
        } else {
            BridgeError::Io(e)
        }
    }

    async fn ensure_dir(path: &Path) -> Result<()> {
        if !fs::try_exists(path).await.map_err(Self::map_io_error)? {
            fs::create_dir_all(path)
                .await
                .map_err(Self::map_io_error)?;
            debug!(path = ?path, "Created directory");
        }
        Ok(())
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn get_cache_directory(&self) -> Result<PathBuf> {
        Self::ensure_dir(&self.cache_dir).await?;
        Ok(self.cache_dir.clone())
    }

    async fn get_data_directory(&self) -> Result<PathBuf> {
        Self::ensure_dir(&self.data_dir).await?;
        Ok(self.data_dir.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(path).await.map_err(Self::map_io_error)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error)?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn delete_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?path, "Deleted directory");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await.map_err(Self::map_io_error)?;

        while let Some(entry) = read_dir.next_entry().await.map_err(Self::map_io_error)? {
            entries.push(entry.path());
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    async fn open_read_stream(&self, path: &Path) -> Result<Box<DynAsyncRead>> {
        let file = fs::File::open(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Opened file for reading");
        Ok(Box::new(file))
    }

    async fn open_write_stream(&self, path: &Path) -> Result<Box<DynAsyncWrite>> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir(parent).await?;
        }

        let file = fs::File::create(path).await.map_err(Self::map_io_error)?;
        debug!(path = ?path, "Opened file for writing");
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn scratch_fs(root: &Path) -> TokioFileSystem {
        TokioFileSystem::with_directories(root.join("cache"), root.join("data"))
    }

    #[tokio::test]
    async fn test_custom_directories_are_created_on_demand() {
        let temp = tempfile::tempdir().unwrap();
        let fs = scratch_fs(temp.path());

        let cache_dir = fs.get_cache_directory().await.unwrap();
        assert_eq!(cache_dir, temp.path().join("cache"));
        assert!(fs.exists(&cache_dir).await.unwrap());
    }

    #[tokio::test]
    async fn test_stream_write_then_read() {
        let temp = tempfile::tempdir().unwrap();
        let fs = scratch_fs(temp.path());
        let file = temp.path().join("cache").join("nested").join("song.ncm");

        let mut writer = fs.open_write_stream(&file).await.unwrap();
        writer.write_all(b"CTENFDAM").await.unwrap();
        writer.shutdown().await.unwrap();
        drop(writer);

        let mut reader = fs.open_read_stream(&file).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"CTENFDAM");

        let meta = fs.metadata(&file).await.unwrap();
        assert_eq!(meta.size, 8);
        assert!(!meta.is_directory);
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let fs = scratch_fs(temp.path());

        let err = fs
            .delete_file(&temp.path().join("absent.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_and_delete_directory() {
        let temp = tempfile::tempdir().unwrap();
        let fs = scratch_fs(temp.path());
        let dir = fs.get_cache_directory().await.unwrap();
        tokio::fs::write(dir.join("a.ncm"), b"a").await.unwrap();
        tokio::fs::write(dir.join("a.mp3"), b"b").await.unwrap();

        assert_eq!(fs.list_directory(&dir).await.unwrap().len(), 2);

        fs.delete_dir_all(&dir).await.unwrap();
        assert!(!fs.exists(&dir).await.unwrap());
    }
}
