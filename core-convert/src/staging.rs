//! # Staging Cache
//!
//! The decoder only understands local paths, so every document is copied
//! into the scratch directory before it is read. Decoder outputs land in the
//! same directory and are streamed from there into the destination tree.
//!
//! The scratch directory is owned by one pipeline at a time. Callers remove
//! what they staged through [`StagingCache::cleanup_entry`]; [`StagingCache::sweep`]
//! empties the whole directory after a run.

use bridge_traits::storage::{DocumentHandle, DocumentTree, DynAsyncRead, FileSystemAccess};
use core_runtime::logging::strip_path;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::error::{ConvertError, Result};

pub struct StagingCache {
    file_system: Arc<dyn FileSystemAccess>,
    scratch_dir: PathBuf,
}

impl StagingCache {
    pub fn new(file_system: Arc<dyn FileSystemAccess>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            file_system,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Scratch path a document named `local_name` is staged to.
    pub fn scratch_path(&self, local_name: &str) -> PathBuf {
        self.scratch_dir.join(local_name)
    }

    /// Copy a document into the scratch directory.
    ///
    /// Returns the path of a byte-identical local copy. The caller owns the
    /// copy and must remove it. A partially written copy is removed before
    /// the error is returned.
    #[instrument(skip(self, tree, handle), fields(file = %strip_path(local_name)))]
    pub async fn stage(
        &self,
        tree: &dyn DocumentTree,
        handle: &DocumentHandle,
        local_name: &str,
    ) -> Result<PathBuf> {
        let stage_failed = |reason: String| ConvertError::StageFailed {
            file: local_name.to_string(),
            reason,
        };

        if local_name.is_empty() || local_name.contains(['/', '\\']) || local_name == ".." {
            return Err(stage_failed("not a plain file name".to_string()));
        }

        self.file_system
            .create_dir_all(&self.scratch_dir)
            .await
            .map_err(|e| stage_failed(format!("scratch directory unavailable: {}", e)))?;

        let mut reader = tree
            .open_read(handle)
            .await
            .map_err(|e| stage_failed(format!("cannot open source: {}", e)))?;

        let path = self.scratch_path(local_name);
        let mut writer = self
            .file_system
            .open_write_stream(&path)
            .await
            .map_err(|e| stage_failed(format!("cannot create scratch file: {}", e)))?;

        let copied = match tokio::io::copy(&mut reader, &mut writer).await {
            Ok(copied) => copied,
            Err(e) => {
                drop(writer);
                self.remove(&path).await;
                return Err(stage_failed(format!("copy interrupted: {}", e)));
            }
        };

        if let Err(e) = writer.shutdown().await {
            drop(writer);
            self.remove(&path).await;
            return Err(stage_failed(format!("cannot flush scratch file: {}", e)));
        }

        debug!(bytes = copied, "Staged document");
        Ok(path)
    }

    /// Open a scratch file for reading.
    pub async fn open(&self, path: &Path) -> Result<Box<DynAsyncRead>> {
        Ok(self.file_system.open_read_stream(path).await?)
    }

    /// Find the decoder output for `base_name`.
    ///
    /// Matches a file whose name without extension equals `base_name` and
    /// whose extension, compared case-insensitively, is one of `extensions`.
    pub async fn locate_output(
        &self,
        base_name: &str,
        extensions: &[String],
    ) -> Result<Option<PathBuf>> {
        let candidates = self.file_system.list_directory(&self.scratch_dir).await?;

        Ok(candidates.into_iter().find(|path| {
            let stem_matches = path
                .file_stem()
                .map(|stem| stem.to_string_lossy() == base_name)
                .unwrap_or(false);
            let extension_matches = path
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    extensions.iter().any(|accepted| *accepted == ext)
                })
                .unwrap_or(false);
            stem_matches && extension_matches
        }))
    }

    /// Remove everything one file left behind: the staged copy and any
    /// scratch file sharing its base name.
    pub async fn cleanup_entry(&self, staged: &Path, base_name: &str) {
        self.remove(staged).await;

        let candidates = match self.file_system.list_directory(&self.scratch_dir).await {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!(error = %e, "Scratch directory not listable during cleanup");
                return;
            }
        };

        for path in candidates {
            let same_base = path
                .file_stem()
                .map(|stem| stem.to_string_lossy() == base_name)
                .unwrap_or(false);
            if same_base {
                self.remove(&path).await;
            }
        }
    }

    /// Best-effort removal of a single scratch file.
    pub async fn remove(&self, path: &Path) {
        match self.file_system.exists(path).await {
            Ok(false) => {}
            Ok(true) | Err(_) => {
                if let Err(e) = self.file_system.delete_file(path).await {
                    warn!(
                        file = %strip_path(&path.to_string_lossy()),
                        error = %e,
                        "Failed to remove scratch file"
                    );
                }
            }
        }
    }

    /// Empty the scratch directory. Returns the number of removed items.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<usize> {
        if !self.file_system.exists(&self.scratch_dir).await? {
            return Ok(0);
        }

        let mut removed = 0;
        for path in self.file_system.list_directory(&self.scratch_dir).await? {
            let is_directory = self
                .file_system
                .metadata(&path)
                .await
                .map(|m| m.is_directory)
                .unwrap_or(false);

            let result = if is_directory {
                self.file_system.delete_dir_all(&path).await
            } else {
                self.file_system.delete_file(&path).await
            };

            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!(
                    file = %strip_path(&path.to_string_lossy()),
                    error = %e,
                    "Failed to sweep scratch entry"
                ),
            }
        }

        debug!(removed, "Swept scratch directory");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::{LocalDocumentTree, TokioFileSystem};
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::storage::{DocumentEntry, DynAsyncWrite};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        source: PathBuf,
        scratch: PathBuf,
        cache: StagingCache,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let scratch = dir.path().join("scratch");
        std::fs::create_dir_all(&source).unwrap();

        let fs = Arc::new(TokioFileSystem::with_directories(
            dir.path().join("cache"),
            dir.path().join("data"),
        ));
        let cache = StagingCache::new(fs, &scratch);
        Fixture {
            _dir: dir,
            source,
            scratch,
            cache,
        }
    }

    #[tokio::test]
    async fn test_stage_copies_bytes() {
        let f = fixture();
        let original = f.source.join("song.ncm");
        std::fs::write(&original, b"CTENFDAM-payload").unwrap();

        let staged = f
            .cache
            .stage(
                &LocalDocumentTree::new(),
                &LocalDocumentTree::handle_for(&original),
                "song.ncm",
            )
            .await
            .unwrap();

        assert_eq!(staged, f.scratch.join("song.ncm"));
        assert_eq!(std::fs::read(&staged).unwrap(), b"CTENFDAM-payload");
    }

    #[tokio::test]
    async fn test_stage_missing_source_is_stage_failed() {
        let f = fixture();
        let err = f
            .cache
            .stage(
                &LocalDocumentTree::new(),
                &LocalDocumentTree::handle_for(f.source.join("gone.ncm")),
                "gone.ncm",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ConvertError::StageFailed { ref file, .. } if file == "gone.ncm"));
        assert!(!f.scratch.join("gone.ncm").exists());
    }

    #[tokio::test]
    async fn test_stage_rejects_path_like_names() {
        let f = fixture();
        let original = f.source.join("song.ncm");
        std::fs::write(&original, b"x").unwrap();

        let err = f
            .cache
            .stage(
                &LocalDocumentTree::new(),
                &LocalDocumentTree::handle_for(&original),
                "../escape.ncm",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::StageFailed { .. }));
    }

    struct FailingReadTree;

    struct BrokenReader;

    impl tokio::io::AsyncRead for BrokenReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::other("device removed")))
        }
    }

    #[async_trait]
    impl DocumentTree for FailingReadTree {
        async fn list_children(&self, _parent: &DocumentHandle) -> BridgeResult<Vec<DocumentEntry>> {
            Ok(Vec::new())
        }

        async fn open_read(&self, _handle: &DocumentHandle) -> BridgeResult<Box<DynAsyncRead>> {
            Ok(Box::new(BrokenReader))
        }

        async fn create_document(
            &self,
            _parent: &DocumentHandle,
            _mime_type: &str,
            _display_name: &str,
        ) -> BridgeResult<DocumentHandle> {
            Err(BridgeError::NotAvailable("read only".to_string()))
        }

        async fn open_write(&self, _handle: &DocumentHandle) -> BridgeResult<Box<DynAsyncWrite>> {
            Err(BridgeError::NotAvailable("read only".to_string()))
        }

        async fn delete(&self, _handle: &DocumentHandle) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_interrupted_copy_leaves_nothing_behind() {
        let f = fixture();
        let err = f
            .cache
            .stage(&FailingReadTree, &DocumentHandle::new("x"), "song.ncm")
            .await
            .unwrap_err();

        assert!(matches!(err, ConvertError::StageFailed { .. }));
        assert!(!f.scratch.join("song.ncm").exists());
    }

    #[tokio::test]
    async fn test_locate_output_matches_base_name_and_extension() {
        let f = fixture();
        std::fs::create_dir_all(&f.scratch).unwrap();
        std::fs::write(f.scratch.join("song.ncm"), b"in").unwrap();
        std::fs::write(f.scratch.join("song.txt"), b"noise").unwrap();
        std::fs::write(f.scratch.join("song2.mp3"), b"other").unwrap();
        std::fs::write(f.scratch.join("song.FLAC"), b"out").unwrap();

        let accepted = vec!["mp3".to_string(), "flac".to_string()];
        let found = f.cache.locate_output("song", &accepted).await.unwrap();
        assert_eq!(found, Some(f.scratch.join("song.FLAC")));

        let missing = f.cache.locate_output("absent", &accepted).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_cleanup_entry_removes_staged_and_outputs() {
        let f = fixture();
        std::fs::create_dir_all(&f.scratch).unwrap();
        std::fs::write(f.scratch.join("song.ncm"), b"in").unwrap();
        std::fs::write(f.scratch.join("song.mp3"), b"out").unwrap();
        std::fs::write(f.scratch.join("other.mp3"), b"keep").unwrap();

        f.cache
            .cleanup_entry(&f.scratch.join("song.ncm"), "song")
            .await;

        assert!(!f.scratch.join("song.ncm").exists());
        assert!(!f.scratch.join("song.mp3").exists());
        assert!(f.scratch.join("other.mp3").exists());
    }

    #[tokio::test]
    async fn test_sweep_empties_scratch() {
        let f = fixture();
        std::fs::create_dir_all(f.scratch.join("nested")).unwrap();
        std::fs::write(f.scratch.join("a.mp3"), b"1").unwrap();
        std::fs::write(f.scratch.join("nested").join("b.ncm"), b"2").unwrap();

        assert_eq!(f.cache.sweep().await.unwrap(), 2);
        assert_eq!(std::fs::read_dir(&f.scratch).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_sweep_without_scratch_dir() {
        let f = fixture();
        assert_eq!(f.cache.sweep().await.unwrap(), 0);
    }
}
