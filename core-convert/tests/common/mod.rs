//! Shared fixtures for the pipeline integration tests
//!
//! - `MemoryTree`: document tree held in memory, with failure switches
//! - `MockDecoder`: mockall decoder; `decode_writes` makes it emit an output
//! - `Harness`: tempfile scratch directory plus a wired coordinator

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::{JsonSettingsStore, TokioFileSystem};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::storage::{
    DocumentEntry, DocumentHandle, DocumentTree, DynAsyncRead, DynAsyncWrite,
};
use bridge_traits::{DecodeRequest, NcmDecoder};
use core_catalog::CatalogEntry;
use core_convert::ConversionCoordinator;
use core_runtime::config::ConverterConfig;
use core_runtime::events::EventBus;
use mockall::mock;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tempfile::TempDir;
use tokio::io::AsyncWrite;

// ============================================================================
// In-memory document tree
// ============================================================================

pub const SOURCE_ROOT: &str = "root:source";
pub const DESTINATION_ROOT: &str = "root:destination";

#[derive(Clone)]
struct Document {
    parent: String,
    name: String,
    mime_type: Option<String>,
    content: Arc<Mutex<Vec<u8>>>,
    last_modified: i64,
    is_directory: bool,
}

#[derive(Default)]
struct TreeState {
    documents: Vec<(String, Document)>,
    next_id: u64,
    fail_listing: bool,
    fail_create: HashSet<String>,
    fail_write: HashSet<String>,
    fail_delete: bool,
}

/// Document tree that keeps everything in memory. Handles are opaque ids.
#[derive(Clone, Default)]
pub struct MemoryTree {
    state: Arc<Mutex<TreeState>>,
}

impl MemoryTree {
    pub fn new() -> Self {
        let tree = Self::default();
        tree.add_directory("", SOURCE_ROOT);
        tree.add_directory("", DESTINATION_ROOT);
        tree
    }

    pub fn source() -> DocumentHandle {
        DocumentHandle::new(SOURCE_ROOT)
    }

    pub fn destination() -> DocumentHandle {
        DocumentHandle::new(DESTINATION_ROOT)
    }

    fn add_directory(&self, parent: &str, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.documents.push((
            id.to_string(),
            Document {
                parent: parent.to_string(),
                name: id.to_string(),
                mime_type: None,
                content: Arc::new(Mutex::new(Vec::new())),
                last_modified: 0,
                is_directory: true,
            },
        ));
    }

    /// Add a file under the source root and return its entry.
    pub fn add_source_file(&self, name: &str, bytes: &[u8], last_modified: i64) -> DocumentEntry {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("doc:{}", state.next_id);
        state.documents.push((
            id.clone(),
            Document {
                parent: SOURCE_ROOT.to_string(),
                name: name.to_string(),
                mime_type: None,
                content: Arc::new(Mutex::new(bytes.to_vec())),
                last_modified,
                is_directory: false,
            },
        ));
        DocumentEntry {
            handle: DocumentHandle::new(&id),
            name: name.to_string(),
            document_id: id,
            last_modified,
            is_directory: false,
        }
    }

    pub fn add_source_directory(&self, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("dir:{}", state.next_id);
        state.documents.push((
            id,
            Document {
                parent: SOURCE_ROOT.to_string(),
                name: name.to_string(),
                mime_type: None,
                content: Arc::new(Mutex::new(Vec::new())),
                last_modified: 0,
                is_directory: true,
            },
        ));
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    /// Creating a destination document with this display name fails.
    pub fn fail_create(&self, display_name: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_create
            .insert(display_name.to_string());
    }

    /// Writing into a destination document with this display name fails.
    pub fn fail_write(&self, display_name: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_write
            .insert(display_name.to_string());
    }

    pub fn fail_delete(&self) {
        self.state.lock().unwrap().fail_delete = true;
    }

    /// `(name, mime type, bytes)` of every file under the destination root.
    pub fn destination_files(&self) -> Vec<(String, String, Vec<u8>)> {
        let state = self.state.lock().unwrap();
        state
            .documents
            .iter()
            .filter(|(_, doc)| doc.parent == DESTINATION_ROOT)
            .map(|(_, doc)| {
                (
                    doc.name.clone(),
                    doc.mime_type.clone().unwrap_or_default(),
                    doc.content.lock().unwrap().clone(),
                )
            })
            .collect()
    }

    pub fn contains(&self, handle: &DocumentHandle) -> bool {
        let state = self.state.lock().unwrap();
        state.documents.iter().any(|(id, _)| id == handle.as_str())
    }

    fn find(&self, handle: &DocumentHandle) -> BridgeResult<Document> {
        let state = self.state.lock().unwrap();
        state
            .documents
            .iter()
            .find(|(id, _)| id == handle.as_str())
            .map(|(_, doc)| doc.clone())
            .ok_or_else(|| BridgeError::NotFound(handle.to_string()))
    }
}

#[async_trait]
impl DocumentTree for MemoryTree {
    async fn list_children(&self, parent: &DocumentHandle) -> BridgeResult<Vec<DocumentEntry>> {
        let state = self.state.lock().unwrap();
        if state.fail_listing {
            return Err(BridgeError::PermissionDenied("grant revoked".to_string()));
        }
        Ok(state
            .documents
            .iter()
            .filter(|(_, doc)| doc.parent == parent.as_str())
            .map(|(id, doc)| DocumentEntry {
                handle: DocumentHandle::new(id),
                name: doc.name.clone(),
                document_id: id.clone(),
                last_modified: doc.last_modified,
                is_directory: doc.is_directory,
            })
            .collect())
    }

    async fn open_read(&self, handle: &DocumentHandle) -> BridgeResult<Box<DynAsyncRead>> {
        let doc = self.find(handle)?;
        let bytes = doc.content.lock().unwrap().clone();
        Ok(Box::new(io::Cursor::new(bytes)))
    }

    async fn create_document(
        &self,
        parent: &DocumentHandle,
        mime_type: &str,
        display_name: &str,
    ) -> BridgeResult<DocumentHandle> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create.contains(display_name) {
            return Err(BridgeError::OperationFailed("no space left".to_string()));
        }
        state.next_id += 1;
        let id = format!("out:{}", state.next_id);
        state.documents.push((
            id.clone(),
            Document {
                parent: parent.to_string(),
                name: display_name.to_string(),
                mime_type: Some(mime_type.to_string()),
                content: Arc::new(Mutex::new(Vec::new())),
                last_modified: 0,
                is_directory: false,
            },
        ));
        Ok(DocumentHandle::new(id))
    }

    async fn open_write(&self, handle: &DocumentHandle) -> BridgeResult<Box<DynAsyncWrite>> {
        let doc = self.find(handle)?;
        let fail = self.state.lock().unwrap().fail_write.contains(&doc.name);
        doc.content.lock().unwrap().clear();
        Ok(Box::new(MemoryWriter {
            content: doc.content,
            fail,
        }))
    }

    async fn delete(&self, handle: &DocumentHandle) -> BridgeResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete && handle.as_str().starts_with("doc:") {
            return Err(BridgeError::PermissionDenied("read-only source".to_string()));
        }
        let before = state.documents.len();
        state.documents.retain(|(id, _)| id != handle.as_str());
        if state.documents.len() == before {
            return Err(BridgeError::NotFound(handle.to_string()));
        }
        Ok(())
    }
}

struct MemoryWriter {
    content: Arc<Mutex<Vec<u8>>>,
    fail: bool,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.fail {
            return Poll::Ready(Err(io::Error::other("device disconnected")));
        }
        self.content.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// ============================================================================
// Decoder
// ============================================================================

mock! {
    pub Decoder {}

    #[async_trait]
    impl NcmDecoder for Decoder {
        async fn get_metadata(&self, input_path: &Path) -> BridgeResult<String>;
        async fn decode(&self, request: DecodeRequest) -> BridgeResult<i32>;
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Decoder answering metadata from a table keyed by file name.
pub fn metadata_table(decoder: &mut MockDecoder, table: &[(&str, &str)]) {
    let table: HashMap<String, String> = table
        .iter()
        .map(|(name, blob)| (name.to_string(), blob.to_string()))
        .collect();
    decoder.expect_get_metadata().returning(move |path| {
        let name = file_name(path);
        table
            .get(&name)
            .cloned()
            .ok_or(BridgeError::NotFound(name))
    });
}

/// Decode succeeds and writes `<base>.<extension>` next to the input.
pub fn decode_writes(decoder: &mut MockDecoder, extension: &'static str) {
    decoder.expect_decode().returning(move |request| {
        let base = request
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = request.output_dir.join(format!("{}.{}", base, extension));
        std::fs::write(&output, format!("decoded:{}", base)).map_err(BridgeError::Io)?;
        Ok(bridge_traits::DECODE_SUCCESS)
    });
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub dir: TempDir,
    pub scratch: PathBuf,
    pub tree: MemoryTree,
    pub settings: Arc<JsonSettingsStore>,
    pub event_bus: EventBus,
    pub coordinator: ConversionCoordinator,
}

impl Harness {
    pub fn new(decoder: impl NcmDecoder + 'static) -> Self {
        Self::with_tree(decoder, MemoryTree::new())
    }

    pub fn with_tree(decoder: impl NcmDecoder + 'static, tree: MemoryTree) -> Self {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join("scratch");
        let settings = Arc::new(JsonSettingsStore::in_memory());
        let config = ConverterConfig::builder()
            .scratch_dir(&scratch)
            .decoder(Arc::new(decoder))
            .file_system(Arc::new(TokioFileSystem::with_directories(
                dir.path().join("cache"),
                dir.path().join("data"),
            )))
            .settings_store(settings.clone())
            .disable_cover_download()
            .build()
            .unwrap();

        let event_bus = EventBus::new(64);
        let coordinator =
            ConversionCoordinator::new(&config, Arc::new(tree.clone()), event_bus.clone());

        Self {
            dir,
            scratch,
            tree,
            settings,
            event_bus,
            coordinator,
        }
    }

    /// Files left in the scratch directory.
    pub fn scratch_files(&self) -> Vec<String> {
        match std::fs::read_dir(&self.scratch) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Catalog entry for a source file, as a scan would have produced it.
pub fn entry_for(file: &DocumentEntry, title: &str, artist: &str) -> CatalogEntry {
    let mut entry = CatalogEntry::new(
        file.name.clone(),
        file.handle.clone(),
        file.document_id.clone(),
        title,
        artist,
        file.last_modified,
    );
    entry.selected = true;
    entry
}
