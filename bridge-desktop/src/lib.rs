//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `DocumentTree` over plain local directories
//! - `SettingsStore` using a JSON file in the data directory
//!
//! There is no desktop decoder engine; hosts always supply their own
//! `NcmDecoder`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonSettingsStore, LocalDocumentTree, ReqwestHttpClient, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let fs = TokioFileSystem::new();
//!     let tree = LocalDocumentTree::new();
//!     let settings = JsonSettingsStore::open(data_dir.join("settings.json")).await?;
//!     let http = ReqwestHttpClient::new();
//!
//!     // Use in converter configuration
//!     Ok(())
//! }
//! ```

mod filesystem;
mod http;
mod settings;
mod tree;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use settings::JsonSettingsStore;
pub use tree::LocalDocumentTree;
