//! Workspace placeholder crate.
//!
//! Exposes the converter service facade behind the `desktop-shims` feature so
//! host applications can depend on a single crate instead of wiring
//! `core-service`, `core-convert` and the bridge crates individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
