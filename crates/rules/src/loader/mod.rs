//! Filesystem catalog loader with hot-reload via `notify` watcher.
//!
//! Watches the catalog directory for YAML file changes (create, modify,
//! delete) and rebuilds the in-memory store from scratch on every change.
//! Supports multi-document files and both document kinds via two-pass
//! deserialization (CatalogEnvelope -> CatalogDocument).

mod core;
mod error;
mod watcher;

pub use self::core::{parse_documents, CatalogLoader};
pub use self::error::{CatalogError, LoadResult, LoadStatus, Result};
