//! Error types and load result structures for the catalog loader.

use std::path::PathBuf;

/// Errors that can occur during catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Filesystem I/O failure.
    #[error("catalog io: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization failure.
    #[error("catalog yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Document validation failure (missing fields, out-of-range values, ...).
    #[error("catalog validation: {0}")]
    Validation(String),

    /// Filesystem watcher failure.
    #[error("catalog watcher: {0}")]
    Notify(#[from] notify::Error),
}

/// Result alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Outcome of loading a single catalog file.
#[derive(Debug)]
pub struct LoadResult {
    /// File the attempt was made on.
    pub path: PathBuf,
    /// How the attempt ended.
    pub status: LoadStatus,
}

/// How a single file load attempt ended.
///
/// A file either loads completely or not at all; a failed file never
/// contributes a subset of its documents.
#[derive(Debug)]
pub enum LoadStatus {
    /// Every document in the file loaded.
    Loaded { ids: Vec<String> },
    /// File ignored: dotfile, wrong extension, or similar.
    Skipped { reason: String },
    /// Parsing or validation rejected the file.
    Failed { error: String },
}
