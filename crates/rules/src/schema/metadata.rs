//! Common metadata shared by all catalog document kinds.

use serde::{Deserialize, Serialize};

use argus_core::Environment;

/// Shared metadata for detection and alert documents.
///
/// `environment` is part of the identity: the same id may appear once per
/// environment with different spec values. `active: false` keeps a document
/// loaded but excluded from evaluation (for alerts it means paused).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DocumentMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub environment: Environment,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub active: bool,
}

pub(crate) fn default_true() -> bool {
    true
}
