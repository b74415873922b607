//! Multi-kind catalog document container and accessors.

use super::{AlertDocument, DetectionDocument, DocumentKind, DocumentMetadata};

/// A fully deserialized catalog document of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogDocument {
    /// Detection rule (volume_baseline, failed_auth, privilege_escalation).
    Detection(DetectionDocument),
    /// Alert over persisted detections.
    Alert(AlertDocument),
}

impl CatalogDocument {
    /// Get the document's metadata regardless of kind.
    pub fn metadata(&self) -> &DocumentMetadata {
        match self {
            CatalogDocument::Detection(doc) => &doc.metadata,
            CatalogDocument::Alert(doc) => &doc.metadata,
        }
    }

    /// Get the document kind.
    pub fn kind(&self) -> DocumentKind {
        match self {
            CatalogDocument::Detection(_) => DocumentKind::Detection,
            CatalogDocument::Alert(_) => DocumentKind::Alert,
        }
    }

    /// Try to extract as a `DetectionDocument` reference.
    pub fn as_detection(&self) -> Option<&DetectionDocument> {
        match self {
            CatalogDocument::Detection(doc) => Some(doc),
            _ => None,
        }
    }

    /// Try to extract as an `AlertDocument` reference.
    pub fn as_alert(&self) -> Option<&AlertDocument> {
        match self {
            CatalogDocument::Alert(doc) => Some(doc),
            _ => None,
        }
    }
}
