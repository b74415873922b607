//! Catalog envelope for lightweight first-pass deserialization.

use serde::{Deserialize, Serialize};

use super::{AlertDocument, CatalogDocument, DetectionDocument, DocumentKind, DocumentMetadata};

/// First pass over a catalog document: header fields only.
///
/// The `kind` field selects the concrete document type; a second pass
/// then deserializes the whole document into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEnvelope {
    pub version: u32,
    pub kind: String,
    pub metadata: DocumentMetadata,
    /// Everything past the header, kept as raw YAML for the second pass.
    #[serde(flatten)]
    pub rest: serde_yaml::Value,
}

impl CatalogEnvelope {
    /// Parse the `kind` field into a typed [`DocumentKind`].
    pub fn document_kind(&self) -> std::result::Result<DocumentKind, String> {
        self.kind.parse()
    }

    /// Second pass: re-serialize the envelope and parse it as the concrete type.
    pub fn parse_full(&self) -> std::result::Result<CatalogDocument, String> {
        match self.document_kind()? {
            DocumentKind::Detection => {
                let yaml = serde_yaml::to_string(self).map_err(|e| e.to_string())?;
                let doc: DetectionDocument =
                    serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;
                Ok(CatalogDocument::Detection(doc))
            }
            DocumentKind::Alert => {
                let yaml = serde_yaml::to_string(self).map_err(|e| e.to_string())?;
                let doc: AlertDocument =
                    serde_yaml::from_str(&yaml).map_err(|e| e.to_string())?;
                Ok(CatalogDocument::Alert(doc))
            }
        }
    }
}
