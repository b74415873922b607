//! YAML catalog schema types with serde deserialization.
//!
//! Defines the type hierarchy for catalog documents:
//! - `CatalogEnvelope`: lightweight first-pass header (version, kind, metadata)
//! - `CatalogDocument`: enum dispatching to kind-specific types
//! - `DetectionDocument`: detection rules with family-specific params
//! - `AlertDocument`: alert conditions over persisted detections
//!
//! New document kinds are added as `CatalogDocument` variants.

mod alert;
mod detection;
mod document;
mod envelope;
mod kind;
mod metadata;

pub use alert::*;
pub use detection::*;
pub use document::*;
pub use envelope::*;
pub use kind::*;
pub use metadata::*;

#[cfg(test)]
mod tests;
