//! Rule and alert catalog for the Argus detection engine.
//!
//! This crate provides:
//! - YAML catalog schema with serde deserialization (Detection and Alert kinds)
//! - Directory loader that hot-reloads through a `notify` watcher
//! - Thread-safe configuration store keyed by (id, environment)
//! - Structured validation with errors and warnings
//! - Cron schedule helpers shared with the alert scheduler

pub mod alert;
pub mod definition;
pub mod loader;
pub mod schedule;
pub mod schema;
pub mod store;
pub mod validation;

pub use alert::{AlertDefinition, AlertSchedule, ComparisonOp, DetectionScope, EmptyResultState};
pub use definition::{
    EmissionPolicy, FailedAuthParams, PrivilegeEscalationParams, RuleDefinition, RuleFamily,
    RuleParams, VolumeBaselineParams,
};
pub use loader::{CatalogError, CatalogLoader, LoadResult, LoadStatus};
pub use store::{ConfigError, RuleConfigStore};
pub use validation::{validate_alert, validate_catalog, validate_rule, ValidationResult};
