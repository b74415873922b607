//! Detection engine for Argus: windows, baselines, scoring, sinks.
//!
//! This crate provides:
//! - Event sources with window and filter queries (memory, JSONL)
//! - Per-entity aggregation over one evaluation window
//! - Historical baselines (daily totals, nearest-rank p95) via `rayon`
//! - The scoring cascade producing typed detection records
//! - Append-only detection stores answering alert-tier count queries
//! - A runner that evaluates rules concurrently with per-rule isolation

pub mod aggregate;
pub mod baseline;
pub mod error;
pub mod privilege;
pub mod record;
pub mod runner;
pub mod scorer;
pub mod sink;
pub mod source;
pub mod window;

pub use aggregate::{aggregate_entities, EntityAggregate, Escalation, Measure};
pub use baseline::{compute_baselines, Baseline};
pub use error::{DetectError, SinkError, SourceError};
pub use record::{DetectionRecord, DetectionType};
pub use runner::{RuleRunReport, RuleRunner, RunnerConfig};
pub use scorer::{confidence_from_attempts, confidence_from_score, score_rule};
pub use sink::{DetectionStore, JsonlDetectionStore, MemoryDetectionStore};
pub use source::{EventFilter, EventSource, JsonlEventSource, MemoryEventSource, SourceBatch};
pub use window::EventWindow;
