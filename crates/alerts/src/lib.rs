//! Alert lifecycle for the Argus detection engine.
//!
//! This crate provides:
//! - An [`AlertController`] that evaluates alert conditions over
//!   persisted detections and walks the Quiet/Triggered state machine
//! - Retrigger suppression and one-shot recovery notifications
//! - Per-alert runtime state ([`AlertStateStore`])
//! - Cron-based due-ness tracking ([`AlertScheduler`])

pub mod controller;
pub mod error;
pub mod scheduler;
pub mod state;

pub use controller::{build_dispatcher, channel_key, AlertController, TickOutcome};
pub use error::AlertError;
pub use scheduler::AlertScheduler;
pub use state::{AlertRuntime, AlertStateEntry, AlertStateStore, AlertStatus};
