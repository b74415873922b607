//! Error types for alert evaluation.

use argus_detect::SinkError;
use argus_rules::ConfigError;

/// Errors from ticking or scheduling an alert.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("detection query error: {0}")]
    Query(#[from] SinkError),

    /// Every notification channel failed while the alert was firing.
    #[error("notification delivery failed: {0}")]
    Notify(String),

    #[error("invalid schedule for alert {alert_id}: {reason}")]
    Schedule { alert_id: String, reason: String },
}
