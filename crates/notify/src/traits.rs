//! The channel abstraction every delivery backend implements.

use std::collections::HashMap;

/// Failure modes shared by all channels.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("http delivery failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("channel configuration error: {0}")]
    Config(String),
}

/// A fully rendered message, ready to hand to any channel.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// Flat key/value context (alert id, environment, event kind) for
    /// channels that carry structured payloads.
    pub metadata: HashMap<String, String>,
}

/// One delivery backend. Implementations must be cheap to call twice:
/// the controller retries failed channels on the next tick.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Push a canned message through the channel to prove connectivity.
    async fn test(&self) -> Result<(), NotifyError> {
        let probe = Notification {
            subject: "[TEST] Argus channel test".to_string(),
            body: "Connectivity test from the Argus detection engine.".to_string(),
            metadata: HashMap::from([
                ("alert_id".to_string(), "test-alert".to_string()),
                ("event".to_string(), "test".to_string()),
            ]),
        };
        self.send(&probe).await
    }

    /// Short channel label for logs, "email" or "webhook".
    fn channel_name(&self) -> &str;
}

/// Outcome of one channel's delivery attempt.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// True when at least one channel in the batch confirmed delivery.
pub fn any_success(results: &[DispatchResult]) -> bool {
    results.iter().any(|r| r.success)
}
