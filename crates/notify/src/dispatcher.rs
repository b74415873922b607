//! Notification dispatcher.
//!
//! Routes notifications to the channels registered for an alert and
//! records a per-channel delivery outcome. Channels are tried in
//! registration order; one channel failing never prevents the rest
//! from being attempted.

use std::collections::HashMap;
use std::time::Instant;

use crate::traits::{DispatchResult, Notification, Notifier, NotifyError};

/// Routes notifications to per-alert channel sets.
///
/// Alerts that have no explicit channels fall back to the default
/// set. An alert with neither gets nothing delivered and an empty
/// result list.
#[derive(Default)]
pub struct Dispatcher {
    /// Channels keyed by alert id.
    alert_channels: HashMap<String, Vec<Box<dyn Notifier>>>,
    /// Fallback channels for alerts without an explicit set.
    default_channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    /// Create an empty dispatcher with no channels registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher with a fallback channel set.
    pub fn with_defaults(default_channels: Vec<Box<dyn Notifier>>) -> Self {
        Self {
            alert_channels: HashMap::new(),
            default_channels,
        }
    }

    /// Register (or replace) the channel set for one alert.
    pub fn set_alert_channels(&mut self, alert_id: impl Into<String>, channels: Vec<Box<dyn Notifier>>) {
        self.alert_channels.insert(alert_id.into(), channels);
    }

    /// Drop the channel set for an alert (it falls back to defaults).
    pub fn remove_alert(&mut self, alert_id: &str) {
        self.alert_channels.remove(alert_id);
    }

    /// Number of channels that would serve `alert_id`.
    pub fn channel_count(&self, alert_id: &str) -> usize {
        self.channels_for(alert_id).len()
    }

    fn channels_for(&self, alert_id: &str) -> &[Box<dyn Notifier>] {
        match self.alert_channels.get(alert_id) {
            Some(channels) => channels,
            None => &self.default_channels,
        }
    }

    /// Deliver a notification through every channel serving `alert_id`.
    ///
    /// Channels run sequentially in registration order. Each outcome is
    /// captured in a [`DispatchResult`]; a failing channel is logged
    /// and skipped, never aborting the remaining channels.
    pub async fn dispatch(&self, alert_id: &str, notification: &Notification) -> Vec<DispatchResult> {
        let channels = self.channels_for(alert_id);
        if channels.is_empty() {
            tracing::debug!(alert_id, "no notification channels registered");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(channels.len());
        for channel in channels {
            let started = Instant::now();
            let outcome = channel.send(notification).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => {
                    tracing::info!(
                        alert_id,
                        channel = channel.channel_name(),
                        duration_ms,
                        "notification delivered"
                    );
                    results.push(DispatchResult {
                        channel: channel.channel_name().to_string(),
                        success: true,
                        error: None,
                        duration_ms,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        alert_id,
                        channel = channel.channel_name(),
                        duration_ms,
                        error = %e,
                        "notification delivery failed"
                    );
                    results.push(DispatchResult {
                        channel: channel.channel_name().to_string(),
                        success: false,
                        error: Some(e.to_string()),
                        duration_ms,
                    });
                }
            }
        }
        results
    }

    /// Send a test notification through one channel of an alert.
    ///
    /// `index` addresses the channel within the alert's set, in
    /// registration order.
    pub async fn test_notify(&self, alert_id: &str, index: usize) -> Result<(), NotifyError> {
        let channels = self.channels_for(alert_id);
        let channel = channels.get(index).ok_or_else(|| {
            NotifyError::Config(format!(
                "alert {alert_id} has no channel at index {index} ({} registered)",
                channels.len()
            ))
        })?;
        channel.test().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockNotifier {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Notifier for MockNotifier {
        async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifyError::Config("mock failure".into()))
            } else {
                Ok(())
            }
        }

        fn channel_name(&self) -> &str {
            self.name
        }
    }

    fn notification() -> Notification {
        Notification {
            subject: "test subject".into(),
            body: "test body".into(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn dispatch_reaches_every_registered_channel() {
        let calls_a = Arc::new(AtomicUsize::new(0));
        let calls_b = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_alert_channels(
            "large-upload",
            vec![
                Box::new(MockNotifier {
                    name: "email",
                    fail: false,
                    calls: Arc::clone(&calls_a),
                }) as Box<dyn Notifier>,
                Box::new(MockNotifier {
                    name: "webhook",
                    fail: false,
                    calls: Arc::clone(&calls_b),
                }),
            ],
        );

        let results = dispatcher.dispatch("large-upload", &notification()).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_failing_channel_never_blocks_the_next() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_alert_channels(
            "auth-burst",
            vec![
                Box::new(MockNotifier {
                    name: "email",
                    fail: true,
                    calls: Arc::clone(&calls),
                }) as Box<dyn Notifier>,
                Box::new(MockNotifier {
                    name: "webhook",
                    fail: false,
                    calls: Arc::clone(&calls),
                }),
            ],
        );

        let results = dispatcher.dispatch("auth-burst", &notification()).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().is_some_and(|e| e.contains("mock failure")));
        assert!(results[1].success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(crate::traits::any_success(&results));
    }

    #[tokio::test]
    async fn unknown_alert_falls_back_to_defaults() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = Dispatcher::with_defaults(vec![Box::new(MockNotifier {
            name: "email",
            fail: false,
            calls: Arc::clone(&calls),
        }) as Box<dyn Notifier>]);

        let results = dispatcher.dispatch("never-registered", &notification()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].channel, "email");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_channels_yields_empty_results() {
        let dispatcher = Dispatcher::new();
        let results = dispatcher.dispatch("anything", &notification()).await;
        assert!(results.is_empty());
        assert!(!crate::traits::any_success(&results));
    }

    #[tokio::test]
    async fn explicit_empty_set_overrides_defaults() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::with_defaults(vec![Box::new(MockNotifier {
            name: "email",
            fail: false,
            calls: Arc::clone(&calls),
        }) as Box<dyn Notifier>]);
        dispatcher.set_alert_channels("silenced", Vec::new());

        let results = dispatcher.dispatch("silenced", &notification()).await;
        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_notify_addresses_one_channel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_alert_channels(
            "large-upload",
            vec![Box::new(MockNotifier {
                name: "email",
                fail: false,
                calls: Arc::clone(&calls),
            }) as Box<dyn Notifier>],
        );

        dispatcher.test_notify("large-upload", 0).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let err = dispatcher.test_notify("large-upload", 5).await.unwrap_err();
        assert!(err.to_string().contains("no channel at index 5"));
    }
}
