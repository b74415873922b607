//! Alert lifecycle controller.
//!
//! Evaluates one alert's condition over persisted detections and walks
//! its Quiet/Triggered state machine: notify on the firing edge,
//! suppress repeats inside the retrigger window, and (optionally) send
//! a one-shot recovery notification when the condition clears.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use argus_core::{AuditLog, Environment, EvalWindow, ExecutionPhase, LogLevel};
use argus_detect::DetectionStore;
use argus_notify::{
    any_success, AlertContext, Dispatcher, EmailNotifier, Notification, Notifier, NotifyError,
    ResultContext, TemplateContext, TemplateRenderer, WebhookNotifier, DEFAULT_RECOVERY_BODY,
    DEFAULT_RECOVERY_SUBJECT, DEFAULT_TRIGGER_BODY, DEFAULT_TRIGGER_SUBJECT,
};
use argus_rules::{AlertDefinition, EmptyResultState, RuleConfigStore};

use crate::error::AlertError;
use crate::state::{AlertStateStore, AlertStatus};

/// What one evaluation tick concluded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// The alert is paused; nothing was evaluated or changed.
    Paused,
    /// No detection data at all and `empty_result_state: unknown`;
    /// the state machine did not move.
    Unknown,
    /// Condition does not hold and the alert was already quiet.
    Quiet { value: Option<f64> },
    /// Condition holds; `notified` is false when no channels are registered.
    Triggered { value: Option<f64>, notified: bool },
    /// Condition holds but the retrigger window since the last
    /// notification has not elapsed yet.
    Suppressed { value: Option<f64>, remaining_secs: u64 },
    /// Condition cleared on a previously triggered alert.
    Recovered { value: Option<f64>, notified: bool },
}

impl TickOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TickOutcome::Paused => "paused",
            TickOutcome::Unknown => "unknown",
            TickOutcome::Quiet { .. } => "quiet",
            TickOutcome::Triggered { .. } => "triggered",
            TickOutcome::Suppressed { .. } => "suppressed",
            TickOutcome::Recovered { .. } => "recovered",
        }
    }
}

/// Dispatcher key for one alert: alerts are keyed by (id, environment)
/// everywhere, so channel registration is too.
pub fn channel_key(alert_id: &str, environment: Environment) -> String {
    format!("{alert_id}@{environment}")
}

/// Build a dispatcher with one channel set per alert from engine config.
///
/// Email goes to the alert's own recipients when SMTP is configured;
/// the webhook endpoint (if any) is shared by every alert. Channel
/// construction failures skip that channel with a warning rather than
/// failing the whole build.
pub fn build_dispatcher(
    alerts: &[AlertDefinition],
    config: &argus_core::EngineConfig,
) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    for alert in alerts {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

        if config.smtp.is_configured() && !alert.recipients.is_empty() {
            match EmailNotifier::from_config(&config.smtp, &alert.recipients) {
                Ok(email) => channels.push(Box::new(email)),
                Err(e) => tracing::warn!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    "skipping email channel"
                ),
            }
        }

        if let Some(url) = &config.webhook.url {
            match WebhookNotifier::from_config(url.clone(), None, None) {
                Ok(webhook) => channels.push(Box::new(webhook)),
                Err(e) => tracing::warn!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    "skipping webhook channel"
                ),
            }
        }

        dispatcher.set_alert_channels(channel_key(&alert.alert_id, alert.environment), channels);
    }
    dispatcher
}

/// Drives alert evaluation against the detection store.
pub struct AlertController {
    store: Arc<RuleConfigStore>,
    detections: Arc<dyn DetectionStore>,
    dispatcher: Arc<Dispatcher>,
    renderer: TemplateRenderer,
    states: AlertStateStore,
    audit: Arc<AuditLog>,
}

impl AlertController {
    pub fn new(
        store: Arc<RuleConfigStore>,
        detections: Arc<dyn DetectionStore>,
        dispatcher: Arc<Dispatcher>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            store,
            detections,
            dispatcher,
            renderer: TemplateRenderer::new(),
            states: AlertStateStore::new(),
            audit,
        }
    }

    pub fn states(&self) -> &AlertStateStore {
        &self.states
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Evaluate one alert at `now`.
    ///
    /// The aggregation period is the `period_hours` ending at `now`.
    /// Holding the per-alert state lock across the notification awaits
    /// makes racing ticks of the same alert serialize.
    pub async fn tick(
        &self,
        alert_id: &str,
        environment: Environment,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, AlertError> {
        let alert = match self.store.get_alert(alert_id, environment) {
            Ok(a) => a,
            Err(e) => {
                self.audit.log(
                    alert_id,
                    LogLevel::Error,
                    ExecutionPhase::ConfigLoad,
                    format!("failed to load alert: {e}"),
                );
                return Err(e.into());
            }
        };

        // Paused short-circuits before any state is touched.
        if alert.paused {
            tracing::debug!(alert_id, environment = %environment, "alert paused, skipping tick");
            return Ok(TickOutcome::Paused);
        }

        let handle = self.states.handle(alert_id, environment);
        let mut state = handle.lock().await;
        state.last_evaluated = Some(now);

        let period = EvalWindow::ending_at(now, alert.period_hours);
        let count = self
            .detections
            .count_detections(environment, &alert.source, &period)?;

        let (holds, value) = match count {
            Some(v) => (alert.comparison.holds(v, alert.threshold), Some(v)),
            None => match alert.empty_result_state {
                EmptyResultState::Unknown => {
                    self.audit.log(
                        alert_id,
                        LogLevel::Info,
                        ExecutionPhase::AlertCheck,
                        format!("no detection data in period {period}, state unchanged"),
                    );
                    tracing::debug!(alert_id, period = %period, "no detection data, outcome unknown");
                    return Ok(TickOutcome::Unknown);
                }
                EmptyResultState::Ok => (false, None),
                EmptyResultState::Triggered => (true, None),
            },
        };

        if let Some(v) = value {
            state.last_value = Some(v);
        }

        self.audit.log_with_details(
            alert_id,
            LogLevel::Info,
            ExecutionPhase::AlertCheck,
            format!(
                "condition {} {} {} over {period}",
                alert.comparison,
                alert.threshold,
                if holds { "holds" } else { "does not hold" }
            ),
            Some(serde_json::json!({
                "value": value,
                "threshold": alert.threshold,
                "comparison": alert.comparison.as_str(),
            })),
            None,
        );

        let outcome = if holds {
            // Retrigger window: suppress repeats while the condition keeps
            // holding after a confirmed notification.
            if let Some(last) = state.last_notified {
                let elapsed = (now - last).num_seconds().max(0) as u64;
                if elapsed < alert.retrigger_seconds {
                    state.status = AlertStatus::Triggered;
                    let remaining_secs = alert.retrigger_seconds - elapsed;
                    tracing::debug!(
                        alert_id,
                        remaining_secs,
                        "condition holds but retrigger window has not elapsed"
                    );
                    return Ok(TickOutcome::Suppressed {
                        value,
                        remaining_secs,
                    });
                }
            }

            let key = channel_key(alert_id, environment);
            let notification = self
                .render(&alert, value, now, "triggered", DEFAULT_TRIGGER_SUBJECT, DEFAULT_TRIGGER_BODY)
                .map_err(|e| AlertError::Notify(e.to_string()))?;
            let results = self.dispatcher.dispatch(&key, &notification).await;

            if results.is_empty() {
                // Misconfiguration, not a delivery failure: the alert still
                // transitions so recovery edges stay meaningful.
                tracing::warn!(alert_id, "alert fired but no notification channels are registered");
                self.audit.log(
                    alert_id,
                    LogLevel::Warning,
                    ExecutionPhase::Notification,
                    "fired with no notification channels registered",
                );
                state.status = AlertStatus::Triggered;
                TickOutcome::Triggered {
                    value,
                    notified: false,
                }
            } else if any_success(&results) {
                // Mark only after a confirmed delivery, so a failed attempt
                // is retried on the next tick instead of being swallowed.
                state.status = AlertStatus::Triggered;
                state.last_notified = Some(now);
                self.audit.log_with_details(
                    alert_id,
                    LogLevel::Info,
                    ExecutionPhase::Notification,
                    "alert notification delivered",
                    Some(serde_json::json!({
                        "channels": results.iter().map(|r| (&r.channel, r.success)).collect::<Vec<_>>(),
                    })),
                    None,
                );
                TickOutcome::Triggered {
                    value,
                    notified: true,
                }
            } else {
                let detail = results
                    .iter()
                    .filter_map(|r| r.error.as_deref())
                    .collect::<Vec<_>>()
                    .join("; ");
                self.audit.log(
                    alert_id,
                    LogLevel::Error,
                    ExecutionPhase::Notification,
                    format!("every notification channel failed: {detail}"),
                );
                return Err(AlertError::Notify(detail));
            }
        } else {
            let was_triggered = state.status == AlertStatus::Triggered;
            state.status = AlertStatus::Quiet;

            if was_triggered {
                let notified = if alert.notify_on_ok {
                    self.send_recovery(&alert, alert_id, environment, value, now).await
                } else {
                    false
                };
                self.audit.log(
                    alert_id,
                    LogLevel::Info,
                    ExecutionPhase::AlertCheck,
                    "condition cleared, alert recovered",
                );
                TickOutcome::Recovered { value, notified }
            } else {
                TickOutcome::Quiet { value }
            }
        };

        tracing::info!(
            alert_id,
            environment = %environment,
            outcome = outcome.label(),
            value,
            "alert evaluated"
        );
        Ok(outcome)
    }

    /// Evaluate every alert of an environment, one outcome per alert.
    ///
    /// Each alert is isolated: one failing never aborts its siblings.
    pub async fn tick_all(
        &self,
        environment: Environment,
        now: DateTime<Utc>,
    ) -> Vec<(String, Result<TickOutcome, AlertError>)> {
        let alerts = self.store.list_alerts(environment);
        let futures = alerts.iter().map(|a| {
            let alert_id = a.alert_id.clone();
            async move {
                let result = self.tick(&alert_id, environment, now).await;
                if let Err(e) = &result {
                    tracing::error!(alert_id, error = %e, "alert tick failed");
                }
                (alert_id, result)
            }
        });
        futures::future::join_all(futures).await
    }

    /// Best-effort recovery notification; failures are logged, never
    /// propagated, and `last_notified` is left alone.
    async fn send_recovery(
        &self,
        alert: &AlertDefinition,
        alert_id: &str,
        environment: Environment,
        value: Option<f64>,
        now: DateTime<Utc>,
    ) -> bool {
        let notification = match self.render(
            alert,
            value,
            now,
            "recovered",
            DEFAULT_RECOVERY_SUBJECT,
            DEFAULT_RECOVERY_BODY,
        ) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(alert_id, error = %e, "failed to render recovery notification");
                return false;
            }
        };

        let key = channel_key(alert_id, environment);
        let results = self.dispatcher.dispatch(&key, &notification).await;
        let notified = any_success(&results);
        if !results.is_empty() && !notified {
            self.audit.log(
                alert_id,
                LogLevel::Warning,
                ExecutionPhase::Notification,
                "recovery notification failed on every channel",
            );
        }
        notified
    }

    fn render(
        &self,
        alert: &AlertDefinition,
        value: Option<f64>,
        now: DateTime<Utc>,
        event: &str,
        subject_template: &str,
        body_template: &str,
    ) -> Result<Notification, NotifyError> {
        let ctx = TemplateContext {
            alert: AlertContext {
                id: alert.alert_id.clone(),
                display_name: alert.display_name.clone(),
                environment: alert.environment.as_str().to_string(),
                rule_id: alert.source.rule_id.clone(),
                detection_type: alert.source.detection_type.clone(),
                comparison: alert.comparison.to_string(),
                threshold: alert.threshold,
                period_hours: alert.period_hours,
            },
            result: ResultContext { value },
            event: event.to_string(),
            now: now.to_rfc3339(),
        };
        let subject = self.renderer.render(subject_template, &ctx)?;
        let body = self.renderer.render(body_template, &ctx)?;
        let metadata = std::collections::HashMap::from([
            ("alert_id".to_string(), alert.alert_id.clone()),
            ("environment".to_string(), alert.environment.as_str().to_string()),
            ("event".to_string(), event.to_string()),
        ]);
        Ok(Notification {
            subject,
            body,
            metadata,
        })
    }
}
