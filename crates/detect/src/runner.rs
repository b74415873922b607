//! One-rule and all-rules evaluation entry points.
//!
//! The runner wires config lookup, window fetch, baselines, scoring,
//! and persistence for a single `(rule_id, environment, now)` triple.
//! Entry points are idempotent for a fixed `now`, so any external
//! scheduler can drive them.

use argus_core::{
    AuditLog, Environment, EvalWindow, ExecutionPhase, LogLevel,
};
use argus_rules::{RuleConfigStore, RuleDefinition, RuleParams};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::aggregate::{aggregate_entities, Measure};
use crate::baseline::{compute_baselines, Baseline};
use crate::error::DetectError;
use crate::scorer::score_rule;
use crate::sink::DetectionStore;
use crate::source::{EventFilter, EventSource};
use crate::window::EventWindow;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout applied to each source fetch.
    pub fetch_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Summary of one rule evaluation.
#[derive(Debug, Clone)]
pub struct RuleRunReport {
    pub run_id: Uuid,
    pub rule_id: String,
    pub environment: Environment,
    pub window: EvalWindow,
    pub events_seen: usize,
    pub malformed_events: usize,
    pub entities_aggregated: usize,
    pub baselines_computed: usize,
    /// Aggregated entities dropped for lack of a baseline.
    pub entities_skipped: usize,
    pub records_emitted: usize,
    pub elapsed_ms: u64,
}

/// Drives rule evaluations against one source and one sink.
pub struct RuleRunner {
    store: Arc<RuleConfigStore>,
    source: Arc<dyn EventSource>,
    sink: Arc<dyn DetectionStore>,
    audit: Arc<AuditLog>,
    config: RunnerConfig,
}

impl RuleRunner {
    pub fn new(
        store: Arc<RuleConfigStore>,
        source: Arc<dyn EventSource>,
        sink: Arc<dyn DetectionStore>,
        audit: Arc<AuditLog>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            store,
            source,
            sink,
            audit,
            config,
        }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Evaluate one rule for the window ending at `now`.
    ///
    /// The window is computed once, up front, and every stage sees the
    /// same bounds. Passing the same `now` twice reproduces the same
    /// records.
    pub async fn evaluate(
        &self,
        rule_id: &str,
        environment: Environment,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<RuleRunReport, DetectError> {
        let started = std::time::Instant::now();
        let run_id = Uuid::new_v4();

        let rule = match self.store.get_active_config(rule_id, environment) {
            Ok(rule) => rule,
            Err(e) => {
                self.audit.log(
                    rule_id,
                    LogLevel::Error,
                    ExecutionPhase::ConfigLoad,
                    e.to_string(),
                );
                return Err(DetectError::Config(e));
            }
        };
        self.audit.log(
            rule_id,
            LogLevel::Info,
            ExecutionPhase::ConfigLoad,
            format!("active config loaded ({})", rule.family()),
        );

        let window = EvalWindow::ending_at(now, rule.window_hours());
        let filter = match rule.params.actions() {
            Some(actions) => EventFilter::for_actions(actions),
            None => EventFilter::any(),
        };

        let (current, baselines) = match self.fetch_and_baseline(&rule, window, &filter).await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.audit.log(
                    rule_id,
                    LogLevel::Error,
                    ExecutionPhase::WindowFetch,
                    e.to_string(),
                );
                return Err(e);
            }
        };
        self.audit.log_with_details(
            rule_id,
            LogLevel::Info,
            ExecutionPhase::WindowFetch,
            format!("window {}", window),
            Some(serde_json::json!({
                "events": current.len(),
                "malformed": current.malformed,
            })),
            None,
        );

        let measure = Measure::for_params(&rule.params);
        let aggregates = aggregate_entities(&current.events, &measure);

        let entities_skipped = match rule.params {
            RuleParams::VolumeBaseline(_) => aggregates
                .keys()
                .filter(|id| !baselines.contains_key(*id))
                .count(),
            _ => 0,
        };
        self.audit.log(
            rule_id,
            LogLevel::Info,
            ExecutionPhase::Baseline,
            format!(
                "{} baselines for {} entities ({} skipped)",
                baselines.len(),
                aggregates.len(),
                entities_skipped
            ),
        );

        let records = score_rule(&rule, &window, &aggregates, &baselines);
        self.audit.log(
            rule_id,
            LogLevel::Info,
            ExecutionPhase::Scoring,
            format!("{} detection records", records.len()),
        );

        let persisted = self.sink.persist(&records).map_err(|e| {
            self.audit.log(
                rule_id,
                LogLevel::Error,
                ExecutionPhase::Persist,
                e.to_string(),
            );
            DetectError::Sink(e)
        })?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.audit.log_with_details(
            rule_id,
            LogLevel::Info,
            ExecutionPhase::Complete,
            "evaluation finished",
            Some(serde_json::json!({
                "run_id": run_id.to_string(),
                "records": persisted,
            })),
            Some(elapsed_ms),
        );
        info!(
            rule_id,
            environment = %environment,
            window = %window,
            events = current.len(),
            records = persisted,
            elapsed_ms,
            "rule evaluated"
        );

        Ok(RuleRunReport {
            run_id,
            rule_id: rule.rule_id,
            environment,
            window,
            events_seen: current.len(),
            malformed_events: current.malformed,
            entities_aggregated: aggregates.len(),
            baselines_computed: baselines.len(),
            entities_skipped,
            records_emitted: persisted,
            elapsed_ms,
        })
    }

    /// Fetch the current window and, for statistical rules, the
    /// lookback history in parallel. The ranges are disjoint (history
    /// ends where the window starts), so baselines can never see the
    /// events being scored.
    async fn fetch_and_baseline(
        &self,
        rule: &RuleDefinition,
        window: EvalWindow,
        filter: &EventFilter,
    ) -> Result<(EventWindow, BTreeMap<String, Baseline>), DetectError> {
        let timeout = self.config.fetch_timeout;
        match &rule.params {
            RuleParams::VolumeBaseline(params) => {
                let history_window = window.lookback(params.lookback_days);
                let (current, history) = tokio::join!(
                    EventWindow::fetch(self.source.as_ref(), window, filter, timeout),
                    EventWindow::fetch(self.source.as_ref(), history_window, filter, timeout),
                );
                let current = current?;
                let history = history?;
                let measure = Measure::Attribute(params.measure_attribute.clone());
                let baselines =
                    compute_baselines(&history.events, &measure, params.min_samples);
                Ok((current, baselines))
            }
            _ => {
                let current =
                    EventWindow::fetch(self.source.as_ref(), window, filter, timeout).await?;
                Ok((current, BTreeMap::new()))
            }
        }
    }

    /// Evaluate an explicit list of rules concurrently. One rule's
    /// failure never aborts its siblings; each id gets its own result.
    pub async fn evaluate_rules(
        &self,
        rule_ids: &[String],
        environment: Environment,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Vec<(String, Result<RuleRunReport, DetectError>)> {
        let runs = rule_ids
            .iter()
            .map(|id| async move { (id.clone(), self.evaluate(id, environment, now).await) });
        let results = futures::future::join_all(runs).await;
        for (id, result) in &results {
            if let Err(e) = result {
                error!(rule_id = %id, environment = %environment, error = %e, "rule evaluation failed");
            }
        }
        results
    }

    /// Evaluate every active rule in the environment.
    pub async fn evaluate_all(
        &self,
        environment: Environment,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Vec<(String, Result<RuleRunReport, DetectError>)> {
        let ids: Vec<String> = self
            .store
            .list_active(environment)
            .into_iter()
            .map(|r| r.rule_id)
            .collect();
        self.evaluate_rules(&ids, environment, now).await
    }
}
