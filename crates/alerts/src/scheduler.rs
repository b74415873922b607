//! Cron bookkeeping for alert evaluation.
//!
//! Tracks which alerts are due at a given instant. The scheduler never
//! ticks anything itself; a driver (CLI or daemon loop) asks for due
//! alerts, runs them through the controller, and records the tick.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use cron::Schedule;

use argus_core::Environment;
use argus_rules::schedule::{is_cron_due, parse_cron};
use argus_rules::AlertDefinition;

use crate::error::AlertError;

struct ScheduleEntry {
    schedule: Schedule,
    paused: bool,
    last_tick: Option<DateTime<Utc>>,
}

/// Keeps one cron schedule per (alert_id, environment).
#[derive(Default)]
pub struct AlertScheduler {
    entries: RwLock<HashMap<(String, Environment), ScheduleEntry>>,
}

impl AlertScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the schedule table from alert definitions.
    ///
    /// Last-tick times survive for alerts that remain; removed alerts
    /// are dropped. Alerts with an unparseable cron are skipped and
    /// reported, never silently tracked.
    pub fn sync_alerts(&self, alerts: &[AlertDefinition]) -> Vec<AlertError> {
        let mut errors = Vec::new();
        let mut guard = self.entries.write().expect("scheduler lock poisoned");

        let mut next: HashMap<(String, Environment), ScheduleEntry> = HashMap::new();
        for alert in alerts {
            let schedule = match parse_cron(&alert.schedule.cron) {
                Ok(s) => s,
                Err(e) => {
                    errors.push(AlertError::Schedule {
                        alert_id: alert.alert_id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let key = alert.key();
            let last_tick = guard.get(&key).and_then(|entry| entry.last_tick);
            next.insert(
                key,
                ScheduleEntry {
                    schedule,
                    paused: alert.paused,
                    last_tick,
                },
            );
        }
        *guard = next;
        errors
    }

    /// Alerts whose schedule has a tick between their last recorded
    /// tick and `now`. Paused alerts are never due.
    pub fn due_alerts(&self, now: DateTime<Utc>) -> Vec<(String, Environment)> {
        let guard = self.entries.read().expect("scheduler lock poisoned");
        let mut due: Vec<(String, Environment)> = guard
            .iter()
            .filter(|(_, entry)| !entry.paused)
            .filter(|(_, entry)| is_cron_due(&entry.schedule, now, entry.last_tick))
            .map(|(key, _)| key.clone())
            .collect();
        due.sort_by(|a, b| (&a.0, a.1.as_str()).cmp(&(&b.0, b.1.as_str())));
        due
    }

    /// Record that an alert was ticked at `now`.
    pub fn record_tick(&self, alert_id: &str, environment: Environment, now: DateTime<Utc>) {
        let mut guard = self.entries.write().expect("scheduler lock poisoned");
        if let Some(entry) = guard.get_mut(&(alert_id.to_string(), environment)) {
            entry.last_tick = Some(now);
        }
    }

    /// Number of tracked schedules.
    pub fn len(&self) -> usize {
        self.entries.read().expect("scheduler lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_rules::{AlertSchedule, ComparisonOp, DetectionScope, EmptyResultState};

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn alert(id: &str, cron: &str, paused: bool) -> AlertDefinition {
        AlertDefinition {
            alert_id: id.to_string(),
            display_name: id.to_string(),
            environment: Environment::Prod,
            source: DetectionScope {
                rule_id: "large-upload".to_string(),
                detection_type: None,
            },
            period_hours: 24,
            comparison: ComparisonOp::GreaterThan,
            threshold: 0.0,
            schedule: AlertSchedule {
                cron: cron.to_string(),
                timezone: "UTC".to_string(),
            },
            retrigger_seconds: 0,
            empty_result_state: EmptyResultState::Unknown,
            notify_on_ok: false,
            paused,
            recipients: vec![],
            created_at: ts("2025-01-01T00:00:00Z"),
            updated_at: ts("2025-01-01T00:00:00Z"),
        }
    }

    #[test]
    fn hourly_alert_becomes_due_and_tick_resets_it() {
        let scheduler = AlertScheduler::new();
        let errors = scheduler.sync_alerts(&[alert("hourly", "0 * * * *", false)]);
        assert!(errors.is_empty());

        let now = ts("2025-06-30T12:30:00Z");
        assert_eq!(
            scheduler.due_alerts(now),
            vec![("hourly".to_string(), Environment::Prod)]
        );

        scheduler.record_tick("hourly", Environment::Prod, now);
        assert!(scheduler.due_alerts(ts("2025-06-30T12:45:00Z")).is_empty());
        // Next scheduled tick (13:00) makes it due again.
        assert_eq!(scheduler.due_alerts(ts("2025-06-30T13:05:00Z")).len(), 1);
    }

    #[test]
    fn paused_alerts_are_never_due() {
        let scheduler = AlertScheduler::new();
        scheduler.sync_alerts(&[alert("paused-one", "0 * * * *", true)]);
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.due_alerts(ts("2025-06-30T12:30:00Z")).is_empty());
    }

    #[test]
    fn invalid_cron_is_reported_and_skipped() {
        let scheduler = AlertScheduler::new();
        let errors = scheduler.sync_alerts(&[
            alert("good", "0 * * * *", false),
            alert("bad", "not a cron", false),
        ]);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            AlertError::Schedule { alert_id, .. } if alert_id == "bad"
        ));
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn resync_preserves_last_tick_and_drops_removed() {
        let scheduler = AlertScheduler::new();
        scheduler.sync_alerts(&[
            alert("keep", "0 * * * *", false),
            alert("drop", "0 * * * *", false),
        ]);
        let now = ts("2025-06-30T12:30:00Z");
        scheduler.record_tick("keep", Environment::Prod, now);

        scheduler.sync_alerts(&[alert("keep", "0 * * * *", false)]);
        assert_eq!(scheduler.len(), 1);
        // last_tick survived the resync, so "keep" is not due yet.
        assert!(scheduler.due_alerts(ts("2025-06-30T12:45:00Z")).is_empty());
    }
}
