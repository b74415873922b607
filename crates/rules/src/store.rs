//! In-memory configuration store for rules and alerts.
//!
//! The catalog loader fills this store; evaluation and alerting read from it.
//! Keys are always (id, environment) so the same id can carry different
//! thresholds per environment. Uses `std::sync::RwLock` so it can be shared
//! between async handlers and synchronous scoring code.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use argus_core::Environment;

use crate::alert::AlertDefinition;
use crate::definition::RuleDefinition;

/// Failures when resolving configuration for an evaluation or alert tick.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("no rule '{rule_id}' configured for environment '{environment}'")]
    NotFound {
        rule_id: String,
        environment: Environment,
    },

    #[error("rule '{rule_id}' is inactive in environment '{environment}'")]
    Inactive {
        rule_id: String,
        environment: Environment,
    },

    #[error("no alert '{alert_id}' configured for environment '{environment}'")]
    AlertNotFound {
        alert_id: String,
        environment: Environment,
    },
}

/// Thread-safe store of resolved rule and alert configuration.
pub struct RuleConfigStore {
    rules: RwLock<HashMap<(String, Environment), RuleDefinition>>,
    alerts: RwLock<HashMap<(String, Environment), AlertDefinition>>,
}

impl RuleConfigStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            alerts: RwLock::new(HashMap::new()),
        }
    }

    // ── Rules ─────────────────────────────────────────────────

    /// Resolve the active rule for an evaluation.
    ///
    /// Missing and inactive rules are distinct failures so callers can report
    /// them differently; both abort only the requesting rule's run.
    pub fn get_active_config(
        &self,
        rule_id: &str,
        environment: Environment,
    ) -> Result<RuleDefinition, ConfigError> {
        let guard = self.rules.read().expect("rules lock poisoned");
        match guard.get(&(rule_id.to_string(), environment)) {
            None => Err(ConfigError::NotFound {
                rule_id: rule_id.to_string(),
                environment,
            }),
            Some(def) if !def.active => Err(ConfigError::Inactive {
                rule_id: rule_id.to_string(),
                environment,
            }),
            Some(def) => Ok(def.clone()),
        }
    }

    /// All active rules for an environment, sorted by rule id for
    /// deterministic run order.
    pub fn list_active(&self, environment: Environment) -> Vec<RuleDefinition> {
        let guard = self.rules.read().expect("rules lock poisoned");
        let mut rules: Vec<RuleDefinition> = guard
            .values()
            .filter(|d| d.environment == environment && d.active)
            .cloned()
            .collect();
        rules.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
        rules
    }

    /// Insert or replace a rule. An existing entry keeps its `created_at`;
    /// `updated_at` is always stamped to now.
    pub fn upsert_rule(&self, mut def: RuleDefinition) {
        let mut guard = self.rules.write().expect("rules lock poisoned");
        let key = def.key();
        if let Some(existing) = guard.get(&key) {
            def.created_at = existing.created_at;
        }
        def.updated_at = Utc::now();
        guard.insert(key, def);
    }

    pub fn remove_rule(&self, rule_id: &str, environment: Environment) -> bool {
        let mut guard = self.rules.write().expect("rules lock poisoned");
        guard.remove(&(rule_id.to_string(), environment)).is_some()
    }

    /// Every rule in every environment, sorted by (rule id, environment).
    pub fn rule_snapshot(&self) -> Vec<RuleDefinition> {
        let guard = self.rules.read().expect("rules lock poisoned");
        let mut rules: Vec<RuleDefinition> = guard.values().cloned().collect();
        rules.sort_by(|a, b| {
            a.rule_id
                .cmp(&b.rule_id)
                .then(a.environment.cmp(&b.environment))
        });
        rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.read().expect("rules lock poisoned").len()
    }

    // ── Alerts ────────────────────────────────────────────────

    /// Resolve an alert by id. Paused alerts are returned too; the caller
    /// decides what paused means (the lifecycle controller short-circuits).
    pub fn get_alert(
        &self,
        alert_id: &str,
        environment: Environment,
    ) -> Result<AlertDefinition, ConfigError> {
        let guard = self.alerts.read().expect("alerts lock poisoned");
        guard
            .get(&(alert_id.to_string(), environment))
            .cloned()
            .ok_or_else(|| ConfigError::AlertNotFound {
                alert_id: alert_id.to_string(),
                environment,
            })
    }

    /// All alerts for an environment (paused included), sorted by alert id.
    pub fn list_alerts(&self, environment: Environment) -> Vec<AlertDefinition> {
        let guard = self.alerts.read().expect("alerts lock poisoned");
        let mut alerts: Vec<AlertDefinition> = guard
            .values()
            .filter(|a| a.environment == environment)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| a.alert_id.cmp(&b.alert_id));
        alerts
    }

    /// Insert or replace an alert, preserving `created_at` like rules.
    pub fn upsert_alert(&self, mut def: AlertDefinition) {
        let mut guard = self.alerts.write().expect("alerts lock poisoned");
        let key = def.key();
        if let Some(existing) = guard.get(&key) {
            def.created_at = existing.created_at;
        }
        def.updated_at = Utc::now();
        guard.insert(key, def);
    }

    pub fn remove_alert(&self, alert_id: &str, environment: Environment) -> bool {
        let mut guard = self.alerts.write().expect("alerts lock poisoned");
        guard.remove(&(alert_id.to_string(), environment)).is_some()
    }

    pub fn alert_snapshot(&self) -> Vec<AlertDefinition> {
        let guard = self.alerts.read().expect("alerts lock poisoned");
        let mut alerts: Vec<AlertDefinition> = guard.values().cloned().collect();
        alerts.sort_by(|a, b| {
            a.alert_id
                .cmp(&b.alert_id)
                .then(a.environment.cmp(&b.environment))
        });
        alerts
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.read().expect("alerts lock poisoned").len()
    }

    // ── Bulk replace (full reload) ────────────────────────────

    /// Swap in a freshly loaded catalog, preserving `created_at` for keys
    /// that already existed so reloads do not churn timestamps.
    pub fn replace_all(&self, rules: Vec<RuleDefinition>, alerts: Vec<AlertDefinition>) {
        {
            let mut guard = self.rules.write().expect("rules lock poisoned");
            let mut fresh = HashMap::with_capacity(rules.len());
            for mut def in rules {
                if let Some(existing) = guard.get(&def.key()) {
                    def.created_at = existing.created_at;
                }
                fresh.insert(def.key(), def);
            }
            *guard = fresh;
        }
        {
            let mut guard = self.alerts.write().expect("alerts lock poisoned");
            let mut fresh = HashMap::with_capacity(alerts.len());
            for mut def in alerts {
                if let Some(existing) = guard.get(&def.key()) {
                    def.created_at = existing.created_at;
                }
                fresh.insert(def.key(), def);
            }
            *guard = fresh;
        }
    }
}

impl Default for RuleConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{EmissionPolicy, FailedAuthParams, RuleParams};
    use argus_core::Severity;

    fn sample_rule(rule_id: &str, environment: Environment, active: bool) -> RuleDefinition {
        let now = Utc::now();
        RuleDefinition {
            rule_id: rule_id.to_string(),
            name: rule_id.to_string(),
            description: None,
            environment,
            severity: Severity::Medium,
            confidence_threshold: 0.0,
            emission: EmissionPolicy::ScoreGates,
            active,
            params: RuleParams::FailedAuth(FailedAuthParams::default()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn get_active_config_distinguishes_missing_from_inactive() {
        let store = RuleConfigStore::new();
        store.upsert_rule(sample_rule("brute-force", Environment::Prod, false));

        let missing = store.get_active_config("nope", Environment::Prod);
        assert!(matches!(missing, Err(ConfigError::NotFound { .. })));

        let inactive = store.get_active_config("brute-force", Environment::Prod);
        assert!(matches!(inactive, Err(ConfigError::Inactive { .. })));

        store.upsert_rule(sample_rule("brute-force", Environment::Prod, true));
        assert!(store.get_active_config("brute-force", Environment::Prod).is_ok());
    }

    #[test]
    fn same_rule_id_differs_per_environment() {
        let store = RuleConfigStore::new();
        store.upsert_rule(sample_rule("exfil", Environment::Prod, true));
        store.upsert_rule(sample_rule("exfil", Environment::Dev, false));

        assert!(store.get_active_config("exfil", Environment::Prod).is_ok());
        assert!(store.get_active_config("exfil", Environment::Dev).is_err());
        assert_eq!(store.rule_count(), 2);
    }

    #[test]
    fn list_active_is_sorted_and_filtered() {
        let store = RuleConfigStore::new();
        store.upsert_rule(sample_rule("zeta", Environment::Prod, true));
        store.upsert_rule(sample_rule("alpha", Environment::Prod, true));
        store.upsert_rule(sample_rule("inactive", Environment::Prod, false));
        store.upsert_rule(sample_rule("other-env", Environment::Dev, true));

        let active = store.list_active(Environment::Prod);
        let ids: Vec<&str> = active.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn upsert_preserves_created_at() {
        let store = RuleConfigStore::new();
        store.upsert_rule(sample_rule("r", Environment::Prod, true));
        let first = &store.rule_snapshot()[0];
        let created = first.created_at;

        let mut updated = sample_rule("r", Environment::Prod, true);
        updated.name = "renamed".to_string();
        store.upsert_rule(updated);

        let after = &store.rule_snapshot()[0];
        assert_eq!(after.created_at, created);
        assert_eq!(after.name, "renamed");
        assert!(after.updated_at >= created);
    }

    #[test]
    fn replace_all_swaps_catalog() {
        let store = RuleConfigStore::new();
        store.upsert_rule(sample_rule("old", Environment::Prod, true));
        store.upsert_rule(sample_rule("kept", Environment::Prod, true));

        store.replace_all(
            vec![sample_rule("kept", Environment::Prod, true), sample_rule("new", Environment::Prod, true)],
            vec![],
        );

        assert!(store.get_active_config("old", Environment::Prod).is_err());
        assert!(store.get_active_config("kept", Environment::Prod).is_ok());
        assert!(store.get_active_config("new", Environment::Prod).is_ok());
    }
}
