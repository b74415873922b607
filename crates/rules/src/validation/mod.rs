//! Catalog validation with structured errors and warnings.
//!
//! Validates resolved rule and alert definitions: parameter ranges, cron
//! schedules, recipients, and cross-references between alerts and rules.
//! Returns a [`ValidationResult`] with errors (block load) and warnings
//! (advisory, logged).

mod alert_checks;
mod rule_checks;
mod schedule_checks;

use serde::{Deserialize, Serialize};

use crate::alert::AlertDefinition;
use crate::definition::RuleDefinition;
use crate::store::RuleConfigStore;

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"spec.params.anomaly_multiplier"`.
    pub path: String,
    pub message: String,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Fold another result into this one, prefixing its paths.
    pub(crate) fn merge(&mut self, prefix: &str, other: ValidationResult) {
        for e in other.errors {
            self.error(format!("{}.{}", prefix, e.path), e.message);
        }
        for w in other.warnings {
            self.warn(format!("{}.{}", prefix, w.path), w.message);
        }
    }

    /// One-line summary of all errors, for log and error messages.
    pub fn describe_errors(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a resolved [`RuleDefinition`].
pub fn validate_rule(rule: &RuleDefinition) -> ValidationResult {
    let mut result = ValidationResult::new();
    rule_checks::validate_common(rule, &mut result);
    rule_checks::validate_params(rule, &mut result);
    result
}

/// Validate a resolved [`AlertDefinition`].
pub fn validate_alert(alert: &AlertDefinition) -> ValidationResult {
    let mut result = ValidationResult::new();
    alert_checks::validate_condition(alert, &mut result);
    alert_checks::validate_recipients(alert, &mut result);
    schedule_checks::validate_schedule(&alert.schedule, &mut result);
    result
}

/// Validate a whole loaded catalog, including cross-references.
///
/// Per-definition paths are prefixed with `rule '<id>' (<env>)` /
/// `alert '<id>' (<env>)` so a single report covers the catalog.
pub fn validate_catalog(store: &RuleConfigStore) -> ValidationResult {
    let mut result = ValidationResult::new();
    let rules = store.rule_snapshot();
    let alerts = store.alert_snapshot();

    for rule in &rules {
        let prefix = format!("rule '{}' ({})", rule.rule_id, rule.environment);
        result.merge(&prefix, validate_rule(rule));
    }

    for alert in &alerts {
        let prefix = format!("alert '{}' ({})", alert.alert_id, alert.environment);
        result.merge(&prefix, validate_alert(alert));

        // An alert pointing at a rule that does not exist in its environment
        // will only ever see empty aggregates.
        let has_source = rules.iter().any(|r| {
            r.rule_id == alert.source.rule_id && r.environment == alert.environment
        });
        if !has_source {
            result.warn(
                format!("{}.source.rule_id", prefix),
                format!(
                    "references rule '{}' which is not in the catalog for this environment",
                    alert.source.rule_id
                ),
            );
        }
    }

    result
}
