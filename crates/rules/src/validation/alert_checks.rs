//! Alert validation: condition shape and recipient addresses.

use crate::alert::AlertDefinition;

use super::ValidationResult;

pub(super) fn validate_condition(alert: &AlertDefinition, result: &mut ValidationResult) {
    if alert.alert_id.trim().is_empty() {
        result.error("metadata.id", "alert id must not be empty");
    }
    if alert.source.rule_id.trim().is_empty() {
        result.error("spec.source.rule_id", "must not be empty");
    }
    if let Some(dt) = &alert.source.detection_type {
        if dt.trim().is_empty() {
            result.error(
                "spec.source.detection_type",
                "must not be empty; omit the field to match all detection types",
            );
        }
    }
    if alert.period_hours == 0 {
        result.error("spec.period_hours", "must be at least 1");
    }
    if !alert.threshold.is_finite() {
        result.error(
            "spec.threshold",
            format!("must be a finite number, got {}", alert.threshold),
        );
    }
}

pub(super) fn validate_recipients(alert: &AlertDefinition, result: &mut ValidationResult) {
    if alert.recipients.is_empty() {
        result.warn(
            "spec.recipients",
            "no recipients configured; delivery relies on a webhook channel",
        );
    }
    for (i, recipient) in alert.recipients.iter().enumerate() {
        // Just enough checking to catch swapped or truncated addresses.
        let looks_like_email = recipient.contains('@')
            && !recipient.starts_with('@')
            && !recipient.ends_with('@')
            && !recipient.contains(char::is_whitespace);
        if !looks_like_email {
            result.error(
                format!("spec.recipients[{}]", i),
                format!("'{}' is not a valid email address", recipient),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::validate_alert;
    use crate::alert::{
        AlertDefinition, AlertSchedule, ComparisonOp, DetectionScope, EmptyResultState,
    };
    use argus_core::Environment;
    use chrono::Utc;

    fn sample_alert() -> AlertDefinition {
        let now = Utc::now();
        AlertDefinition {
            alert_id: "a".into(),
            display_name: "a".into(),
            environment: Environment::Prod,
            source: DetectionScope {
                rule_id: "r".into(),
                detection_type: None,
            },
            period_hours: 168,
            comparison: ComparisonOp::GreaterThan,
            threshold: 10.0,
            schedule: AlertSchedule::default(),
            retrigger_seconds: 0,
            empty_result_state: EmptyResultState::Unknown,
            notify_on_ok: false,
            paused: false,
            recipients: vec!["secops@example.com".into()],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn valid_alert_passes() {
        let report = validate_alert(&sample_alert());
        assert!(report.valid, "{}", report.describe_errors());
    }

    #[test]
    fn bad_recipient_is_an_error() {
        let mut alert = sample_alert();
        alert.recipients.push("not-an-address".into());
        let report = validate_alert(&alert);
        assert!(!report.valid);
        assert!(report.describe_errors().contains("recipients[1]"));
    }

    #[test]
    fn empty_recipients_warns_only() {
        let mut alert = sample_alert();
        alert.recipients.clear();
        let report = validate_alert(&alert);
        assert!(report.valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn nan_threshold_is_an_error() {
        let mut alert = sample_alert();
        alert.threshold = f64::NAN;
        let report = validate_alert(&alert);
        assert!(!report.valid);
    }

    #[test]
    fn bad_cron_is_an_error() {
        let mut alert = sample_alert();
        alert.schedule.cron = "every tuesday".into();
        let report = validate_alert(&alert);
        assert!(!report.valid);
        assert!(report.describe_errors().contains("schedule.cron"));
    }
}
