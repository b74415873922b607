//! Detection rule validation: shared fields and family-specific params.

use crate::definition::{RuleDefinition, RuleParams};

use super::ValidationResult;

pub(super) fn validate_common(rule: &RuleDefinition, result: &mut ValidationResult) {
    if rule.rule_id.trim().is_empty() {
        result.error("metadata.id", "rule id must not be empty");
    }
    if rule.name.trim().is_empty() {
        result.error("metadata.name", "rule name must not be empty");
    }
    if !(0.0..=1.0).contains(&rule.confidence_threshold) {
        result.error(
            "spec.confidence_threshold",
            format!(
                "must be in [0, 1], got {}",
                rule.confidence_threshold
            ),
        );
    }
    if rule.window_hours() == 0 {
        result.error("spec.params.window_hours", "must be at least 1");
    }
    if let Some(actions) = rule.params.actions() {
        if actions.is_empty() {
            result.warn(
                "spec.params.actions",
                "empty action list matches no events; omit the field to match all",
            );
        }
    }
}

pub(super) fn validate_params(rule: &RuleDefinition, result: &mut ValidationResult) {
    match &rule.params {
        RuleParams::VolumeBaseline(p) => {
            if p.lookback_days == 0 {
                result.error("spec.params.lookback_days", "must be at least 1");
            } else if u64::from(p.lookback_days) * 24 < u64::from(p.window_hours) {
                result.error(
                    "spec.params.lookback_days",
                    "baseline lookback must cover at least one evaluation window",
                );
            }
            if p.min_samples == 0 {
                result.error("spec.params.min_samples", "must be at least 1");
            } else if p.min_samples < 3 {
                result.warn(
                    "spec.params.min_samples",
                    "fewer than 3 baseline days makes stddev unreliable",
                );
            }
            if p.measure_attribute.trim().is_empty() {
                result.error("spec.params.measure_attribute", "must not be empty");
            }
            for (name, value) in [
                ("anomaly_multiplier", p.anomaly_multiplier),
                ("frequency_factor", p.frequency_factor),
                ("size_factor", p.size_factor),
                ("volume_weight", p.volume_weight),
                ("frequency_weight", p.frequency_weight),
                ("size_weight", p.size_weight),
            ] {
                if !value.is_finite() || value <= 0.0 {
                    result.error(
                        format!("spec.params.{}", name),
                        format!("must be a positive number, got {}", value),
                    );
                }
            }
            if !p.score_threshold.is_finite() || p.score_threshold < 0.0 {
                result.error(
                    "spec.params.score_threshold",
                    format!("must be a non-negative number, got {}", p.score_threshold),
                );
            } else if p.score_threshold == 0.0 {
                result.warn(
                    "spec.params.score_threshold",
                    "a zero threshold emits a record for every scored entity",
                );
            }
            if !p.min_volume.is_finite() || p.min_volume < 0.0 {
                result.error(
                    "spec.params.min_volume",
                    format!("must be a non-negative number, got {}", p.min_volume),
                );
            }
        }
        RuleParams::FailedAuth(p) => {
            if p.failed_attempts_threshold == 0 {
                result.error("spec.params.failed_attempts_threshold", "must be at least 1");
            }
        }
        RuleParams::PrivilegeEscalation(p) => {
            if !p.min_escalation_score.is_finite() || p.min_escalation_score < 0.0 {
                result.error(
                    "spec.params.min_escalation_score",
                    format!(
                        "must be a non-negative number, got {}",
                        p.min_escalation_score
                    ),
                );
            } else if p.min_escalation_score == 0.0 {
                result.warn(
                    "spec.params.min_escalation_score",
                    "a zero floor emits a record for every classified grant",
                );
            }
        }
    }
}
