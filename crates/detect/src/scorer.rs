//! The scoring cascade. Pure: aggregates and baselines in, records
//! out. No clock reads, no I/O, so identical inputs always produce
//! identical record sets.

use argus_core::{EntityKind, EvalWindow, FieldValue};
use argus_rules::{EmissionPolicy, RuleDefinition, RuleParams, VolumeBaselineParams};
use std::collections::BTreeMap;

use crate::aggregate::EntityAggregate;
use crate::baseline::Baseline;
use crate::privilege::classify_escalation;
use crate::record::{DetectionRecord, DetectionType};

/// Map a branch score into a confidence band. Bands are identical
/// across rule families so downstream alerts can compare records.
pub fn confidence_from_score(score: f64) -> f64 {
    if score >= 5.0 {
        0.95
    } else if score >= 3.0 {
        0.85
    } else if score >= 2.0 {
        0.75
    } else {
        0.65
    }
}

/// Map a failed-attempt count into a confidence band. Callers only
/// reach this at or above the rule threshold, so the lowest band covers
/// everything up to 6 attempts.
pub fn confidence_from_attempts(failed_count: u64) -> f64 {
    if failed_count > 20 {
        0.95
    } else if failed_count >= 11 {
        0.85
    } else if failed_count >= 7 {
        0.75
    } else {
        0.6
    }
}

/// Score every aggregated entity against the rule. Records come out
/// sorted by entity id. Entities without a baseline are skipped where
/// the family needs one; that is a gap in history, not an error.
pub fn score_rule(
    rule: &RuleDefinition,
    window: &EvalWindow,
    aggregates: &BTreeMap<String, EntityAggregate>,
    baselines: &BTreeMap<String, Baseline>,
) -> Vec<DetectionRecord> {
    match &rule.params {
        RuleParams::VolumeBaseline(params) => {
            score_statistical(rule, params, window, aggregates, baselines)
        }
        RuleParams::FailedAuth(params) => {
            let mut records = Vec::new();
            for agg in aggregates.values() {
                if agg.failed_count < params.failed_attempts_threshold {
                    continue;
                }
                let score = agg.failed_count as f64 / params.failed_attempts_threshold as f64;
                let confidence = confidence_from_attempts(agg.failed_count);
                if !emission_allows(rule, confidence) {
                    continue;
                }
                let detection_type = match agg.entity_kind {
                    EntityKind::SourceIp => DetectionType::IpBased,
                    _ => DetectionType::UserBased,
                };
                let mut details = BTreeMap::new();
                details.insert(
                    "failed_attempts".to_string(),
                    FieldValue::from(agg.failed_count as i64),
                );
                details.insert(
                    "threshold".to_string(),
                    FieldValue::from(params.failed_attempts_threshold as i64),
                );
                records.push(build_record(
                    rule,
                    window,
                    agg,
                    detection_type,
                    score,
                    confidence,
                    details,
                ));
            }
            records
        }
        RuleParams::PrivilegeEscalation(params) => {
            let mut records = Vec::new();
            for agg in aggregates.values() {
                let best = agg
                    .escalations
                    .iter()
                    .filter_map(|e| {
                        classify_escalation(&e.action, e.permission.as_deref())
                            .map(|(kind, score)| (kind, score, e))
                    })
                    .max_by(|a, b| a.1.total_cmp(&b.1));
                let Some((detection_type, score, event)) = best else {
                    continue;
                };
                if score < params.min_escalation_score {
                    continue;
                }
                let confidence = confidence_from_score(score);
                if !emission_allows(rule, confidence) {
                    continue;
                }
                let mut details = BTreeMap::new();
                details.insert("action".to_string(), FieldValue::from(event.action.as_str()));
                if let Some(permission) = &event.permission {
                    details.insert(
                        "permission".to_string(),
                        FieldValue::from(permission.as_str()),
                    );
                }
                records.push(build_record(
                    rule,
                    window,
                    agg,
                    detection_type,
                    score,
                    confidence,
                    details,
                ));
            }
            records
        }
    }
}

fn score_statistical(
    rule: &RuleDefinition,
    params: &VolumeBaselineParams,
    window: &EvalWindow,
    aggregates: &BTreeMap<String, EntityAggregate>,
    baselines: &BTreeMap<String, Baseline>,
) -> Vec<DetectionRecord> {
    let window_days = window.duration_days();
    let mut records = Vec::new();
    for (entity_id, agg) in aggregates {
        // Cheap early rejection before any baseline lookup.
        if agg.total_value < params.min_volume {
            continue;
        }
        let Some(baseline) = baselines.get(entity_id) else {
            continue;
        };
        let Some((detection_type, score, details)) =
            statistical_branch(params, window_days, agg, baseline)
        else {
            continue;
        };
        if score < params.score_threshold {
            continue;
        }
        let confidence = confidence_from_score(score);
        if !emission_allows(rule, confidence) {
            continue;
        }
        records.push(build_record(
            rule,
            window,
            agg,
            detection_type,
            score,
            confidence,
            details,
        ));
    }
    records
}

/// The ordered cascade. First matching branch wins even when a later
/// branch would score higher; ties break by declaration order, not
/// magnitude. A zero or missing denominator skips its branch instead of
/// producing inf or NaN.
fn statistical_branch(
    params: &VolumeBaselineParams,
    window_days: f64,
    agg: &EntityAggregate,
    baseline: &Baseline,
) -> Option<(DetectionType, f64, BTreeMap<String, FieldValue>)> {
    if baseline.max > 0.0 {
        let ratio = agg.total_value / baseline.max;
        if ratio > params.anomaly_multiplier {
            let mut details = BTreeMap::new();
            details.insert("baseline_max".to_string(), FieldValue::from(baseline.max));
            details.insert("ratio".to_string(), FieldValue::from(ratio));
            return Some((
                DetectionType::VolumeAnomaly,
                ratio * params.volume_weight,
                details,
            ));
        }
    }

    if baseline.mean_daily_events > 0.0 && window_days > 0.0 {
        let rate = agg.event_count as f64 / window_days;
        let ratio = rate / baseline.mean_daily_events;
        if ratio > params.frequency_factor {
            let mut details = BTreeMap::new();
            details.insert(
                "baseline_daily_events".to_string(),
                FieldValue::from(baseline.mean_daily_events),
            );
            details.insert("window_rate".to_string(), FieldValue::from(rate));
            return Some((
                DetectionType::FrequencyAnomaly,
                ratio * params.frequency_weight,
                details,
            ));
        }
    }

    if baseline.p95 > 0.0 {
        let ratio = agg.max_single / baseline.p95;
        if ratio > params.size_factor {
            let mut details = BTreeMap::new();
            details.insert("baseline_p95".to_string(), FieldValue::from(baseline.p95));
            details.insert("ratio".to_string(), FieldValue::from(ratio));
            return Some((
                DetectionType::SizeAnomaly,
                ratio * params.size_weight,
                details,
            ));
        }
    }

    None
}

fn emission_allows(rule: &RuleDefinition, confidence: f64) -> bool {
    match rule.emission {
        EmissionPolicy::ScoreGates => true,
        EmissionPolicy::ScoreAndConfidence => confidence >= rule.confidence_threshold,
    }
}

fn build_record(
    rule: &RuleDefinition,
    window: &EvalWindow,
    agg: &EntityAggregate,
    detection_type: DetectionType,
    anomaly_score: f64,
    confidence: f64,
    details: BTreeMap<String, FieldValue>,
) -> DetectionRecord {
    DetectionRecord {
        rule_id: rule.rule_id.clone(),
        environment: rule.environment,
        severity: rule.severity,
        detection_type,
        entity_id: agg.entity_id.clone(),
        entity_kind: agg.entity_kind,
        anomaly_score,
        confidence,
        window_start: window.start,
        window_end: window.end,
        detected_at: window.end,
        event_count: agg.event_count,
        failed_count: agg.failed_count,
        total_value: agg.total_value,
        max_single: agg.max_single,
        first_seen: agg.first_seen,
        last_seen: agg.last_seen,
        details,
    }
}
