//! Tests for catalog schema types.

use super::*;
use crate::definition::{EmissionPolicy, RuleFamily, RuleParams};
use crate::alert::{ComparisonOp, EmptyResultState};
use argus_core::{Environment, Severity};
use chrono::Utc;

const VOLUME_RULE_YAML: &str = r#"
version: 1
kind: Detection
metadata:
  id: storage-exfil
  name: Storage volume exfiltration
  description: Per-entity download volume against a 30 day baseline
  environment: prod
  tags: [exfiltration, storage]
spec:
  family: volume_baseline
  severity: high
  params:
    measure_attribute: bytes
    anomaly_multiplier: 2.5
    min_volume: 1048576
    actions: [download, read]
"#;

const AUTH_RULE_YAML: &str = r#"
version: 1
kind: Detection
metadata:
  id: brute-force
  name: Failed login burst
  environment: prod
spec:
  family: failed_auth
  severity: critical
  confidence_threshold: 0.7
  emission: score_and_confidence
"#;

const ALERT_YAML: &str = r#"
version: 1
kind: Alert
metadata:
  id: weekly-exfil-review
  name: Weekly exfiltration review
  environment: prod
spec:
  source:
    rule_id: storage-exfil
    detection_type: volume_anomaly
  comparison: greater_than
  threshold: 10
  retrigger_seconds: 3600
  notify_on_ok: true
  recipients: [secops@example.com]
"#;

#[test]
fn parse_volume_rule() {
    let doc: DetectionDocument = serde_yaml::from_str(VOLUME_RULE_YAML).unwrap();
    assert_eq!(doc.version, 1);
    assert_eq!(doc.metadata.id, "storage-exfil");
    assert_eq!(doc.metadata.environment, Environment::Prod);
    assert_eq!(doc.spec.family, RuleFamily::VolumeBaseline);
    assert_eq!(doc.spec.severity, Severity::High);
    assert_eq!(doc.spec.emission, EmissionPolicy::ScoreGates);

    let params = doc.spec.parse_params().unwrap();
    match params {
        RuleParams::VolumeBaseline(p) => {
            assert_eq!(p.anomaly_multiplier, 2.5);
            assert_eq!(p.min_volume, 1_048_576.0);
            assert_eq!(p.actions, Some(vec!["download".into(), "read".into()]));
            // Unset knobs keep their defaults.
            assert_eq!(p.lookback_days, 30);
            assert_eq!(p.min_samples, 5);
        }
        other => panic!("expected volume_baseline params, got {:?}", other),
    }
}

#[test]
fn parse_auth_rule_with_defaulted_params() {
    let doc: DetectionDocument = serde_yaml::from_str(AUTH_RULE_YAML).unwrap();
    assert_eq!(doc.spec.family, RuleFamily::FailedAuth);
    assert_eq!(doc.spec.confidence_threshold, 0.7);
    assert_eq!(doc.spec.emission, EmissionPolicy::ScoreAndConfidence);

    // No params block at all: every field defaults.
    let params = doc.spec.parse_params().unwrap();
    match params {
        RuleParams::FailedAuth(p) => {
            assert_eq!(p.window_hours, 1);
            assert_eq!(p.failed_attempts_threshold, 5);
        }
        other => panic!("expected failed_auth params, got {:?}", other),
    }
}

#[test]
fn parse_alert() {
    let doc: AlertDocument = serde_yaml::from_str(ALERT_YAML).unwrap();
    assert_eq!(doc.metadata.id, "weekly-exfil-review");
    assert_eq!(doc.spec.source.rule_id, "storage-exfil");
    assert_eq!(doc.spec.source.detection_type.as_deref(), Some("volume_anomaly"));
    assert_eq!(doc.spec.comparison, ComparisonOp::GreaterThan);
    assert_eq!(doc.spec.threshold, 10.0);
    assert_eq!(doc.spec.period_hours, 168);
    assert_eq!(doc.spec.empty_result_state, EmptyResultState::Unknown);
    assert_eq!(doc.spec.schedule.cron, "0 0 10 1/7 * ?");
    assert!(doc.spec.notify_on_ok);
}

#[test]
fn envelope_dispatches_by_kind() {
    let envelope: CatalogEnvelope = serde_yaml::from_str(ALERT_YAML).unwrap();
    assert_eq!(envelope.document_kind().unwrap(), DocumentKind::Alert);

    let doc = envelope.parse_full().unwrap();
    assert_eq!(doc.kind(), DocumentKind::Alert);
    assert_eq!(doc.metadata().id, "weekly-exfil-review");
    assert!(doc.as_alert().is_some());
    assert!(doc.as_detection().is_none());
}

#[test]
fn unknown_kind_errors() {
    let yaml = r#"
version: 1
kind: Playbook
metadata:
  id: x
  name: x
  environment: dev
spec: {}
"#;
    let envelope: CatalogEnvelope = serde_yaml::from_str(yaml).unwrap();
    let err = envelope.parse_full().unwrap_err();
    assert!(err.contains("unknown document kind"), "got: {}", err);
}

#[test]
fn unknown_metadata_field_errors() {
    let yaml = r#"
version: 1
kind: Detection
metadata:
  id: x
  name: x
  environment: dev
  owner: someone
spec:
  family: failed_auth
"#;
    let res: Result<DetectionDocument, _> = serde_yaml::from_str(yaml);
    assert!(res.is_err());
}

#[test]
fn resolve_detection_into_definition() {
    let doc: DetectionDocument = serde_yaml::from_str(VOLUME_RULE_YAML).unwrap();
    let def = doc.resolve(Utc::now()).unwrap();
    assert_eq!(def.rule_id, "storage-exfil");
    assert_eq!(def.environment, Environment::Prod);
    assert_eq!(def.severity, Severity::High);
    assert!(def.active);
    assert_eq!(def.family(), RuleFamily::VolumeBaseline);
    assert_eq!(def.window_hours(), 24);
}

#[test]
fn resolve_alert_maps_inactive_to_paused() {
    let yaml = ALERT_YAML.replace("environment: prod", "environment: prod\n  active: false");
    let doc: AlertDocument = serde_yaml::from_str(&yaml).unwrap();
    let def = doc.resolve(Utc::now());
    assert!(def.paused);
    assert_eq!(def.retrigger_seconds, 3600);
}

#[test]
fn round_trip() {
    let doc: DetectionDocument = serde_yaml::from_str(VOLUME_RULE_YAML).unwrap();
    let yaml = serde_yaml::to_string(&doc).unwrap();
    let doc2: DetectionDocument = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(doc, doc2);
}
