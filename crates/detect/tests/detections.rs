//! End-to-end evaluation runs against in-memory sources and sinks.

use argus_core::{
    AuditLog, EntityKind, Environment, EventOutcome, FieldValue, Severity,
};
use argus_detect::{
    DetectionStore, DetectionType, MemoryDetectionStore, MemoryEventSource, RuleRunner,
    RunnerConfig,
};
use argus_rules::{
    EmissionPolicy, FailedAuthParams, PrivilegeEscalationParams, RuleConfigStore, RuleDefinition,
    RuleParams, VolumeBaselineParams,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 30, 0, 0, 0).unwrap()
}

fn rule(rule_id: &str, params: RuleParams) -> RuleDefinition {
    RuleDefinition {
        rule_id: rule_id.to_string(),
        name: format!("{rule_id} test"),
        description: None,
        environment: Environment::Dev,
        severity: Severity::High,
        confidence_threshold: 0.0,
        emission: EmissionPolicy::ScoreGates,
        active: true,
        params,
        created_at: now(),
        updated_at: now(),
    }
}

fn export_event(ts: DateTime<Utc>, entity: &str, gb: f64) -> argus_core::Event {
    let mut attributes = std::collections::HashMap::new();
    attributes.insert("bytes".to_string(), FieldValue::from(gb));
    argus_core::Event {
        timestamp: ts,
        source: "audit".to_string(),
        action: "export".to_string(),
        entity_id: entity.to_string(),
        entity_kind: EntityKind::User,
        outcome: EventOutcome::Success,
        attributes,
    }
}

fn login_failure(ts: DateTime<Utc>, ip: &str) -> argus_core::Event {
    argus_core::Event {
        timestamp: ts,
        source: "auth".to_string(),
        action: "login".to_string(),
        entity_id: ip.to_string(),
        entity_kind: EntityKind::SourceIp,
        outcome: EventOutcome::Failure,
        attributes: Default::default(),
    }
}

fn runner(
    store: Arc<RuleConfigStore>,
    events: Vec<argus_core::Event>,
    sink: Arc<MemoryDetectionStore>,
) -> RuleRunner {
    RuleRunner::new(
        store,
        Arc::new(MemoryEventSource::new(events)),
        sink,
        Arc::new(AuditLog::new()),
        RunnerConfig::default(),
    )
}

/// Ten quiet days of history at 1.0 per day, then a 3.5 spike in the
/// evaluation window.
fn spike_scenario() -> Vec<argus_core::Event> {
    let mut events = Vec::new();
    for day in 1..=10 {
        let ts = now() - Duration::days(day) - Duration::hours(2);
        events.push(export_event(ts, "u1", 1.0));
    }
    events.push(export_event(now() - Duration::hours(3), "u1", 2.0));
    events.push(export_event(now() - Duration::hours(2), "u1", 1.5));
    events
}

#[tokio::test]
async fn volume_spike_emits_one_scored_record() {
    let store = Arc::new(RuleConfigStore::new());
    store.upsert_rule(rule(
        "VOL-001",
        RuleParams::VolumeBaseline(VolumeBaselineParams::default()),
    ));
    let sink = Arc::new(MemoryDetectionStore::new());
    let runner = runner(store, spike_scenario(), Arc::clone(&sink));

    let report = runner
        .evaluate("VOL-001", Environment::Dev, now())
        .await
        .unwrap();
    assert_eq!(report.events_seen, 2);
    assert_eq!(report.baselines_computed, 1);
    assert_eq!(report.records_emitted, 1);

    let records = sink.records().unwrap();
    let r = &records[0];
    assert_eq!(r.detection_type, DetectionType::VolumeAnomaly);
    assert_eq!(r.entity_id, "u1");
    // 3.5 current vs historical daily max 1.0.
    assert!((r.anomaly_score - 3.5).abs() < 1e-9);
    assert!((r.confidence - 0.85).abs() < 1e-9);
    assert_eq!(r.detected_at, now());
    assert_eq!(r.window_end, now());
    assert_eq!(r.event_count, 2);
}

#[tokio::test]
async fn current_window_never_contaminates_its_baseline() {
    // Without the exclusion, the 2.0 event inside the window would push
    // the historical max to 2.0 and the ratio under the multiplier.
    let store = Arc::new(RuleConfigStore::new());
    store.upsert_rule(rule(
        "VOL-001",
        RuleParams::VolumeBaseline(VolumeBaselineParams::default()),
    ));
    let sink = Arc::new(MemoryDetectionStore::new());
    let runner = runner(store, spike_scenario(), Arc::clone(&sink));

    runner
        .evaluate("VOL-001", Environment::Dev, now())
        .await
        .unwrap();
    let records = sink.records().unwrap();
    assert_eq!(records.len(), 1);
    assert!((records[0].anomaly_score - 3.5).abs() < 1e-9);
}

#[tokio::test]
async fn thin_history_fails_the_min_sample_gate() {
    let mut params = VolumeBaselineParams::default();
    params.min_samples = 5;
    let store = Arc::new(RuleConfigStore::new());
    store.upsert_rule(rule("VOL-001", RuleParams::VolumeBaseline(params)));

    // Only three active history days, then a huge spike.
    let mut events = Vec::new();
    for day in 1..=3 {
        events.push(export_event(now() - Duration::days(day), "u1", 1.0));
    }
    events.push(export_event(now() - Duration::hours(1), "u1", 100.0));

    let sink = Arc::new(MemoryDetectionStore::new());
    let runner = runner(store, events, Arc::clone(&sink));
    let report = runner
        .evaluate("VOL-001", Environment::Dev, now())
        .await
        .unwrap();

    assert_eq!(report.baselines_computed, 0);
    assert_eq!(report.entities_skipped, 1);
    assert!(sink.records().unwrap().is_empty());
}

#[tokio::test]
async fn rerunning_the_same_window_reproduces_identical_records() {
    let store = Arc::new(RuleConfigStore::new());
    store.upsert_rule(rule(
        "VOL-001",
        RuleParams::VolumeBaseline(VolumeBaselineParams::default()),
    ));
    let sink = Arc::new(MemoryDetectionStore::new());
    let runner = runner(store, spike_scenario(), Arc::clone(&sink));

    runner
        .evaluate("VOL-001", Environment::Dev, now())
        .await
        .unwrap();
    runner
        .evaluate("VOL-001", Environment::Dev, now())
        .await
        .unwrap();

    let records = sink.records().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], records[1]);
    assert_eq!(
        serde_json::to_string(&records[0]).unwrap(),
        serde_json::to_string(&records[1]).unwrap()
    );
}

#[tokio::test]
async fn failed_auth_burst_from_one_ip() {
    let store = Arc::new(RuleConfigStore::new());
    store.upsert_rule(rule(
        "AUTH-002",
        RuleParams::FailedAuth(FailedAuthParams::default()),
    ));

    let mut events = Vec::new();
    for minute in 0..6 {
        events.push(login_failure(
            now() - Duration::minutes(30 - minute),
            "203.0.113.5",
        ));
    }
    // A successful login from another entity stays under threshold.
    let mut ok = login_failure(now() - Duration::minutes(5), "10.0.0.1");
    ok.outcome = EventOutcome::Success;
    events.push(ok);

    let sink = Arc::new(MemoryDetectionStore::new());
    let runner = runner(store, events, Arc::clone(&sink));
    let report = runner
        .evaluate("AUTH-002", Environment::Dev, now())
        .await
        .unwrap();
    assert_eq!(report.records_emitted, 1);

    let records = sink.records().unwrap();
    let r = &records[0];
    assert_eq!(r.detection_type, DetectionType::IpBased);
    assert_eq!(r.entity_id, "203.0.113.5");
    assert_eq!(r.failed_count, 6);
    assert!((r.confidence - 0.6).abs() < 1e-9);
    assert_eq!(
        r.details.get("failed_attempts").and_then(|v| v.as_f64()),
        Some(6.0)
    );
}

#[tokio::test]
async fn privilege_grant_classifies_from_the_action_table() {
    let store = Arc::new(RuleConfigStore::new());
    store.upsert_rule(rule(
        "PRIV-003",
        RuleParams::PrivilegeEscalation(PrivilegeEscalationParams::default()),
    ));

    let mut grant = export_event(now() - Duration::hours(2), "svc-deploy", 0.0);
    grant.action = "grant_permission".to_string();
    grant.entity_kind = EntityKind::ServicePrincipal;
    grant.attributes.insert(
        "permission".to_string(),
        FieldValue::from("projects.owner"),
    );

    let sink = Arc::new(MemoryDetectionStore::new());
    let runner = runner(store, vec![grant], Arc::clone(&sink));
    runner
        .evaluate("PRIV-003", Environment::Dev, now())
        .await
        .unwrap();

    let records = sink.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].detection_type, DetectionType::AdminPrivilege);
    assert!((records[0].anomaly_score - 3.5).abs() < 1e-9);
    assert_eq!(records[0].entity_kind, EntityKind::ServicePrincipal);
}

#[tokio::test]
async fn one_missing_rule_never_aborts_its_siblings() {
    let store = Arc::new(RuleConfigStore::new());
    store.upsert_rule(rule(
        "VOL-001",
        RuleParams::VolumeBaseline(VolumeBaselineParams::default()),
    ));
    store.upsert_rule(rule(
        "PRIV-003",
        RuleParams::PrivilegeEscalation(PrivilegeEscalationParams::default()),
    ));

    let sink = Arc::new(MemoryDetectionStore::new());
    let runner = runner(store, spike_scenario(), Arc::clone(&sink));
    let ids = vec![
        "VOL-001".to_string(),
        "AUTH-002".to_string(),
        "PRIV-003".to_string(),
    ];
    let results = runner.evaluate_rules(&ids, Environment::Dev, now()).await;
    assert_eq!(results.len(), 3);

    assert!(results[0].1.is_ok());
    assert!(matches!(
        results[1].1,
        Err(argus_detect::DetectError::Config(
            argus_rules::ConfigError::NotFound { .. }
        ))
    ));
    assert!(results[2].1.is_ok());

    // The successful sibling still persisted its record.
    assert_eq!(sink.records().unwrap().len(), 1);
}

#[tokio::test]
async fn inactive_rules_are_not_evaluated() {
    let store = Arc::new(RuleConfigStore::new());
    let mut dormant = rule(
        "VOL-001",
        RuleParams::VolumeBaseline(VolumeBaselineParams::default()),
    );
    dormant.active = false;
    store.upsert_rule(dormant);

    let sink = Arc::new(MemoryDetectionStore::new());
    let runner = runner(Arc::clone(&store), spike_scenario(), Arc::clone(&sink));

    let err = runner
        .evaluate("VOL-001", Environment::Dev, now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        argus_detect::DetectError::Config(argus_rules::ConfigError::Inactive { .. })
    ));

    // evaluate_all skips it entirely.
    let results = runner.evaluate_all(Environment::Dev, now()).await;
    assert!(results.is_empty());
}
