use argus_core::{EntityKind, Environment, EvalWindow, FieldValue, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Categorical label on every detection record. Statistical branches,
/// the privilege tiers, and the failed-auth split share one namespace
/// so alert scopes can filter any of them by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    VolumeAnomaly,
    FrequencyAnomaly,
    SizeAnomaly,
    RoleManagement,
    AdminPrivilege,
    WritePermission,
    GroupMembership,
    UserBased,
    IpBased,
}

impl DetectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionType::VolumeAnomaly => "volume_anomaly",
            DetectionType::FrequencyAnomaly => "frequency_anomaly",
            DetectionType::SizeAnomaly => "size_anomaly",
            DetectionType::RoleManagement => "role_management",
            DetectionType::AdminPrivilege => "admin_privilege",
            DetectionType::WritePermission => "write_permission",
            DetectionType::GroupMembership => "group_membership",
            DetectionType::UserBased => "user_based",
            DetectionType::IpBased => "ip_based",
        }
    }
}

impl std::fmt::Display for DetectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scored detection for one entity in one window.
///
/// `detected_at` always equals `window_end`, never the wall clock, so
/// re-running the same window under the same configuration reproduces
/// byte-identical records (safe to upsert keyed by rule, entity, and
/// window).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionRecord {
    pub rule_id: String,
    pub environment: Environment,
    pub severity: Severity,
    pub detection_type: DetectionType,
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub anomaly_score: f64,
    pub confidence: f64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub detected_at: DateTime<Utc>,
    pub event_count: u64,
    pub failed_count: u64,
    pub total_value: f64,
    pub max_single: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Branch-specific evidence, sorted by key so serialized records
    /// are stable across runs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, FieldValue>,
}

impl DetectionRecord {
    /// True when `detected_at` falls inside `window` (half-open).
    pub fn within(&self, window: &EvalWindow) -> bool {
        window.contains(self.detected_at)
    }
}
