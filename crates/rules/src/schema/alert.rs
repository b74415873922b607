//! Alert document: the YAML form of an alert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertDefinition, AlertSchedule, ComparisonOp, DetectionScope, EmptyResultState};

use super::DocumentMetadata;

/// Top-level alert document parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AlertDocument {
    pub version: u32,
    pub kind: String,
    pub metadata: DocumentMetadata,
    pub spec: AlertSpec,
}

/// Alert spec: scope, condition, schedule, and notification knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AlertSpec {
    pub source: DetectionScope,
    #[serde(default = "default_period_hours")]
    pub period_hours: u32,
    pub comparison: ComparisonOp,
    pub threshold: f64,
    #[serde(default)]
    pub schedule: AlertSchedule,
    #[serde(default)]
    pub retrigger_seconds: u64,
    #[serde(default)]
    pub empty_result_state: EmptyResultState,
    #[serde(default)]
    pub notify_on_ok: bool,
    #[serde(default)]
    pub recipients: Vec<String>,
}

// One week.
fn default_period_hours() -> u32 {
    168
}

impl AlertDocument {
    /// Resolve the document into the runtime [`AlertDefinition`] form.
    ///
    /// `metadata.active: false` loads the alert in paused state.
    pub fn resolve(&self, now: DateTime<Utc>) -> AlertDefinition {
        AlertDefinition {
            alert_id: self.metadata.id.clone(),
            display_name: self.metadata.name.clone(),
            environment: self.metadata.environment,
            source: self.spec.source.clone(),
            period_hours: self.spec.period_hours,
            comparison: self.spec.comparison,
            threshold: self.spec.threshold,
            schedule: self.spec.schedule.clone(),
            retrigger_seconds: self.spec.retrigger_seconds,
            empty_result_state: self.spec.empty_result_state,
            notify_on_ok: self.spec.notify_on_ok,
            paused: !self.metadata.active,
            recipients: self.spec.recipients.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}
