//! Alert configuration: scheduled conditions evaluated over persisted
//! detections, keyed by (alert_id, environment) like rules are.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use argus_core::Environment;

/// A fully resolved alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertDefinition {
    pub alert_id: String,
    pub display_name: String,
    pub environment: Environment,
    /// Which detections this alert aggregates over.
    pub source: DetectionScope,
    /// Aggregation period ending at evaluation time.
    pub period_hours: u32,
    pub comparison: ComparisonOp,
    pub threshold: f64,
    pub schedule: AlertSchedule,
    /// Minimum seconds between notifications while the condition keeps
    /// holding. Zero means every firing tick notifies.
    pub retrigger_seconds: u64,
    pub empty_result_state: EmptyResultState,
    /// Send a one-shot recovery notification on the Triggered -> Quiet edge.
    pub notify_on_ok: bool,
    pub paused: bool,
    pub recipients: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlertDefinition {
    pub fn key(&self) -> (String, Environment) {
        (self.alert_id.clone(), self.environment)
    }
}

/// Selects detection records by producing rule and, optionally, by the
/// detection type within that rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DetectionScope {
    pub rule_id: String,
    #[serde(default)]
    pub detection_type: Option<String>,
}

/// Comparison between the aggregate value and the alert threshold.
///
/// All comparisons are strict as written: `greater_than` with threshold 10
/// does not fire at exactly 10. Equality is exact, which is safe here because
/// the aggregate is a record count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,
}

impl ComparisonOp {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::GreaterThan => value > threshold,
            ComparisonOp::GreaterThanOrEqual => value >= threshold,
            ComparisonOp::LessThan => value < threshold,
            ComparisonOp::LessThanOrEqual => value <= threshold,
            ComparisonOp::Equal => value == threshold,
            ComparisonOp::NotEqual => value != threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::GreaterThan => "greater_than",
            ComparisonOp::GreaterThanOrEqual => "greater_than_or_equal",
            ComparisonOp::LessThan => "less_than",
            ComparisonOp::LessThanOrEqual => "less_than_or_equal",
            ComparisonOp::Equal => "equal",
            ComparisonOp::NotEqual => "not_equal",
        }
    }
}

impl std::fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cron-based evaluation schedule with timezone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AlertSchedule {
    #[serde(default = "default_cron")]
    pub cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for AlertSchedule {
    fn default() -> Self {
        Self {
            cron: default_cron(),
            timezone: default_timezone(),
        }
    }
}

// Weekly at 10:00 UTC on every 7th day of the month starting from the 1st.
fn default_cron() -> String {
    "0 0 10 1/7 * ?".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// How an evaluation with no detection data at all is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyResultState {
    /// Indeterminate: the firing state machine does not move.
    #[default]
    Unknown,
    /// Treat missing data as the condition not holding.
    Ok,
    /// Treat missing data as the condition holding.
    Triggered,
}
