//! Runtime rule configuration: the resolved form a detection rule takes after
//! catalog loading, keyed by (rule_id, environment).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use argus_core::{Environment, Severity};

/// A fully resolved detection rule.
///
/// Catalog documents are parsed and validated into this shape; everything
/// downstream (scoring, alerting, the CLI) works from it and never re-reads
/// YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleDefinition {
    pub rule_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub environment: Environment,
    pub severity: Severity,
    /// Detections scoring below this confidence are dropped when the rule's
    /// emission policy says confidence gates.
    #[serde(default)]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub emission: EmissionPolicy,
    #[serde(default = "default_true")]
    pub active: bool,
    pub params: RuleParams,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn default_true() -> bool {
    true
}

impl RuleDefinition {
    pub fn key(&self) -> (String, Environment) {
        (self.rule_id.clone(), self.environment)
    }

    pub fn family(&self) -> RuleFamily {
        self.params.family()
    }

    pub fn window_hours(&self) -> u32 {
        self.params.window_hours()
    }
}

/// Which thresholds gate a detection record before it is emitted.
///
/// `ScoreGates` is the default: the family score threshold alone decides, and
/// confidence merely annotates the record. `ScoreAndConfidence` additionally
/// requires `confidence >= confidence_threshold`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionPolicy {
    #[default]
    ScoreGates,
    ScoreAndConfidence,
}

/// Detection rule families supported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    VolumeBaseline,
    FailedAuth,
    PrivilegeEscalation,
}

impl std::fmt::Display for RuleFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleFamily::VolumeBaseline => write!(f, "volume_baseline"),
            RuleFamily::FailedAuth => write!(f, "failed_auth"),
            RuleFamily::PrivilegeEscalation => write!(f, "privilege_escalation"),
        }
    }
}

/// Family-specific tuning knobs, already parsed into the right shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuleParams {
    VolumeBaseline(VolumeBaselineParams),
    FailedAuth(FailedAuthParams),
    PrivilegeEscalation(PrivilegeEscalationParams),
}

impl RuleParams {
    pub fn family(&self) -> RuleFamily {
        match self {
            RuleParams::VolumeBaseline(_) => RuleFamily::VolumeBaseline,
            RuleParams::FailedAuth(_) => RuleFamily::FailedAuth,
            RuleParams::PrivilegeEscalation(_) => RuleFamily::PrivilegeEscalation,
        }
    }

    pub fn window_hours(&self) -> u32 {
        match self {
            RuleParams::VolumeBaseline(p) => p.window_hours,
            RuleParams::FailedAuth(p) => p.window_hours,
            RuleParams::PrivilegeEscalation(p) => p.window_hours,
        }
    }

    /// Action names the rule restricts itself to, if any.
    pub fn actions(&self) -> Option<&[String]> {
        match self {
            RuleParams::VolumeBaseline(p) => p.actions.as_deref(),
            RuleParams::FailedAuth(p) => p.actions.as_deref(),
            RuleParams::PrivilegeEscalation(p) => p.actions.as_deref(),
        }
    }
}

// ── Family parameters ────────────────────────────────────────────────

/// Parameters for the `volume_baseline` family (statistical cascade over a
/// per-entity historical baseline).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeBaselineParams {
    #[serde(default = "default_stat_window_hours")]
    pub window_hours: u32,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Entities with fewer active baseline days than this are skipped.
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Event attribute that carries the measured quantity.
    #[serde(default = "default_measure_attribute")]
    pub measure_attribute: String,
    #[serde(default = "default_anomaly_multiplier")]
    pub anomaly_multiplier: f64,
    #[serde(default = "default_frequency_factor")]
    pub frequency_factor: f64,
    #[serde(default = "default_size_factor")]
    pub size_factor: f64,
    #[serde(default = "default_weight")]
    pub volume_weight: f64,
    #[serde(default = "default_weight")]
    pub frequency_weight: f64,
    #[serde(default = "default_weight")]
    pub size_weight: f64,
    /// Entities whose window total falls below this never score.
    #[serde(default)]
    pub min_volume: f64,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
    #[serde(default)]
    pub actions: Option<Vec<String>>,
    /// Unknown keys are preserved so newer catalogs load on older engines.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Default for VolumeBaselineParams {
    fn default() -> Self {
        Self {
            window_hours: default_stat_window_hours(),
            lookback_days: default_lookback_days(),
            min_samples: default_min_samples(),
            measure_attribute: default_measure_attribute(),
            anomaly_multiplier: default_anomaly_multiplier(),
            frequency_factor: default_frequency_factor(),
            size_factor: default_size_factor(),
            volume_weight: default_weight(),
            frequency_weight: default_weight(),
            size_weight: default_weight(),
            min_volume: 0.0,
            score_threshold: default_score_threshold(),
            actions: None,
            extra: IndexMap::new(),
        }
    }
}

/// Parameters for the `failed_auth` family (failed authentication counting).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FailedAuthParams {
    #[serde(default = "default_auth_window_hours")]
    pub window_hours: u32,
    #[serde(default = "default_failed_attempts_threshold")]
    pub failed_attempts_threshold: u64,
    #[serde(default = "default_auth_actions")]
    pub actions: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Default for FailedAuthParams {
    fn default() -> Self {
        Self {
            window_hours: default_auth_window_hours(),
            failed_attempts_threshold: default_failed_attempts_threshold(),
            actions: default_auth_actions(),
            extra: IndexMap::new(),
        }
    }
}

/// Parameters for the `privilege_escalation` family (categorical grant scoring).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrivilegeEscalationParams {
    #[serde(default = "default_stat_window_hours")]
    pub window_hours: u32,
    #[serde(default = "default_min_escalation_score")]
    pub min_escalation_score: f64,
    #[serde(default)]
    pub actions: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Default for PrivilegeEscalationParams {
    fn default() -> Self {
        Self {
            window_hours: default_stat_window_hours(),
            min_escalation_score: default_min_escalation_score(),
            actions: None,
            extra: IndexMap::new(),
        }
    }
}

fn default_stat_window_hours() -> u32 {
    24
}

fn default_lookback_days() -> u32 {
    30
}

fn default_min_samples() -> usize {
    5
}

fn default_measure_attribute() -> String {
    "bytes".to_string()
}

fn default_anomaly_multiplier() -> f64 {
    2.0
}

fn default_frequency_factor() -> f64 {
    4.0
}

fn default_size_factor() -> f64 {
    3.0
}

fn default_weight() -> f64 {
    1.0
}

fn default_score_threshold() -> f64 {
    2.0
}

fn default_auth_window_hours() -> u32 {
    1
}

fn default_failed_attempts_threshold() -> u64 {
    5
}

fn default_auth_actions() -> Option<Vec<String>> {
    Some(vec!["login".to_string()])
}

fn default_min_escalation_score() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_params_fill_defaults_from_empty_yaml() {
        let p: VolumeBaselineParams = serde_yaml::from_str("{}").unwrap();
        assert_eq!(p.window_hours, 24);
        assert_eq!(p.lookback_days, 30);
        assert_eq!(p.min_samples, 5);
        assert_eq!(p.measure_attribute, "bytes");
        assert_eq!(p.anomaly_multiplier, 2.0);
        assert_eq!(p.frequency_factor, 4.0);
        assert_eq!(p.size_factor, 3.0);
        assert_eq!(p.score_threshold, 2.0);
        assert_eq!(p.min_volume, 0.0);
        assert!(p.actions.is_none());
        assert!(p.extra.is_empty());
    }

    #[test]
    fn failed_auth_params_default_to_login_action() {
        let p: FailedAuthParams = serde_yaml::from_str("{}").unwrap();
        assert_eq!(p.window_hours, 1);
        assert_eq!(p.failed_attempts_threshold, 5);
        assert_eq!(p.actions, Some(vec!["login".to_string()]));
    }

    #[test]
    fn unknown_param_keys_land_in_extra() {
        let yaml = "window_hours: 12\nburst_limit: 9\nteam: storage\n";
        let p: VolumeBaselineParams = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(p.window_hours, 12);
        assert_eq!(p.extra.len(), 2);
        assert_eq!(
            p.extra.get("burst_limit"),
            Some(&serde_yaml::Value::Number(9.into()))
        );
    }

    #[test]
    fn params_expose_family_and_window() {
        let params = RuleParams::FailedAuth(FailedAuthParams::default());
        assert_eq!(params.family(), RuleFamily::FailedAuth);
        assert_eq!(params.window_hours(), 1);
        assert_eq!(params.actions(), Some(&["login".to_string()][..]));
    }
}
