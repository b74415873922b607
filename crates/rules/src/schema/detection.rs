//! Detection document: the YAML form of a detection rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use argus_core::Severity;

use crate::definition::{
    EmissionPolicy, FailedAuthParams, PrivilegeEscalationParams, RuleDefinition, RuleFamily,
    RuleParams, VolumeBaselineParams,
};

use super::DocumentMetadata;

/// Top-level detection rule document parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DetectionDocument {
    pub version: u32,
    pub kind: String,
    pub metadata: DocumentMetadata,
    pub spec: DetectionSpec,
}

/// Detection rule spec: family selection plus family-specific params.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DetectionSpec {
    pub family: RuleFamily,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub confidence_threshold: f64,
    #[serde(default)]
    pub emission: EmissionPolicy,
    /// Family-specific parameters; omitted means all defaults.
    #[serde(default)]
    pub params: Option<serde_yaml::Value>,
}

fn default_severity() -> Severity {
    Severity::Medium
}

impl DetectionSpec {
    /// Parse family-specific parameters from the raw `params` field.
    pub fn parse_params(&self) -> std::result::Result<RuleParams, String> {
        let raw = self
            .params
            .clone()
            .unwrap_or_else(|| serde_yaml::Value::Mapping(Default::default()));
        match self.family {
            RuleFamily::VolumeBaseline => {
                let p: VolumeBaselineParams =
                    serde_yaml::from_value(raw).map_err(|e| e.to_string())?;
                Ok(RuleParams::VolumeBaseline(p))
            }
            RuleFamily::FailedAuth => {
                let p: FailedAuthParams = serde_yaml::from_value(raw).map_err(|e| e.to_string())?;
                Ok(RuleParams::FailedAuth(p))
            }
            RuleFamily::PrivilegeEscalation => {
                let p: PrivilegeEscalationParams =
                    serde_yaml::from_value(raw).map_err(|e| e.to_string())?;
                Ok(RuleParams::PrivilegeEscalation(p))
            }
        }
    }
}

impl DetectionDocument {
    /// Resolve the document into the runtime [`RuleDefinition`] form.
    pub fn resolve(&self, now: DateTime<Utc>) -> std::result::Result<RuleDefinition, String> {
        let params = self
            .spec
            .parse_params()
            .map_err(|e| format!("invalid params for rule '{}': {}", self.metadata.id, e))?;
        Ok(RuleDefinition {
            rule_id: self.metadata.id.clone(),
            name: self.metadata.name.clone(),
            description: self.metadata.description.clone(),
            environment: self.metadata.environment,
            severity: self.spec.severity,
            confidence_threshold: self.spec.confidence_threshold,
            emission: self.spec.emission,
            active: self.metadata.active,
            params,
            created_at: now,
            updated_at: now,
        })
    }
}
