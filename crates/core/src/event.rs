use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A normalized security telemetry event.
///
/// Raw records from any source system are mapped onto this shape before the
/// engine sees them. Anything the fixed columns do not cover rides along in
/// `attributes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_source")]
    pub source: String,
    pub action: String,
    pub entity_id: String,
    #[serde(default)]
    pub entity_kind: EntityKind,
    #[serde(default)]
    pub outcome: EventOutcome,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, FieldValue>,
}

fn default_source() -> String {
    "unknown".to_string()
}

impl Event {
    /// Numeric view of an attribute, if present and numeric.
    pub fn attribute_f64(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(FieldValue::as_f64)
    }

    /// String view of an attribute, if present and textual.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(FieldValue::as_str)
    }
}

/// What kind of actor an event is attributed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    #[default]
    User,
    ServicePrincipal,
    SourceIp,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::ServicePrincipal => write!(f, "service_principal"),
            EntityKind::SourceIp => write!(f, "source_ip"),
        }
    }
}

/// Success or failure as reported by the source system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Success,
    Failure,
    #[default]
    Unknown,
}

impl EventOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, EventOutcome::Failure)
    }
}

impl std::fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventOutcome::Success => write!(f, "success"),
            EventOutcome::Failure => write!(f, "failure"),
            EventOutcome::Unknown => write!(f, "unknown"),
        }
    }
}

/// Typed field values. Attributes arrive as loose JSON but keep their type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Extract as string, returning None for non-text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Extract as a float. Integers widen, numeric strings parse, the rest is None.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}
