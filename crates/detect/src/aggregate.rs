use argus_core::{EntityKind, Event};
use argus_rules::RuleParams;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::privilege;

/// What a rule measures per event.
#[derive(Debug, Clone, PartialEq)]
pub enum Measure {
    /// Every event contributes 1.
    EventCount,
    /// A numeric event attribute, e.g. `bytes`.
    Attribute(String),
}

impl Measure {
    pub fn for_params(params: &RuleParams) -> Self {
        match params {
            RuleParams::VolumeBaseline(p) => Measure::Attribute(p.measure_attribute.clone()),
            _ => Measure::EventCount,
        }
    }

    /// Numeric contribution of one event. A missing or non-numeric
    /// attribute contributes zero, never an error.
    pub fn value_of(&self, event: &Event) -> f64 {
        match self {
            Measure::EventCount => 1.0,
            Measure::Attribute(name) => event.attribute_f64(name).unwrap_or(0.0),
        }
    }
}

/// One privilege-relevant event kept aside for categorical scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    pub action: String,
    pub permission: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Current-window rollup for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAggregate {
    pub entity_id: String,
    pub entity_kind: EntityKind,
    pub event_count: u64,
    pub failed_count: u64,
    pub total_value: f64,
    pub max_single: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub escalations: Vec<Escalation>,
}

impl EntityAggregate {
    fn seeded_from(event: &Event) -> Self {
        Self {
            entity_id: event.entity_id.clone(),
            entity_kind: event.entity_kind,
            event_count: 0,
            failed_count: 0,
            total_value: 0.0,
            max_single: 0.0,
            first_seen: event.timestamp,
            last_seen: event.timestamp,
            escalations: Vec::new(),
        }
    }
}

/// Roll the window's events up per entity. The result is keyed and
/// iterated in entity-id order so downstream output is deterministic.
pub fn aggregate_entities(
    events: &[Event],
    measure: &Measure,
) -> BTreeMap<String, EntityAggregate> {
    let mut out: BTreeMap<String, EntityAggregate> = BTreeMap::new();
    for event in events {
        let value = measure.value_of(event);
        let agg = out
            .entry(event.entity_id.clone())
            .or_insert_with(|| EntityAggregate::seeded_from(event));

        agg.event_count += 1;
        if event.outcome.is_failure() {
            agg.failed_count += 1;
        }
        agg.total_value += value;
        if value > agg.max_single {
            agg.max_single = value;
        }
        if event.timestamp < agg.first_seen {
            agg.first_seen = event.timestamp;
        }
        if event.timestamp > agg.last_seen {
            agg.last_seen = event.timestamp;
        }
        // Only actions from the static escalation tables are kept, so
        // high-volume rules never accumulate per-event carry.
        if privilege::is_escalation_action(&event.action) {
            agg.escalations.push(Escalation {
                action: event.action.clone(),
                permission: event.attribute_str("permission").map(str::to_string),
                timestamp: event.timestamp,
            });
        }
    }
    out
}
