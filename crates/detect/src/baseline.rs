//! Per-entity historical baselines for statistical scoring.
//!
//! History is bucketed by UTC day; each active day contributes one
//! daily-total sample. Mean, stddev, and max describe those daily
//! totals; `p95` is a nearest-rank percentile over single-event values.
//! The caller fetches history strictly before the evaluation window, so
//! the events being scored never contaminate their own baseline.

use argus_core::Event;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use crate::aggregate::Measure;

/// Historical statistics for one entity over the lookback range.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    /// Active days (days with at least one event) in the lookback.
    pub sample_count: usize,
    /// Mean of the daily totals.
    pub mean: f64,
    /// Population stddev of the daily totals, floored at EPSILON.
    pub stddev: f64,
    /// Largest daily total.
    pub max: f64,
    /// Nearest-rank 95th percentile of single-event values.
    pub p95: f64,
    /// Mean events per active day.
    pub mean_daily_events: f64,
}

struct EntityHistory {
    daily: HashMap<NaiveDate, (f64, u64)>,
    values: Vec<f64>,
}

/// Compute baselines for every entity seen in `history`. Entities with
/// fewer than `min_samples` active days are dropped from the map; their
/// absence downstream is a skip, not an error. Per-entity computation
/// is parallelized.
pub fn compute_baselines(
    history: &[Event],
    measure: &Measure,
    min_samples: usize,
) -> BTreeMap<String, Baseline> {
    use rayon::prelude::*;

    let mut per_entity: HashMap<String, EntityHistory> = HashMap::new();
    for event in history {
        let value = measure.value_of(event);
        let day = event.timestamp.date_naive();
        let entry = per_entity
            .entry(event.entity_id.clone())
            .or_insert_with(|| EntityHistory {
                daily: HashMap::new(),
                values: Vec::new(),
            });
        let slot = entry.daily.entry(day).or_insert((0.0, 0));
        slot.0 += value;
        slot.1 += 1;
        entry.values.push(value);
    }

    per_entity
        .into_iter()
        .collect::<Vec<_>>()
        .into_par_iter()
        .filter_map(|(entity_id, hist)| {
            let baseline = summarize(&hist)?;
            if baseline.sample_count < min_samples {
                return None;
            }
            Some((entity_id, baseline))
        })
        .collect()
}

fn summarize(hist: &EntityHistory) -> Option<Baseline> {
    if hist.daily.is_empty() {
        return None;
    }
    let n = hist.daily.len() as f64;

    let mut total_value = 0.0;
    let mut total_events = 0u64;
    let mut max = f64::MIN;
    for (value, count) in hist.daily.values() {
        total_value += value;
        total_events += count;
        if *value > max {
            max = *value;
        }
    }
    let mean = total_value / n;

    let variance: f64 = hist
        .daily
        .values()
        .map(|(value, _)| {
            let diff = value - mean;
            diff * diff
        })
        .sum();
    let stddev = (variance / n).sqrt().max(f64::EPSILON);

    Some(Baseline {
        sample_count: hist.daily.len(),
        mean,
        stddev,
        max,
        p95: nearest_rank_p95(&hist.values),
        mean_daily_events: total_events as f64 / n,
    })
}

/// Nearest-rank percentile: rank `ceil(0.95 * n)`, 1-based.
fn nearest_rank_p95(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = ((0.95 * sorted.len() as f64).ceil() as usize).max(1);
    sorted[rank - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::{EntityKind, EventOutcome, FieldValue};
    use chrono::{TimeZone, Utc};

    fn event(day: u32, hour: u32, entity: &str, bytes: f64) -> Event {
        let mut attributes = std::collections::HashMap::new();
        attributes.insert("bytes".to_string(), FieldValue::from(bytes));
        Event {
            timestamp: Utc.with_ymd_and_hms(2025, 5, day, hour, 0, 0).unwrap(),
            source: "audit".to_string(),
            action: "export".to_string(),
            entity_id: entity.to_string(),
            entity_kind: EntityKind::User,
            outcome: EventOutcome::Success,
            attributes,
        }
    }

    #[test]
    fn daily_totals_drive_mean_and_max() {
        // Day 1: 100 + 300 = 400, day 2: 200. Two active days.
        let history = vec![
            event(1, 2, "alice", 100.0),
            event(1, 20, "alice", 300.0),
            event(2, 9, "alice", 200.0),
        ];
        let baselines = compute_baselines(
            &history,
            &Measure::Attribute("bytes".to_string()),
            1,
        );
        let b = &baselines["alice"];
        assert_eq!(b.sample_count, 2);
        assert!((b.mean - 300.0).abs() < 1e-9);
        assert!((b.max - 400.0).abs() < 1e-9);
        assert!((b.stddev - 100.0).abs() < 1e-9);
        assert!((b.mean_daily_events - 1.5).abs() < 1e-9);
        // p95 over single-event values [100, 200, 300]: rank ceil(2.85)=3.
        assert!((b.p95 - 300.0).abs() < 1e-9);
    }

    #[test]
    fn entities_under_min_samples_are_excluded() {
        let history = vec![
            event(1, 2, "alice", 10.0),
            event(2, 2, "alice", 10.0),
            event(1, 5, "bob", 10.0),
        ];
        let baselines = compute_baselines(&history, &Measure::EventCount, 2);
        assert!(baselines.contains_key("alice"));
        assert!(!baselines.contains_key("bob"));
    }

    #[test]
    fn single_sample_gets_epsilon_stddev() {
        let history = vec![event(1, 2, "alice", 50.0)];
        let baselines = compute_baselines(&history, &Measure::EventCount, 1);
        let b = &baselines["alice"];
        assert_eq!(b.stddev, f64::EPSILON);
        assert_eq!(b.p95, 1.0);
    }

    #[test]
    fn empty_history_yields_empty_map() {
        let baselines = compute_baselines(&[], &Measure::EventCount, 1);
        assert!(baselines.is_empty());
    }
}
