//! Per-alert runtime state.
//!
//! Alert definitions live in the catalog; the firing state machine
//! lives here, keyed by (alert_id, environment). State is in-memory
//! only: after a restart every alert starts Quiet and the first firing
//! tick notifies again.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use argus_core::Environment;

/// Firing state of one alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Quiet,
    Triggered,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Quiet => "quiet",
            AlertStatus::Triggered => "triggered",
        }
    }
}

/// Mutable runtime state of one alert.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertRuntime {
    pub status: AlertStatus,
    /// When an alert notification was last delivered (trigger side only;
    /// recovery notifications never touch this).
    pub last_notified: Option<DateTime<Utc>>,
    /// When the condition was last evaluated, firing or not.
    pub last_evaluated: Option<DateTime<Utc>>,
    /// Aggregate value from the last evaluation that produced one.
    pub last_value: Option<f64>,
}

/// One (alert, environment) entry from a state snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct AlertStateEntry {
    pub alert_id: String,
    pub environment: Environment,
    #[serde(flatten)]
    pub runtime: AlertRuntime,
}

/// Shared store of per-alert runtime state.
///
/// Each entry is behind its own `tokio::sync::Mutex`, held across the
/// notification awaits of a tick, so concurrent ticks of the same
/// alert serialize while different alerts proceed independently.
#[derive(Default)]
pub struct AlertStateStore {
    states: RwLock<HashMap<(String, Environment), Arc<Mutex<AlertRuntime>>>>,
}

impl AlertStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the runtime state of one alert, created Quiet on first use.
    pub fn handle(&self, alert_id: &str, environment: Environment) -> Arc<Mutex<AlertRuntime>> {
        let key = (alert_id.to_string(), environment);
        {
            let guard = self.states.read().expect("alert state lock poisoned");
            if let Some(handle) = guard.get(&key) {
                return Arc::clone(handle);
            }
        }
        let mut guard = self.states.write().expect("alert state lock poisoned");
        Arc::clone(guard.entry(key).or_default())
    }

    /// Drop state for an alert (e.g. after its definition is removed).
    pub fn remove(&self, alert_id: &str, environment: Environment) {
        let mut guard = self.states.write().expect("alert state lock poisoned");
        guard.remove(&(alert_id.to_string(), environment));
    }

    /// Clone of every tracked state, sorted by (alert_id, environment).
    pub async fn snapshot(&self) -> Vec<AlertStateEntry> {
        // Collect handles first; never hold the map lock across awaits.
        let handles: Vec<((String, Environment), Arc<Mutex<AlertRuntime>>)> = {
            let guard = self.states.read().expect("alert state lock poisoned");
            guard
                .iter()
                .map(|(k, v)| (k.clone(), Arc::clone(v)))
                .collect()
        };

        let mut entries = Vec::with_capacity(handles.len());
        for ((alert_id, environment), handle) in handles {
            let runtime = handle.lock().await.clone();
            entries.push(AlertStateEntry {
                alert_id,
                environment,
                runtime,
            });
        }
        entries.sort_by(|a, b| {
            (a.alert_id.as_str(), a.environment.as_str())
                .cmp(&(b.alert_id.as_str(), b.environment.as_str()))
        });
        entries
    }
}
