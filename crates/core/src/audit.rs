//! Per-target execution audit trail, kept in memory.
//!
//! Both the detection runner and the alert controller append here while
//! they work, keyed by rule id or alert id. Each target holds a bounded
//! ring of entries so a chatty rule cannot grow without limit. Guarded by
//! `std::sync::RwLock` rather than an async lock because appends also
//! happen from synchronous scoring code.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an audit entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    /// Numeric rank, higher is more severe.
    pub fn as_severity(&self) -> u8 {
        *self as u8
    }
}

/// Which stage of a rule evaluation or alert tick produced the entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    ConfigLoad,
    WindowFetch,
    Baseline,
    Scoring,
    Persist,
    AlertCheck,
    Notification,
    Complete,
}

/// One audit entry. `target_id` is the rule id or alert id the entry
/// belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub target_id: String,
    pub level: LogLevel,
    pub phase: ExecutionPhase,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Filters for [`AuditLog::query`]. The default matches everything up to
/// the default limit.
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    /// Keep entries at or above this severity.
    pub level: Option<LogLevel>,
    /// Keep entries from this phase only.
    pub phase: Option<ExecutionPhase>,
    /// Cap on returned entries (default 100).
    pub limit: Option<u32>,
    /// Keep entries stamped at or after this ISO 8601 instant.
    pub since: Option<String>,
}

/// Bounded in-memory audit trail, one ring per target id.
pub struct AuditLog {
    targets: RwLock<HashMap<String, VecDeque<AuditRecord>>>,
    cap: usize,
}

const DEFAULT_CAP: usize = 500;

impl AuditLog {
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_CAP)
    }

    /// Cap the number of retained entries per target.
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            targets: RwLock::new(HashMap::new()),
            cap: max,
        }
    }

    /// Append an entry carrying only a message.
    pub fn log(
        &self,
        target_id: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
    ) {
        self.log_with_details(target_id, level, phase, message, None, None);
    }

    /// Append an entry with structured details and/or an elapsed time.
    pub fn log_with_details(
        &self,
        target_id: &str,
        level: LogLevel,
        phase: ExecutionPhase,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
        duration_ms: Option<u64>,
    ) {
        let record = AuditRecord {
            timestamp: Utc::now(),
            target_id: target_id.to_string(),
            level,
            phase,
            message: message.into(),
            details,
            duration_ms,
        };

        let mut guard = self.targets.write().expect("audit lock poisoned");
        let ring = guard.entry(target_id.to_string()).or_default();
        ring.push_back(record);
        // Entries arrive one at a time, so a single evict restores the cap.
        if ring.len() > self.cap {
            ring.pop_front();
        }
    }

    /// Entries for one target, newest first, after applying `params`.
    pub fn query(&self, target_id: &str, params: &AuditQuery) -> Vec<AuditRecord> {
        let floor = params.level.map(|l| l.as_severity()).unwrap_or(0);
        let cutoff: Option<DateTime<Utc>> =
            params.since.as_deref().and_then(|s| s.parse().ok());
        let limit = params.limit.unwrap_or(100) as usize;

        let guard = self.targets.read().expect("audit lock poisoned");
        match guard.get(target_id) {
            None => Vec::new(),
            Some(ring) => ring
                .iter()
                .rev()
                .filter(|r| {
                    r.level.as_severity() >= floor
                        && params.phase.map_or(true, |p| p == r.phase)
                        && cutoff.map_or(true, |c| r.timestamp >= c)
                })
                .take(limit)
                .cloned()
                .collect(),
        }
    }

    /// Every target id with at least one retained entry, sorted.
    pub fn targets(&self) -> Vec<String> {
        let guard = self.targets.read().expect("audit lock poisoned");
        let mut ids: Vec<String> = guard.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop all entries for one target.
    pub fn clear(&self, target_id: &str) {
        self.targets
            .write()
            .expect("audit lock poisoned")
            .remove(target_id);
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(log: &AuditLog, target: &str, n: usize) {
        for i in 0..n {
            log.log(
                target,
                LogLevel::Info,
                ExecutionPhase::Scoring,
                format!("entry {i}"),
            );
        }
    }

    #[test]
    fn query_returns_newest_first() {
        let log = AuditLog::new();
        log.log("upload-spike", LogLevel::Info, ExecutionPhase::ConfigLoad, "resolved");
        log.log("upload-spike", LogLevel::Debug, ExecutionPhase::Baseline, "14 entities");
        log.log("upload-spike", LogLevel::Warning, ExecutionPhase::Scoring, "ratio 6.0");

        let got = log.query("upload-spike", &AuditQuery::default());
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].phase, ExecutionPhase::Scoring);
        assert_eq!(got[2].phase, ExecutionPhase::ConfigLoad);
    }

    #[test]
    fn level_is_an_inclusive_floor() {
        let log = AuditLog::new();
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
        ] {
            log.log("r", level, ExecutionPhase::Scoring, "x");
        }

        let warnings_up = log.query(
            "r",
            &AuditQuery {
                level: Some(LogLevel::Warning),
                ..Default::default()
            },
        );
        assert_eq!(warnings_up.len(), 2);
        assert!(warnings_up.iter().all(|r| r.level.as_severity() >= 2));

        let ranks: Vec<u8> = [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
        ]
        .iter()
        .map(|l| l.as_severity())
        .collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn phase_filter_narrows() {
        let log = AuditLog::new();
        log.log("a", LogLevel::Info, ExecutionPhase::AlertCheck, "checked");
        log.log("a", LogLevel::Info, ExecutionPhase::Notification, "sent");
        log.log("a", LogLevel::Info, ExecutionPhase::AlertCheck, "checked again");

        let got = log.query(
            "a",
            &AuditQuery {
                phase: Some(ExecutionPhase::AlertCheck),
                ..Default::default()
            },
        );
        assert_eq!(got.len(), 2);
        assert!(got.iter().all(|r| r.phase == ExecutionPhase::AlertCheck));
    }

    #[test]
    fn limit_truncates_from_the_newest_end() {
        let log = AuditLog::new();
        fill(&log, "r", 10);

        let got = log.query(
            "r",
            &AuditQuery {
                limit: Some(4),
                ..Default::default()
            },
        );
        assert_eq!(got.len(), 4);
        assert_eq!(got[0].message, "entry 9");
        assert_eq!(got[3].message, "entry 6");
    }

    #[test]
    fn since_cuts_old_entries() {
        let log = AuditLog::new();
        fill(&log, "r", 2);

        let all = log.query(
            "r",
            &AuditQuery {
                since: Some("2000-01-01T00:00:00Z".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(all.len(), 2);

        let none = log.query(
            "r",
            &AuditQuery {
                since: Some("2999-01-01T00:00:00Z".to_string()),
                ..Default::default()
            },
        );
        assert!(none.is_empty());
    }

    #[test]
    fn cap_evicts_the_oldest_entry() {
        let log = AuditLog::with_max_entries(3);
        fill(&log, "r", 4);

        let got = log.query("r", &AuditQuery::default());
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].message, "entry 3");
        assert_eq!(got[2].message, "entry 1");
    }

    #[test]
    fn details_and_duration_come_back() {
        let log = AuditLog::new();
        let details = serde_json::json!({"entities": 42, "records": 3});
        log.log_with_details(
            "r",
            LogLevel::Info,
            ExecutionPhase::Complete,
            "run finished",
            Some(details.clone()),
            Some(150),
        );

        let got = log.query("r", &AuditQuery::default());
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].details, Some(details));
        assert_eq!(got[0].duration_ms, Some(150));
    }

    #[test]
    fn targets_stay_isolated() {
        let log = AuditLog::new();
        log.log("upload-spike", LogLevel::Info, ExecutionPhase::Scoring, "rule side");
        log.log("weekly-alert", LogLevel::Error, ExecutionPhase::Notification, "alert side");

        assert_eq!(log.query("upload-spike", &AuditQuery::default()).len(), 1);
        assert_eq!(log.query("weekly-alert", &AuditQuery::default()).len(), 1);
        assert_eq!(log.targets(), vec!["upload-spike", "weekly-alert"]);

        log.clear("upload-spike");
        assert!(log.query("upload-spike", &AuditQuery::default()).is_empty());
        assert!(log.query("never-logged", &AuditQuery::default()).is_empty());
    }
}
