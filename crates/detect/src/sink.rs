use argus_core::{Environment, EvalWindow};
use argus_rules::DetectionScope;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::SinkError;
use crate::record::DetectionRecord;

/// Append-only persistence for detection records, plus the aggregate
/// count query the alert tier runs.
///
/// The sink never deduplicates; record identity is deterministic
/// upstream (rule, entity, window) and run scheduling owns
/// at-most-once-per-window.
pub trait DetectionStore: Send + Sync {
    /// Append records, returning how many were written.
    fn persist(&self, records: &[DetectionRecord]) -> Result<usize, SinkError>;

    /// Count records matching `scope` inside `period`.
    ///
    /// Returns `None` when the store holds no records at all inside the
    /// period. A populated period where nothing matches the scope is
    /// `Some(0.0)`; the distinction feeds the alert tier's
    /// empty-result policy.
    fn count_detections(
        &self,
        environment: Environment,
        scope: &DetectionScope,
        period: &EvalWindow,
    ) -> Result<Option<f64>, SinkError>;

    /// Full record dump, mostly for inspection and tests.
    fn records(&self) -> Result<Vec<DetectionRecord>, SinkError>;
}

fn count_matching<'a>(
    records: impl IntoIterator<Item = &'a DetectionRecord>,
    environment: Environment,
    scope: &DetectionScope,
    period: &EvalWindow,
) -> Option<f64> {
    let mut in_period = 0usize;
    let mut matching = 0usize;
    for record in records {
        if !record.within(period) {
            continue;
        }
        in_period += 1;
        if record.environment != environment || record.rule_id != scope.rule_id {
            continue;
        }
        if let Some(kind) = &scope.detection_type {
            if record.detection_type.as_str() != kind {
                continue;
            }
        }
        matching += 1;
    }
    if in_period == 0 {
        None
    } else {
        Some(matching as f64)
    }
}

/// In-memory store for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryDetectionStore {
    records: RwLock<Vec<DetectionRecord>>,
}

impl MemoryDetectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DetectionStore for MemoryDetectionStore {
    fn persist(&self, records: &[DetectionRecord]) -> Result<usize, SinkError> {
        let mut guard = self.records.write().expect("detection store lock poisoned");
        guard.extend_from_slice(records);
        Ok(records.len())
    }

    fn count_detections(
        &self,
        environment: Environment,
        scope: &DetectionScope,
        period: &EvalWindow,
    ) -> Result<Option<f64>, SinkError> {
        let guard = self.records.read().expect("detection store lock poisoned");
        Ok(count_matching(guard.iter(), environment, scope, period))
    }

    fn records(&self) -> Result<Vec<DetectionRecord>, SinkError> {
        let guard = self.records.read().expect("detection store lock poisoned");
        Ok(guard.clone())
    }
}

/// Append-only JSON-lines store, one record per line.
#[derive(Debug, Clone)]
pub struct JsonlDetectionStore {
    path: PathBuf,
}

impl JsonlDetectionStore {
    /// Open (or prepare to create) the store file, ensuring its parent
    /// directory exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<DetectionRecord>, SinkError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let mut records = Vec::new();
        for (i, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DetectionRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        file = %self.path.display(),
                        line = i + 1,
                        error = %e,
                        "skipping corrupt detection line"
                    );
                }
            }
        }
        Ok(records)
    }
}

impl DetectionStore for JsonlDetectionStore {
    fn persist(&self, records: &[DetectionRecord]) -> Result<usize, SinkError> {
        if records.is_empty() {
            return Ok(0);
        }
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        for record in records {
            let mut line = serde_json::to_string(record)?;
            line.push('\n');
            file.write_all(line.as_bytes())?;
        }
        Ok(records.len())
    }

    fn count_detections(
        &self,
        environment: Environment,
        scope: &DetectionScope,
        period: &EvalWindow,
    ) -> Result<Option<f64>, SinkError> {
        let records = self.read_all()?;
        Ok(count_matching(records.iter(), environment, scope, period))
    }

    fn records(&self) -> Result<Vec<DetectionRecord>, SinkError> {
        self.read_all()
    }
}
