use argus_core::{EntityKind, EvalWindow, Event, EventOutcome};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::SourceError;

/// Narrowing applied when querying a source. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub actions: Option<Vec<String>>,
    pub entity_kinds: Option<Vec<EntityKind>>,
    pub outcome: Option<EventOutcome>,
}

impl EventFilter {
    /// Filter that matches every event.
    pub fn any() -> Self {
        Self::default()
    }

    /// Filter restricted to the given action names.
    pub fn for_actions(actions: &[String]) -> Self {
        Self {
            actions: Some(actions.to_vec()),
            ..Self::default()
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(actions) = &self.actions {
            if !actions.iter().any(|a| a == &event.action) {
                return false;
            }
        }
        if let Some(kinds) = &self.entity_kinds {
            if !kinds.contains(&event.entity_kind) {
                return false;
            }
        }
        if let Some(outcome) = &self.outcome {
            if event.outcome != *outcome {
                return false;
            }
        }
        true
    }
}

/// One source query result: the matching events plus how many raw
/// records were skipped as malformed.
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub events: Vec<Event>,
    pub malformed: usize,
}

/// A queryable telemetry source. Implementations return events whose
/// timestamps fall inside `window` (half-open) and that pass `filter`;
/// ordering is not required here, the window layer sorts.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn query(
        &self,
        window: &EvalWindow,
        filter: &EventFilter,
    ) -> Result<SourceBatch, SourceError>;

    fn name(&self) -> &str;
}

/// In-memory source backed by a fixed event list. Used in tests and by
/// embedders that already hold normalized events.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSource {
    events: Vec<Event>,
}

impl MemoryEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn query(
        &self,
        window: &EvalWindow,
        filter: &EventFilter,
    ) -> Result<SourceBatch, SourceError> {
        let events = self
            .events
            .iter()
            .filter(|e| window.contains(e.timestamp) && filter.matches(e))
            .cloned()
            .collect();
        Ok(SourceBatch {
            events,
            malformed: 0,
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Append-only JSON-lines source, one event object per line. Lines that
/// fail to normalize are skipped, counted, and logged at `warn`.
#[derive(Debug, Clone)]
pub struct JsonlEventSource {
    path: PathBuf,
}

impl JsonlEventSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl EventSource for JsonlEventSource {
    async fn query(
        &self,
        window: &EvalWindow,
        filter: &EventFilter,
    ) -> Result<SourceBatch, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::Unavailable(format!(
                "event file not found: {}",
                self.path.display()
            )));
        }
        let data = tokio::fs::read_to_string(&self.path).await?;

        let mut batch = SourceBatch::default();
        for (i, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match normalize_line(line) {
                Ok(event) => {
                    if window.contains(event.timestamp) && filter.matches(&event) {
                        batch.events.push(event);
                    }
                }
                Err(reason) => {
                    batch.malformed += 1;
                    tracing::warn!(
                        file = %self.path.display(),
                        line = i + 1,
                        reason = %reason,
                        "skipping malformed event line"
                    );
                }
            }
        }
        Ok(batch)
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// Parse one raw JSON line into a normalized [`Event`]. Records missing
/// a timestamp, action, or entity id are malformed, never fatal.
fn normalize_line(line: &str) -> Result<Event, String> {
    let event: Event = serde_json::from_str(line).map_err(|e| e.to_string())?;
    if event.action.trim().is_empty() {
        return Err("empty action".to_string());
    }
    if event.entity_id.trim().is_empty() {
        return Err("empty entity_id".to_string());
    }
    Ok(event)
}
