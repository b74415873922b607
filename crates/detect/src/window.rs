use argus_core::{EvalWindow, Event};
use std::time::Duration;

use crate::error::DetectError;
use crate::source::{EventFilter, EventSource};

/// The event set of one evaluation window, fetched once and then shared
/// by aggregation and scoring. The window bounds never move after the
/// fetch, so every stage of a run sees the same interval.
#[derive(Debug, Clone)]
pub struct EventWindow {
    pub window: EvalWindow,
    pub events: Vec<Event>,
    pub malformed: usize,
}

impl EventWindow {
    /// Fetch all events for `window` from `source`, bounded by `timeout`.
    /// Both source failures and timeout expiry surface as
    /// [`DetectError::SourceUnavailable`]; retries are the caller's call.
    pub async fn fetch(
        source: &dyn EventSource,
        window: EvalWindow,
        filter: &EventFilter,
        timeout: Duration,
    ) -> Result<Self, DetectError> {
        let batch = match tokio::time::timeout(timeout, source.query(&window, filter)).await {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => {
                return Err(DetectError::SourceUnavailable {
                    source_name: source.name().to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(DetectError::SourceUnavailable {
                    source_name: source.name().to_string(),
                    reason: format!("query timed out after {}ms", timeout.as_millis()),
                });
            }
        };

        let mut events = batch.events;
        events.sort_by_key(|e| e.timestamp);
        Ok(Self {
            window,
            events,
            malformed: batch.malformed,
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// An empty window is a valid result, not an error.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
