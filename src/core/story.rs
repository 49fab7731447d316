use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::ClimateEvent;

/// One unit of narrative progress, bound to exactly one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Id of the event this step presents
    pub event_id: String,

    /// Auto-advance delay in milliseconds; absent or zero waits for `next()`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl Step {
    /// Create a step with no auto-advance
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            delay_ms: None,
        }
    }

    /// Create a step that auto-advances after `delay_ms`
    pub fn with_delay(event_id: impl Into<String>, delay_ms: u64) -> Self {
        Self {
            event_id: event_id.into(),
            delay_ms: Some(delay_ms),
        }
    }

    /// Effective auto-advance delay; `None` means wait for an explicit `next()`
    pub fn auto_advance(&self) -> Option<Duration> {
        match self.delay_ms {
            Some(ms) if ms > 0 => Some(Duration::from_millis(ms)),
            _ => None,
        }
    }
}

/// An ordered narrative sequence of steps
///
/// Immutable once handed to the playback machine. Shape constraints are
/// checked by [`validate`](Story::validate) at load time, not on
/// construction, so partially-built stories can exist in authoring code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub steps: Vec<Step>,
}

impl Story {
    pub fn new(id: impl Into<String>, title: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            steps,
        }
    }

    /// Build a chronological story from event data
    ///
    /// Steps are ordered by event timestamp and all share the same
    /// auto-advance delay (pass `None` for a manually-paced story).
    pub fn from_events(
        id: impl Into<String>,
        title: impl Into<String>,
        events: &[ClimateEvent],
        delay_ms: Option<u64>,
    ) -> Self {
        let mut ordered: Vec<&ClimateEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.timestamp);

        let steps = ordered
            .into_iter()
            .map(|e| Step {
                event_id: e.id.clone(),
                delay_ms,
            })
            .collect();

        Self::new(id, title, steps)
    }

    /// Check the story's shape, collecting every violation
    ///
    /// Returns all problems at once rather than stopping at the first, so
    /// authoring tools can report them together.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();

        if self.id.trim().is_empty() {
            violations.push("story id is empty".to_string());
        }
        if self.title.trim().is_empty() {
            violations.push("story title is empty".to_string());
        }
        if self.steps.is_empty() {
            violations.push("story has no steps".to_string());
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.event_id.trim().is_empty() {
                violations.push(format!("step {} has an empty eventId", index));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get a step by index
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }
}
