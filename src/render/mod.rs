use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::core::{ClimateEvent, Step, Story};

/// Receives the execute-step handoff
///
/// The machine renders nothing itself; whatever presents a step (a map, a
/// timeline, a console) implements this. The event is already resolved
/// against the store; `None` means the step points at an unknown id.
#[async_trait]
pub trait StepRenderer: Send {
    async fn render_step(
        &mut self,
        story: &Story,
        step: &Step,
        step_index: usize,
        event: Option<&ClimateEvent>,
    );
}

/// Logs each step as a narrative line
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

#[async_trait]
impl StepRenderer for ConsoleRenderer {
    async fn render_step(
        &mut self,
        story: &Story,
        step: &Step,
        step_index: usize,
        event: Option<&ClimateEvent>,
    ) {
        match event {
            Some(event) => info!(
                story = %story.id,
                step = step_index,
                event = %event.id,
                kind = ?event.kind,
                severity = ?event.severity,
                "{}",
                event.title
            ),
            None => warn!(
                story = %story.id,
                step = step_index,
                event = %step.event_id,
                "step references an event missing from the store"
            ),
        }
    }
}

/// Records rendered steps for test assertions
///
/// Clone it before handing it to a driver; all clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    log: Arc<Mutex<Vec<(String, usize)>>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of `(story_id, step_index)` pairs rendered so far
    pub fn rendered(&self) -> Vec<(String, usize)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl StepRenderer for RecordingRenderer {
    async fn render_step(
        &mut self,
        story: &Story,
        _step: &Step,
        step_index: usize,
        _event: Option<&ClimateEvent>,
    ) {
        self.log.lock().unwrap().push((story.id.clone(), step_index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::sample_event;
    use crate::core::{EventKind, Severity};

    #[tokio::test]
    async fn test_recording_renderer_shares_log_across_clones() {
        let recorder = RecordingRenderer::new();
        let mut handle = recorder.clone();

        let story = Story::new("s1", "Test", vec![Step::new("e1")]);
        let event = sample_event("e1", EventKind::Fire, Severity::High, 1);
        handle.render_step(&story, &story.steps[0], 0, Some(&event)).await;
        handle.render_step(&story, &story.steps[0], 0, None).await;

        assert_eq!(
            recorder.rendered(),
            vec![("s1".to_string(), 0), ("s1".to_string(), 0)]
        );
    }
}
