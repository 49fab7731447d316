use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::core::{PlaybackAnalytics, Step, Story};
use crate::playback::MachineState;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Notifications emitted by the playback machine
///
/// Delivered synchronously, in subscription order, on every transition and
/// step change. Stories are shared as `Arc` so fan-out stays cheap.
#[derive(Debug, Clone)]
pub enum StoryEvent {
    /// A transition was applied
    StateChanged {
        from: MachineState,
        to: MachineState,
        context: Value,
    },
    /// The machine left `state`
    StateExited { state: MachineState, context: Value },
    /// The machine entered `state`
    StateEntered { state: MachineState, context: Value },
    /// A story passed validation and is ready to play
    StoryInitialized { story: Arc<Story> },
    /// Playback started, resumed, or restarted
    PlaybackStarted {
        story: Arc<Story>,
        step: Step,
        step_index: usize,
    },
    /// The current step moved via `next()` or `prev()`
    StepChanged {
        step: Step,
        step_index: usize,
        progress: f64,
    },
    /// The current step moved via `skip_to()`
    StepSkipped {
        from_index: usize,
        to_index: usize,
        step: Step,
        progress: f64,
    },
    /// Hand the current step to whatever renders it
    ExecuteStep {
        story: Arc<Story>,
        step: Step,
        step_index: usize,
    },
    /// Playback reached the end of the story
    StoryFinished {
        analytics: PlaybackAnalytics,
        progress: f64,
    },
}

impl StoryEvent {
    /// Stable name for logging and filtering
    pub fn name(&self) -> &'static str {
        match self {
            StoryEvent::StateChanged { .. } => "state_changed",
            StoryEvent::StateExited { .. } => "state_exited",
            StoryEvent::StateEntered { .. } => "state_entered",
            StoryEvent::StoryInitialized { .. } => "story_initialized",
            StoryEvent::PlaybackStarted { .. } => "playback_started",
            StoryEvent::StepChanged { .. } => "step_changed",
            StoryEvent::StepSkipped { .. } => "step_skipped",
            StoryEvent::ExecuteStep { .. } => "execute_step",
            StoryEvent::StoryFinished { .. } => "story_finished",
        }
    }
}

pub(crate) type Callback = Box<dyn FnMut(&StoryEvent) + Send>;

/// Instance-owned subscriber list
///
/// Each machine carries its own registry, so independent machines in one
/// process never see each other's subscribers. Callbacks run inside their
/// own unwind boundary: a panicking subscriber is logged and skipped while
/// delivery continues to the rest.
#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: u64,
    entries: Vec<(SubscriptionId, Callback)>,
}

impl SubscriberRegistry {
    pub fn subscribe(&mut self, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, callback));
        id
    }

    /// Remove a subscriber; returns false if the id was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Deliver an event to every subscriber in subscription order
    pub fn emit(&mut self, event: &StoryEvent) {
        for (id, callback) in &mut self.entries {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(event)));
            if outcome.is_err() {
                error!(
                    subscription = id.0,
                    event = event.name(),
                    "subscriber panicked; continuing delivery"
                );
            }
        }
    }
}
