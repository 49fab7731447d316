use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::core::{PlaybackAnalytics, Step, Story};
use crate::playback::error::CommandError;
use crate::playback::events::{StoryEvent, SubscriberRegistry, SubscriptionId};
use crate::playback::{MachineState, TransitionRecord};

/// Pending auto-advance deadline for one step
///
/// At most one exists at a time; arming a new one overwrites the old, which
/// is what makes "never two live timers" structural rather than a protocol
/// the steps have to follow.
#[derive(Debug, Clone, Copy)]
struct AutoAdvance {
    deadline: Instant,
    /// Step the deadline was armed for; a fire is discarded if the pointer
    /// has moved since
    step_index: usize,
}

/// Story playback state machine
///
/// Owns the playback session for one loaded story: current state, step
/// pointer, analytics, transition history, and the single pending
/// auto-advance deadline. Collaborators drive it through the command
/// methods and observe it through [`subscribe`](StoryMachine::subscribe);
/// commands never panic, and a rejected command returns an error with the
/// session left untouched.
///
/// The machine does not tick itself. Hosts call [`update`](StoryMachine::update)
/// periodically (or run a [`PlaybackDriver`](crate::playback::PlaybackDriver))
/// so expired auto-advance deadlines fire.
pub struct StoryMachine {
    state: MachineState,
    story: Option<Arc<Story>>,
    current_step: usize,
    analytics: PlaybackAnalytics,
    history: Vec<TransitionRecord>,
    subscribers: SubscriberRegistry,
    auto_advance: Option<AutoAdvance>,
    paused_at: Option<DateTime<Utc>>,
}

impl Default for StoryMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StoryMachine {
    pub fn new() -> Self {
        Self {
            state: MachineState::Idle,
            story: None,
            current_step: 0,
            analytics: PlaybackAnalytics::default(),
            history: Vec::new(),
            subscribers: SubscriberRegistry::default(),
            auto_advance: None,
            paused_at: None,
        }
    }

    // --- queries ---

    /// Current playback state
    pub fn state(&self) -> MachineState {
        self.state
    }

    /// The loaded story, if any
    pub fn story(&self) -> Option<&Arc<Story>> {
        self.story.as_ref()
    }

    /// The step the pointer currently rests on
    ///
    /// `None` when nothing is loaded or the pointer is parked past the end
    /// after finishing.
    pub fn current_step(&self) -> Option<&Step> {
        self.story.as_ref()?.steps.get(self.current_step)
    }

    /// Zero-based step pointer; equals the step count once finished
    pub fn current_step_index(&self) -> usize {
        self.current_step
    }

    /// Fraction of the story played, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        match &self.story {
            Some(story) if !story.steps.is_empty() => {
                self.current_step as f64 / story.steps.len() as f64
            }
            _ => 0.0,
        }
    }

    /// Whether the pointer has passed the last step (vacuously true with
    /// nothing loaded)
    pub fn is_complete(&self) -> bool {
        match &self.story {
            Some(story) if !story.steps.is_empty() => self.current_step >= story.steps.len(),
            _ => true,
        }
    }

    /// Whether an auto-advance deadline is armed
    pub fn auto_advance_pending(&self) -> bool {
        self.auto_advance.is_some()
    }

    /// Counters for the current run
    pub fn analytics(&self) -> &PlaybackAnalytics {
        &self.analytics
    }

    /// Applied transitions for the current run, oldest first
    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    // --- subscription ---

    /// Register a notification callback; returns the handle for
    /// [`unsubscribe`](StoryMachine::unsubscribe)
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&StoryEvent) + Send + 'static,
    {
        self.subscribers.subscribe(Box::new(callback))
    }

    /// Remove a subscriber; returns false if the handle was already gone
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    // --- commands ---

    /// Load a story into an idle machine
    ///
    /// Validates the story shape, resets the session (pointer, analytics,
    /// history) and parks the machine in the loading state until `play()`.
    /// A machine that already holds a story must be `reset()` first.
    pub fn load_story(&mut self, story: Story) -> Result<(), CommandError> {
        if self.state != MachineState::Idle {
            warn!(state = %self.state, "load_story rejected: machine is not idle");
            return Err(CommandError::InvalidTransition {
                command: "load_story",
                from: self.state,
            });
        }

        if let Err(violations) = story.validate() {
            warn!(story = %story.id, count = violations.len(), "story failed validation");
            self.transition(
                MachineState::Error,
                json!({ "violations": violations.clone() }),
            )?;
            return Err(CommandError::InvalidStory { violations });
        }

        self.cancel_auto_advance();
        self.paused_at = None;
        self.history.clear();
        self.analytics = PlaybackAnalytics::for_story(story.steps.len());
        self.current_step = 0;

        let story = Arc::new(story);
        self.story = Some(story.clone());
        self.transition(MachineState::Loading, json!({ "story": story.id.clone() }))?;
        debug!(story = %story.id, steps = story.steps.len(), "story loaded");
        self.subscribers.emit(&StoryEvent::StoryInitialized { story });
        Ok(())
    }

    /// Start, resume, or restart playback
    ///
    /// Legal from the loaded state (start), paused (resume at the same
    /// step), and finished (replay from step 0 with completed-step count
    /// reset). Executes the current step immediately.
    pub fn play(&mut self) -> Result<(), CommandError> {
        let from = self.state;
        if !matches!(
            from,
            MachineState::Loading | MachineState::Paused | MachineState::Finished
        ) {
            warn!(state = %from, "play rejected");
            return Err(CommandError::InvalidTransition {
                command: "play",
                from,
            });
        }
        let story = match &self.story {
            Some(story) => story.clone(),
            None => {
                return Err(CommandError::InvalidTransition {
                    command: "play",
                    from,
                })
            }
        };

        if self.analytics.start_time.is_none() {
            self.analytics.start_time = Some(Utc::now());
        }
        if from == MachineState::Paused {
            self.fold_pause_span();
        }
        if from == MachineState::Finished {
            // replay, not resume
            self.current_step = 0;
            self.analytics.completed_steps = 0;
            self.analytics.total_duration_ms = None;
        }

        self.transition(MachineState::Playing, json!({ "from": from.to_string() }))?;

        let step = story.steps[self.current_step].clone();
        self.subscribers.emit(&StoryEvent::PlaybackStarted {
            story,
            step,
            step_index: self.current_step,
        });
        self.execute_current_step();
        Ok(())
    }

    /// Pause playback, cancelling any pending auto-advance
    pub fn pause(&mut self) -> Result<(), CommandError> {
        if self.state != MachineState::Playing {
            warn!(state = %self.state, "pause rejected");
            return Err(CommandError::InvalidTransition {
                command: "pause",
                from: self.state,
            });
        }

        self.cancel_auto_advance();
        self.analytics.pause_count += 1;
        self.paused_at = Some(Utc::now());
        self.transition(MachineState::Paused, json!({ "step": self.current_step }))?;
        Ok(())
    }

    /// Advance to the next step; at the last step this finishes the story
    pub fn next(&mut self) -> Result<(), CommandError> {
        let from = self.state;
        if !matches!(from, MachineState::Playing | MachineState::Paused) {
            warn!(state = %from, "next rejected");
            return Err(CommandError::InvalidTransition {
                command: "next",
                from,
            });
        }
        let story = match &self.story {
            Some(story) => story.clone(),
            None => {
                return Err(CommandError::InvalidTransition {
                    command: "next",
                    from,
                })
            }
        };

        if self.current_step + 1 >= story.steps.len() {
            return self.finish();
        }

        self.analytics.completed_steps += 1;
        self.current_step += 1;

        let step = story.steps[self.current_step].clone();
        let progress = self.progress();
        self.subscribers.emit(&StoryEvent::StepChanged {
            step,
            step_index: self.current_step,
            progress,
        });
        if from == MachineState::Playing {
            self.execute_current_step();
        }
        Ok(())
    }

    /// Move back one step
    pub fn prev(&mut self) -> Result<(), CommandError> {
        let from = self.state;
        if !matches!(from, MachineState::Playing | MachineState::Paused) {
            warn!(state = %from, "prev rejected");
            return Err(CommandError::InvalidTransition {
                command: "prev",
                from,
            });
        }
        let story = match &self.story {
            Some(story) => story.clone(),
            None => {
                return Err(CommandError::InvalidTransition {
                    command: "prev",
                    from,
                })
            }
        };

        if self.current_step == 0 {
            warn!("prev rejected: already at the first step");
            return Err(CommandError::OutOfRange {
                target: -1,
                len: story.steps.len(),
            });
        }

        self.current_step -= 1;
        self.analytics.completed_steps = self.analytics.completed_steps.saturating_sub(1);

        let step = story.steps[self.current_step].clone();
        let progress = self.progress();
        self.subscribers.emit(&StoryEvent::StepChanged {
            step,
            step_index: self.current_step,
            progress,
        });
        if from == MachineState::Playing {
            self.execute_current_step();
        }
        Ok(())
    }

    /// Jump the pointer to an arbitrary step
    ///
    /// Forward jumps add the skipped distance to the skip counter; the
    /// completed-step count is set to the target index either way.
    pub fn skip_to(&mut self, index: usize) -> Result<(), CommandError> {
        let from = self.state;
        if !matches!(from, MachineState::Playing | MachineState::Paused) {
            warn!(state = %from, "skip_to rejected");
            return Err(CommandError::InvalidTransition {
                command: "skip_to",
                from,
            });
        }
        let story = match &self.story {
            Some(story) => story.clone(),
            None => {
                return Err(CommandError::InvalidTransition {
                    command: "skip_to",
                    from,
                })
            }
        };

        if index >= story.steps.len() {
            warn!(index, len = story.steps.len(), "skip_to rejected: out of range");
            return Err(CommandError::OutOfRange {
                target: index as i64,
                len: story.steps.len(),
            });
        }

        let from_index = self.current_step;
        if index > from_index {
            self.analytics.skipped_steps += index - from_index;
        }
        self.analytics.completed_steps = index;
        self.current_step = index;

        let step = story.steps[index].clone();
        let progress = self.progress();
        self.subscribers.emit(&StoryEvent::StepSkipped {
            from_index,
            to_index: index,
            step,
            progress,
        });
        if from == MachineState::Playing {
            self.execute_current_step();
        }
        Ok(())
    }

    /// End the run, parking the pointer past the last step
    pub fn finish(&mut self) -> Result<(), CommandError> {
        let from = self.state;
        if !matches!(from, MachineState::Playing | MachineState::Paused) {
            warn!(state = %from, "finish rejected");
            return Err(CommandError::InvalidTransition {
                command: "finish",
                from,
            });
        }

        self.cancel_auto_advance();
        if from == MachineState::Paused {
            self.fold_pause_span();
        }
        if let Some(start) = self.analytics.start_time {
            let elapsed = Utc::now().signed_duration_since(start);
            self.analytics.total_duration_ms = Some(elapsed.num_milliseconds().max(0) as u64);
        }

        self.transition(
            MachineState::Finished,
            json!({ "completed_steps": self.analytics.completed_steps }),
        )?;
        self.current_step = self.story.as_ref().map(|s| s.steps.len()).unwrap_or(0);

        let analytics = self.analytics.clone();
        let progress = self.progress();
        debug!(story = self.story.as_ref().map(|s| s.id.as_str()), "story finished");
        self.subscribers
            .emit(&StoryEvent::StoryFinished { analytics, progress });
        Ok(())
    }

    /// Designated escape hatch: unconditionally return to idle
    ///
    /// Bypasses the transition table, clears the story and step pointer,
    /// and cancels any pending auto-advance. Analytics survive until the
    /// next successful load so an abandoned run stays inspectable.
    pub fn reset(&mut self) -> Result<(), CommandError> {
        let from = self.state;
        self.cancel_auto_advance();
        self.paused_at = None;
        self.story = None;
        self.current_step = 0;
        self.apply_transition(from, MachineState::Idle, json!({ "reason": "reset" }));
        Ok(())
    }

    // --- auto-advance ---

    /// Fire an expired auto-advance deadline against the wall clock
    ///
    /// Hosts call this periodically; it is cheap when nothing is pending.
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Clock-injected variant of [`update`](StoryMachine::update)
    pub fn update_at(&mut self, now: Instant) {
        let pending = match self.auto_advance {
            Some(pending) => pending,
            None => return,
        };
        if now < pending.deadline {
            return;
        }

        self.auto_advance = None;
        if self.state != MachineState::Playing || pending.step_index != self.current_step {
            debug!(armed_for = pending.step_index, "stale auto-advance discarded");
            return;
        }

        debug!(step = pending.step_index, "auto-advance fired");
        if let Err(err) = self.next() {
            warn!(%err, "auto-advance could not advance");
        }
    }

    /// Emit the execute-step handoff and arm the step's deadline
    fn execute_current_step(&mut self) {
        let (story, step) = match &self.story {
            Some(story) => (story.clone(), story.steps[self.current_step].clone()),
            None => return,
        };
        let step_index = self.current_step;

        self.subscribers.emit(&StoryEvent::ExecuteStep {
            story,
            step: step.clone(),
            step_index,
        });
        self.arm_auto_advance(&step, step_index);
    }

    /// Replace any pending deadline with this step's, or clear it
    fn arm_auto_advance(&mut self, step: &Step, step_index: usize) {
        self.cancel_auto_advance();
        if self.state != MachineState::Playing {
            return;
        }
        if let Some(delay) = step.auto_advance() {
            self.auto_advance = Some(AutoAdvance {
                deadline: Instant::now() + delay,
                step_index,
            });
            debug!(step = step_index, delay_ms = delay.as_millis() as u64, "auto-advance armed");
        }
    }

    fn cancel_auto_advance(&mut self) {
        self.auto_advance = None;
    }

    // --- transitions ---

    /// Apply a table-checked transition
    fn transition(&mut self, to: MachineState, context: Value) -> Result<(), CommandError> {
        let from = self.state;
        if !from.can_transition_to(to) {
            warn!(%from, %to, "transition rejected");
            return Err(CommandError::InvalidTransition {
                command: "transition",
                from,
            });
        }
        self.apply_transition(from, to, context);
        Ok(())
    }

    /// Record and announce a transition; `reset` uses this directly to skip
    /// the table check
    fn apply_transition(&mut self, from: MachineState, to: MachineState, context: Value) {
        self.state = to;
        self.history.push(TransitionRecord {
            from,
            to,
            timestamp: Utc::now(),
            context: context.clone(),
        });
        debug!(%from, %to, "state changed");

        self.subscribers.emit(&StoryEvent::StateChanged {
            from,
            to,
            context: context.clone(),
        });
        self.subscribers.emit(&StoryEvent::StateExited {
            state: from,
            context: context.clone(),
        });
        self.subscribers
            .emit(&StoryEvent::StateEntered { state: to, context });
    }

    /// Fold an open pause span into the pause-time counter
    fn fold_pause_span(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            let span = Utc::now().signed_duration_since(paused_at);
            self.analytics.total_pause_ms += span.num_milliseconds().max(0) as u64;
        }
    }
}
