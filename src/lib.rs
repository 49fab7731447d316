//! Earth story playback engine
//!
//! Plays ordered narrative "stories" over climate event data: load a story,
//! then drive it with play/pause/next/prev/skip while a state machine
//! enforces the legal transitions, keeps engagement analytics, and fires
//! per-step auto-advance deadlines. Observers subscribe for notifications
//! and render the steps however they like; the engine itself never touches
//! a display.

pub mod core;
pub mod input;
pub mod playback;
pub mod render;

pub use crate::core::{
    ClimateEvent, EventKind, EventStore, Instrument, PlaybackAnalytics, Severity, Step, Story,
};
pub use crate::playback::{
    CommandError, MachineState, PlaybackDriver, StoryEvent, StoryMachine, SubscriptionId,
    TransitionRecord,
};
pub use crate::render::{ConsoleRenderer, RecordingRenderer, StepRenderer};
