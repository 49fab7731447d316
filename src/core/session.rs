use chrono::{DateTime, Utc};
use serde::Serialize;

/// Engagement counters for one playback run
///
/// Reset by a successful story load, not by `reset()`, so the numbers from
/// an abandoned run stay readable until the next story replaces them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackAnalytics {
    /// Steps in the loaded story
    pub total_steps: usize,

    /// Steps advanced past via `next()` (decremented by `prev()`)
    pub completed_steps: usize,

    /// Steps jumped over by forward `skip_to()` calls
    pub skipped_steps: usize,

    /// Times playback was paused
    pub pause_count: u32,

    /// Wall-clock time of the first `play()`
    pub start_time: Option<DateTime<Utc>>,

    /// Accumulated time spent paused, in milliseconds
    pub total_pause_ms: u64,

    /// Elapsed time from first play to finish, in milliseconds
    pub total_duration_ms: Option<u64>,
}

impl PlaybackAnalytics {
    /// Fresh counters for a story with `total_steps` steps
    pub fn for_story(total_steps: usize) -> Self {
        Self {
            total_steps,
            ..Self::default()
        }
    }
}
