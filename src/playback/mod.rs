pub mod driver;
pub mod error;
pub mod events;
pub mod machine;

pub use driver::PlaybackDriver;
pub use error::CommandError;
pub use events::{StoryEvent, SubscriptionId};
pub use machine::StoryMachine;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineState {
    /// No story loaded
    Idle,
    /// A story is loaded and waiting for `play()`
    Loading,
    Playing,
    Paused,
    Finished,
    /// A recoverable fault (e.g. story validation); `reset()` leaves it
    Error,
}

impl MachineState {
    /// Whether the transition table allows moving from this state to `to`
    ///
    /// `reset()` deliberately bypasses this check; every other command goes
    /// through it.
    pub fn can_transition_to(self, to: MachineState) -> bool {
        use MachineState::*;
        matches!(
            (self, to),
            (Idle, Loading)
                | (Idle, Error)
                | (Loading, Playing)
                | (Loading, Error)
                | (Loading, Idle)
                | (Playing, Paused)
                | (Playing, Finished)
                | (Playing, Error)
                | (Playing, Idle)
                | (Paused, Playing)
                | (Paused, Finished)
                | (Paused, Error)
                | (Paused, Idle)
                | (Finished, Idle)
                | (Finished, Playing)
                | (Error, Idle)
        )
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MachineState::Idle => "idle",
            MachineState::Loading => "loading",
            MachineState::Playing => "playing",
            MachineState::Paused => "paused",
            MachineState::Finished => "finished",
            MachineState::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// One entry in the machine's transition history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub from: MachineState,
    pub to: MachineState,
    pub timestamp: DateTime<Utc>,
    /// Command-specific details, e.g. validation violations or the step index
    pub context: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use MachineState::*;

    const ALL: [MachineState; 6] = [Idle, Loading, Playing, Paused, Finished, Error];

    #[test]
    fn test_transition_table_matches_design() {
        let allowed: &[(MachineState, &[MachineState])] = &[
            (Idle, &[Loading, Error]),
            (Loading, &[Playing, Error, Idle]),
            (Playing, &[Paused, Finished, Error, Idle]),
            (Paused, &[Playing, Finished, Error, Idle]),
            (Finished, &[Idle, Playing]),
            (Error, &[Idle]),
        ];

        for (from, targets) in allowed {
            for to in ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    targets.contains(&to),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_no_state_is_terminal() {
        // every state has at least one way back into the graph
        for from in ALL {
            assert!(
                ALL.iter().any(|&to| from.can_transition_to(to)),
                "{} has no outgoing transitions",
                from
            );
        }
    }
}
