use thiserror::Error;

use crate::playback::MachineState;

/// Failures reported by machine commands
///
/// All variants are recoverable. A failed command never transitions the
/// machine (except a failed load, which parks it in the error state) and
/// never panics; callers check the returned `Result` or watch for the
/// absence of a state-change notification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    /// The transition table has no edge for this command from the current state
    #[error("cannot {command} while {from}")]
    InvalidTransition {
        command: &'static str,
        from: MachineState,
    },

    /// The story failed shape validation during load
    #[error("invalid story: {}", .violations.join("; "))]
    InvalidStory { violations: Vec<String> },

    /// A step index outside the story, or a boundary move with nowhere to go
    #[error("target step {target} out of range (story has {len} steps)")]
    OutOfRange { target: i64, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CommandError::InvalidTransition {
            command: "pause",
            from: MachineState::Idle,
        };
        assert_eq!(err.to_string(), "cannot pause while idle");

        let err = CommandError::InvalidStory {
            violations: vec!["story id is empty".into(), "story has no steps".into()],
        };
        assert_eq!(
            err.to_string(),
            "invalid story: story id is empty; story has no steps"
        );

        let err = CommandError::OutOfRange { target: -1, len: 3 };
        assert_eq!(
            err.to_string(),
            "target step -1 out of range (story has 3 steps)"
        );
    }
}
