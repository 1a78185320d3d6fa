use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one session as seen by this client
///
/// Moves forward through `Idle -> Starting -> Active -> Stopping -> Completed`
/// (steps may be skipped, never revisited) or to `Error` from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Starting,
    Active,
    Stopping,
    Completed,
    Error,
}

impl SessionStatus {
    /// Completed and Error accept no further transitions or chunks.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Starting => 1,
            Self::Active => 2,
            Self::Stopping => 3,
            Self::Completed => 4,
            Self::Error => 5,
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: SessionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Error => true,
            _ => next.rank() > self.rank(),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::Stopping => "stopping",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(SessionStatus::Idle.can_advance_to(SessionStatus::Starting));
        assert!(SessionStatus::Starting.can_advance_to(SessionStatus::Active));
        assert!(SessionStatus::Active.can_advance_to(SessionStatus::Stopping));
        assert!(SessionStatus::Stopping.can_advance_to(SessionStatus::Completed));
        // Summary may arrive before a stop was requested locally
        assert!(SessionStatus::Active.can_advance_to(SessionStatus::Completed));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!SessionStatus::Active.can_advance_to(SessionStatus::Starting));
        assert!(!SessionStatus::Stopping.can_advance_to(SessionStatus::Active));
        assert!(!SessionStatus::Active.can_advance_to(SessionStatus::Active));
    }

    #[test]
    fn test_error_from_any_non_terminal_state() {
        for status in [
            SessionStatus::Idle,
            SessionStatus::Starting,
            SessionStatus::Active,
            SessionStatus::Stopping,
        ] {
            assert!(status.can_advance_to(SessionStatus::Error), "{}", status);
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in [SessionStatus::Error, SessionStatus::Completed, SessionStatus::Active] {
            assert!(!SessionStatus::Completed.can_advance_to(next));
            assert!(!SessionStatus::Error.can_advance_to(next));
        }
    }
}
