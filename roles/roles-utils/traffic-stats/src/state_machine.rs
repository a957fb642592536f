//! Poll loop lifecycle
//!
//! States:
//! - Idle: created, no fetch issued yet
//! - Fetching: one snapshot request in flight
//! - Parsed: snapshot received, aggregation and reporting pending
//! - Failed: fetch failed, advisory pending
//! - Waiting: sleeping for the poll interval or the retry backoff
//! - Stopped: cancelled, terminal

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Fetching,
    Parsed,
    Failed,
    Waiting,
    Stopped,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollState::Idle => write!(f, "Idle"),
            PollState::Fetching => write!(f, "Fetching"),
            PollState::Parsed => write!(f, "Parsed"),
            PollState::Failed => write!(f, "Failed"),
            PollState::Waiting => write!(f, "Waiting"),
            PollState::Stopped => write!(f, "Stopped"),
        }
    }
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Stopped)
    }

    /// Whether the loop may move from `self` to `next` in one step.
    ///
    /// Cancellation is only observed at Idle and Waiting, so an in-flight
    /// fetch or a pending report always completes first.
    pub fn can_transition_to(&self, next: PollState) -> bool {
        use PollState::*;
        matches!(
            (self, next),
            (Idle, Fetching)
                | (Idle, Stopped)
                | (Fetching, Parsed)
                | (Fetching, Failed)
                | (Parsed, Waiting)
                | (Failed, Waiting)
                | (Waiting, Fetching)
                | (Waiting, Stopped)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_transitions() {
        assert!(PollState::Idle.can_transition_to(PollState::Fetching));
        assert!(PollState::Fetching.can_transition_to(PollState::Parsed));
        assert!(PollState::Fetching.can_transition_to(PollState::Failed));
        assert!(PollState::Parsed.can_transition_to(PollState::Waiting));
        assert!(PollState::Failed.can_transition_to(PollState::Waiting));
        assert!(PollState::Waiting.can_transition_to(PollState::Fetching));
    }

    #[test]
    fn test_cannot_stop_mid_cycle() {
        assert!(!PollState::Fetching.can_transition_to(PollState::Stopped));
        assert!(!PollState::Parsed.can_transition_to(PollState::Stopped));
        assert!(!PollState::Failed.can_transition_to(PollState::Stopped));
        assert!(PollState::Waiting.can_transition_to(PollState::Stopped));
    }

    #[test]
    fn test_stopped_is_terminal() {
        assert!(PollState::Stopped.is_terminal());
        for next in [
            PollState::Idle,
            PollState::Fetching,
            PollState::Waiting,
            PollState::Stopped,
        ] {
            assert!(!PollState::Stopped.can_transition_to(next));
        }
    }

    #[test]
    fn test_no_fetch_without_waiting() {
        assert!(!PollState::Parsed.can_transition_to(PollState::Fetching));
        assert!(!PollState::Failed.can_transition_to(PollState::Fetching));
    }

    #[test]
    fn test_display() {
        assert_eq!(PollState::Waiting.to_string(), "Waiting");
    }
}
