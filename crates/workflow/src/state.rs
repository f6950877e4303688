//! Workflow run state machine.

use serde::{Deserialize, Serialize};

/// The state of a journaled workflow run.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          ├──► Aborted               (failed before any write)
///                          └──► NeedsReconciliation   (failed after a write)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RunState {
    /// Run has not started yet.
    #[default]
    NotStarted,

    /// Steps are being executed.
    Running,

    /// All steps completed (terminal state).
    Completed,

    /// A step failed before anything was written (terminal state).
    Aborted,

    /// A step failed after earlier steps were committed (terminal state).
    NeedsReconciliation,
}

impl RunState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Aborted | RunState::NeedsReconciliation
        )
    }

    /// Returns true if an operator should look at the run.
    ///
    /// A run still `Running` with no terminal record was interrupted
    /// (or is in flight) and may have left partial writes behind.
    pub fn needs_attention(&self) -> bool {
        matches!(self, RunState::Running | RunState::NeedsReconciliation)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::NotStarted => "NotStarted",
            RunState::Running => "Running",
            RunState::Completed => "Completed",
            RunState::Aborted => "Aborted",
            RunState::NeedsReconciliation => "NeedsReconciliation",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_not_started() {
        assert_eq!(RunState::default(), RunState::NotStarted);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!RunState::NotStarted.is_terminal());
        assert!(!RunState::Running.is_terminal());
        assert!(RunState::Completed.is_terminal());
        assert!(RunState::Aborted.is_terminal());
        assert!(RunState::NeedsReconciliation.is_terminal());
    }

    #[test]
    fn test_needs_attention() {
        assert!(RunState::Running.needs_attention());
        assert!(RunState::NeedsReconciliation.needs_attention());
        assert!(!RunState::Completed.needs_attention());
        assert!(!RunState::Aborted.needs_attention());
    }

    #[test]
    fn test_serialization() {
        let state = RunState::NeedsReconciliation;
        let json = serde_json::to_string(&state).unwrap();
        let deserialized: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, deserialized);
    }
}
