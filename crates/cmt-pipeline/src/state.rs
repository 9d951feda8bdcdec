//! Run state machine
//!
//! `Idle -> Running -> {Published, FailedNoCandidates, FailedFetch, Superseded}`.
//! Terminal states have no exits; a new trigger starts a fresh run at `Idle`.

use std::fmt;

/// Lifecycle of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Running,
    Published,
    FailedNoCandidates,
    FailedFetch,
    /// Finished after a newer run had already published (guarded policy only)
    Superseded,
}

impl RunState {
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty() && self != Self::Idle
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Published => "published",
            Self::FailedNoCandidates => "failed:no-candidates",
            Self::FailedFetch => "failed:fetch",
            Self::Superseded => "superseded",
        };
        f.write_str(name)
    }
}

/// Illegal transition attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal run transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: RunState,
    pub to: RunState,
}

/// Validates a state transition.
///
/// # Errors
/// [`IllegalTransition`] when `to` is not reachable from `from`.
pub fn validate_transition(from: RunState, to: RunState) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

#[must_use]
pub fn allowed_transitions(from: RunState) -> Vec<RunState> {
    use RunState::*;
    match from {
        Idle => vec![Running],
        Running => vec![Published, FailedNoCandidates, FailedFetch, Superseded],
        Published | FailedNoCandidates | FailedFetch | Superseded => vec![],
    }
}
