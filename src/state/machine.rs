use std::collections::VecDeque;

use super::error::{StateError, StateResult};
use super::{PhaseTransition, SessionEvent, SessionPhase};

const TRANSITION_HISTORY_LIMIT: usize = 64;

#[derive(Debug)]
pub struct StateMachine {
    state: SessionPhase,
    transition_history: VecDeque<PhaseTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionPhase::default(),
            transition_history: VecDeque::new(),
        }
    }

    pub fn state(&self) -> SessionPhase {
        self.state
    }

    pub fn can_transition(&self, event: SessionEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: SessionEvent) -> Option<SessionPhase> {
        use SessionEvent::*;
        use SessionPhase::{Error, Generating, Idle};
        match (self.state, event) {
            (Idle | Error, Generate) => Some(Generating),
            (Generating, Succeed | Discard) => Some(Idle),
            (Generating, Fail) => Some(Error),
            (Idle | Error, Reject) => Some(Error),
            (Error, Dismiss) => Some(Idle),
            (Idle | Error, Navigate) => Some(Idle),
            // The call is still outstanding; navigation only supersedes its result.
            (Generating, Navigate) => Some(Generating),
            _ => None,
        }
    }

    pub fn transition(&mut self, event: SessionEvent) -> StateResult<SessionPhase> {
        tracing::debug!(from = ?self.state, event = ?event, "request phase transition");
        let next = self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid phase transition requested");
            StateError::InvalidStateTransition { from, event }
        })?;

        if self.transition_history.len() == TRANSITION_HISTORY_LIMIT {
            self.transition_history.pop_front();
        }
        self.transition_history
            .push_back(PhaseTransition::new(self.state, event, next));
        self.state = next;

        Ok(self.state)
    }

    pub fn recent_transitions(&self) -> impl Iterator<Item = &PhaseTransition> {
        self.transition_history.iter()
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionPhase::{:?}", self.state)
    }
}
