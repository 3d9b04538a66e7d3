use super::model::SessionPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Readiness held and a generation call was started.
    Generate,
    Succeed,
    Fail,
    /// Readiness did not hold; nothing was sent.
    Reject,
    /// The in-flight result belonged to a superseded image and was dropped.
    Discard,
    Dismiss,
    /// Upload, undo, redo, reset or crop changed the displayed image.
    Navigate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: SessionPhase,
    pub event: SessionEvent,
    pub to: SessionPhase,
}

impl PhaseTransition {
    pub const fn new(from: SessionPhase, event: SessionEvent, to: SessionPhase) -> Self {
        Self { from, event, to }
    }
}
