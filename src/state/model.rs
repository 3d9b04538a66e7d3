#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// A generation call is in flight.
    Generating,
    /// The last action failed; a message is waiting to be dismissed.
    Error,
}

impl SessionPhase {
    pub const fn is_generating(self) -> bool {
        matches!(self, Self::Generating)
    }
}
