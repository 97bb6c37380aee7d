//! Session phase

use serde::{Deserialize, Serialize};

/// Coarse-grained connection phase of one session.
///
/// `TimedOut` and `Ended` are terminal: no session restarts an existing
/// lifecycle instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Connecting,
    Active,
    TimedOut,
    Ended,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::TimedOut | SessionPhase::Ended)
    }

    /// Whether the session still accepts new conversational input.
    pub fn is_accepting_input(self) -> bool {
        matches!(self, SessionPhase::Active)
    }
}
