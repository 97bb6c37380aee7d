//! Pure phase transition function

use super::{LifecycleEffect, LifecycleEvent, SessionPhase};
use thiserror::Error;

/// Result of a phase transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionPhase,
    pub effects: Vec<LifecycleEffect>,
}

impl Transition {
    fn to(next: SessionPhase) -> Self {
        Self {
            next,
            effects: vec![],
        }
    }

    fn with_effect(mut self, effect: LifecycleEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// A lifecycle operation invoked from a phase that does not permit it.
/// Reported as a no-op; the machine is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("{event:?} is not valid while {phase:?}")]
    InvalidTransition {
        phase: SessionPhase,
        event: LifecycleEvent,
    },
}

/// Pure transition function: same inputs, same outputs, no I/O.
///
/// The deadline timer is armed exactly on entry to `Connecting` and
/// cancelled on the transition to `Active`; the runtime's teardown guard
/// covers every other way out. A stale `DeadlineElapsed` delivered after
/// leaving `Connecting` is rejected here, so `TimedOut` can be entered at
/// most once.
pub fn transition(
    phase: SessionPhase,
    event: LifecycleEvent,
) -> Result<Transition, LifecycleError> {
    use self::LifecycleEvent::{
        ConnectionEstablished, DeadlineElapsed, EndRequested, RemoteClosed, StartRequested,
    };
    use self::SessionPhase::{Active, Connecting, Ended, Idle, TimedOut};

    match (phase, event) {
        (Idle, StartRequested) => {
            Ok(Transition::to(Connecting).with_effect(LifecycleEffect::ArmDeadline))
        }
        (Connecting, ConnectionEstablished) => {
            Ok(Transition::to(Active).with_effect(LifecycleEffect::CancelDeadline))
        }
        (Connecting, DeadlineElapsed) => Ok(Transition::to(TimedOut)),
        (Active, EndRequested | RemoteClosed) => Ok(Transition::to(Ended)),
        // Ending an already-ended session is a no-op, not misuse.
        (Ended, EndRequested) => Ok(Transition::to(Ended)),
        (phase, event) => Err(LifecycleError::InvalidTransition { phase, event }),
    }
}
