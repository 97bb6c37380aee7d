//! Property-based tests for the lifecycle machine

use super::*;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_phase() -> impl Strategy<Value = SessionPhase> {
    prop_oneof![
        Just(SessionPhase::Idle),
        Just(SessionPhase::Connecting),
        Just(SessionPhase::Active),
        Just(SessionPhase::TimedOut),
        Just(SessionPhase::Ended),
    ]
}

fn arb_event() -> impl Strategy<Value = LifecycleEvent> {
    prop_oneof![
        Just(LifecycleEvent::StartRequested),
        Just(LifecycleEvent::ConnectionEstablished),
        Just(LifecycleEvent::DeadlineElapsed),
        Just(LifecycleEvent::EndRequested),
        Just(LifecycleEvent::RemoteClosed),
    ]
}

/// Phases ordered by forward progress; both terminal phases share the top
/// rank since neither can follow the other.
fn rank(phase: SessionPhase) -> u8 {
    match phase {
        SessionPhase::Idle => 0,
        SessionPhase::Connecting => 1,
        SessionPhase::Active => 2,
        SessionPhase::TimedOut | SessionPhase::Ended => 3,
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Terminal phases accept nothing except the idempotent end.
    #[test]
    fn terminal_phases_absorb(phase in arb_phase(), event in arb_event()) {
        prop_assume!(phase.is_terminal());
        match transition(phase, event) {
            Ok(t) => {
                prop_assert_eq!(phase, SessionPhase::Ended);
                prop_assert_eq!(event, LifecycleEvent::EndRequested);
                prop_assert_eq!(t.next, SessionPhase::Ended);
                prop_assert!(t.effects.is_empty());
            }
            Err(LifecycleError::InvalidTransition { phase: p, event: e }) => {
                prop_assert_eq!(p, phase);
                prop_assert_eq!(e, event);
            }
        }
    }

    /// The deadline is armed exactly when a start is accepted from idle.
    #[test]
    fn deadline_armed_only_on_start(phase in arb_phase(), event in arb_event()) {
        if let Ok(t) = transition(phase, event) {
            let armed = t.effects.contains(&LifecycleEffect::ArmDeadline);
            let started = phase == SessionPhase::Idle
                && event == LifecycleEvent::StartRequested;
            prop_assert_eq!(armed, started);
        }
    }

    /// The deadline is cancelled exactly when the connection comes up.
    #[test]
    fn deadline_cancelled_only_on_connect(phase in arb_phase(), event in arb_event()) {
        if let Ok(t) = transition(phase, event) {
            let cancelled = t.effects.contains(&LifecycleEffect::CancelDeadline);
            let connected = phase == SessionPhase::Connecting
                && event == LifecycleEvent::ConnectionEstablished;
            prop_assert_eq!(cancelled, connected);
        }
    }

    /// `TimedOut` is reachable only from `Connecting` via the deadline.
    #[test]
    fn timed_out_has_one_way_in(phase in arb_phase(), event in arb_event()) {
        if let Ok(t) = transition(phase, event) {
            if t.next == SessionPhase::TimedOut {
                prop_assert_eq!(phase, SessionPhase::Connecting);
                prop_assert_eq!(event, LifecycleEvent::DeadlineElapsed);
            }
        }
    }

    /// Folding any event sequence from idle, the phase only moves forward
    /// and never leaves a terminal phase.
    #[test]
    fn phase_progress_is_monotonic(
        events in proptest::collection::vec(arb_event(), 0..24),
    ) {
        let mut phase = SessionPhase::Idle;
        for event in events {
            let before = phase;
            if let Ok(t) = transition(phase, event) {
                phase = t.next;
            }
            prop_assert!(rank(phase) >= rank(before));
            if before.is_terminal() {
                prop_assert_eq!(phase, before);
            }
        }
    }
}
