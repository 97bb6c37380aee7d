//! Effects produced by phase transitions

/// Timer work the runtime performs after applying a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEffect {
    /// Schedule the single connection-deadline callback.
    ArmDeadline,
    /// Cancel the pending deadline callback.
    CancelDeadline,
}
