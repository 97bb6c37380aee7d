//! Events that drive phase transitions

/// Inputs to the lifecycle machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The application asked the session to connect.
    StartRequested,
    /// The underlying media session came up.
    ConnectionEstablished,
    /// The connection deadline fired before the session became active.
    DeadlineElapsed,
    /// The application ended the session.
    EndRequested,
    /// The remote side tore the session down.
    RemoteClosed,
}
