//! Session runtime
//!
//! One event loop per session: it consumes raw conversational events and
//! lifecycle commands from a single channel, applies transitions, executes
//! timer effects, and pushes a fresh projection to subscribers after every
//! applied mutation. Sessions share nothing; each runtime owns its own
//! reconciler + lifecycle pair.

mod executor;
mod source;
mod updates;

#[cfg(test)]
mod testing;

pub use executor::SessionRuntime;
pub use source::{drive, EventSource};
pub use updates::{updates_stream, SessionUpdate};

use crate::config::SessionConfig;
use crate::diagnostics::SessionDiagnostics;
use crate::lifecycle::LifecycleEvent;
use crate::transcript::{Origin, ReceivedMessage};
use crate::view::AgentActivity;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

/// Inputs consumed by the session event loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A raw conversational event from the media session.
    Message(ReceivedMessage),
    /// A lifecycle input (start, connected, deadline, end).
    Lifecycle(LifecycleEvent),
    /// The remote agent's activity changed.
    AgentActivity(AgentActivity),
}

/// Errors surfaced to handle callers.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The runtime's event loop has shut down; nothing can be delivered.
    #[error("session runtime has shut down")]
    Closed,
    /// Typed chat is disabled for this session.
    #[error("chat input is not enabled for this session")]
    ChatUnavailable,
    /// Chat messages must carry text.
    #[error("chat message is empty")]
    ChatEmpty,
}

/// Cloneable handle to a running session.
///
/// All operations enqueue onto the session's event loop; per-event
/// failures inside the loop are reported as [`SessionUpdate::Rejected`]
/// rather than through these results.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    config: SessionConfig,
    event_tx: mpsc::Sender<SessionEvent>,
    update_tx: broadcast::Sender<SessionUpdate>,
    diagnostics: Arc<SessionDiagnostics>,
}

impl SessionHandle {
    /// Ask the session to connect; arms the connection deadline.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.send_lifecycle(LifecycleEvent::StartRequested).await
    }

    /// Report that the underlying media session came up.
    pub async fn mark_connected(&self) -> Result<(), SessionError> {
        self.send_lifecycle(LifecycleEvent::ConnectionEstablished)
            .await
    }

    /// End the session. Idempotent once ended.
    pub async fn end(&self) -> Result<(), SessionError> {
        self.send_lifecycle(LifecycleEvent::EndRequested).await
    }

    /// Report that the remote side tore the session down.
    pub async fn remote_closed(&self) -> Result<(), SessionError> {
        self.send_lifecycle(LifecycleEvent::RemoteClosed).await
    }

    /// Deliver one raw conversational event.
    pub async fn ingest(&self, message: ReceivedMessage) -> Result<(), SessionError> {
        self.send(SessionEvent::Message(message)).await
    }

    /// Send a typed chat message from the local participant.
    ///
    /// Blank messages and sessions without chat input are rejected here;
    /// phase gating happens in the loop like any other event.
    pub async fn send_chat(&self, text: &str) -> Result<(), SessionError> {
        if !self.config.supports_chat_input {
            return Err(SessionError::ChatUnavailable);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::ChatEmpty);
        }
        let message = ReceivedMessage::new(
            uuid::Uuid::new_v4().to_string(),
            Origin::Local,
            Utc::now().timestamp_millis(),
            text,
        );
        self.ingest(message).await
    }

    /// Report the remote agent's current activity.
    pub async fn agent_activity(&self, activity: AgentActivity) -> Result<(), SessionError> {
        self.send(SessionEvent::AgentActivity(activity)).await
    }

    /// Subscribe to pushed updates. Each applied mutation delivers a fresh
    /// projection; use [`crate::view::TranscriptView::initial`] to render
    /// before the first one arrives.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.update_tx.subscribe()
    }

    /// The session-scoped diagnostics handle.
    pub fn diagnostics(&self) -> Arc<SessionDiagnostics> {
        Arc::clone(&self.diagnostics)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn send_lifecycle(&self, event: LifecycleEvent) -> Result<(), SessionError> {
        self.send(SessionEvent::Lifecycle(event)).await
    }

    async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| SessionError::Closed)
    }
}
