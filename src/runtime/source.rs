//! Event-source seam
//!
//! The trait the transport adapter implements to deliver conversational
//! events. The runtime never learns how events travel; it just consumes
//! them in delivery order, one `ingest` per event.

use super::{SessionError, SessionHandle};
use crate::transcript::ReceivedMessage;
use async_trait::async_trait;

/// An asynchronous feed of conversational events from the media session.
#[async_trait]
pub trait EventSource: Send {
    /// The next raw event, or `None` once the underlying session is gone.
    async fn next_event(&mut self) -> Option<ReceivedMessage>;
}

/// Pump a source into the session until the source dries up or the
/// session shuts down. Delivery order defines processing order; events
/// are never reordered or delivered concurrently.
pub async fn drive<S: EventSource>(
    mut source: S,
    handle: &SessionHandle,
) -> Result<(), SessionError> {
    while let Some(message) = source.next_event().await {
        handle.ingest(message).await?;
    }
    Ok(())
}
