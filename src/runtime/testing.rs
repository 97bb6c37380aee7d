//! Test harness for the session runtime
//!
//! Drives a real runtime over its channels, with a scripted event source
//! and paused-clock tests for the connection deadline.

use super::*;
use crate::lifecycle::SessionPhase;
use crate::transcript::{Origin, ReceivedMessage};
use crate::view::TranscriptView;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

// ============================================================================
// Scripted Event Source
// ============================================================================

/// Event source that replays a fixed script.
pub struct ScriptedSource {
    events: VecDeque<ReceivedMessage>,
}

impl ScriptedSource {
    pub fn new(events: impl IntoIterator<Item = ReceivedMessage>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn next_event(&mut self) -> Option<ReceivedMessage> {
        self.events.pop_front()
    }
}

// ============================================================================
// Test Session
// ============================================================================

/// A spawned session plus its update subscription.
pub struct TestSession {
    pub handle: SessionHandle,
    pub updates: tokio::sync::broadcast::Receiver<SessionUpdate>,
}

impl TestSession {
    pub fn spawn() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        init_tracing();
        let handle = SessionRuntime::spawn(config);
        let updates = handle.subscribe();
        Self { handle, updates }
    }

    /// Wait until a projection with the wanted phase arrives.
    pub async fn wait_for_phase(&mut self, want: SessionPhase, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.updates.recv()).await {
                Ok(Ok(SessionUpdate::Projection(view))) if view.phase == want => return true,
                Ok(Ok(_)) => continue,
                Ok(Err(_)) => return false,
                Err(_) => continue,
            }
        }
        false
    }

    /// The next projection update, skipping rejections.
    pub async fn next_projection(&mut self, timeout: Duration) -> Option<TranscriptView> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.updates.recv()).await {
                Ok(Ok(SessionUpdate::Projection(view))) => return Some(view),
                Ok(Ok(SessionUpdate::Rejected { .. })) => continue,
                Ok(Err(_)) => return None,
                Err(_) => continue,
            }
        }
        None
    }

    /// The next rejection reason, skipping projections.
    pub async fn next_rejection(&mut self, timeout: Duration) -> Option<String> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.updates.recv()).await {
                Ok(Ok(SessionUpdate::Rejected { reason })) => return Some(reason),
                Ok(Ok(SessionUpdate::Projection(_))) => continue,
                Ok(Err(_)) => return None,
                Err(_) => continue,
            }
        }
        None
    }

    /// Drain everything currently buffered without waiting.
    pub fn drain(&mut self) -> Vec<SessionUpdate> {
        let mut drained = Vec::new();
        while let Ok(update) = self.updates.try_recv() {
            drained.push(update);
        }
        drained
    }
}

/// Route runtime logs through the test writer. RUST_LOG controls verbosity.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Let spawned tasks (the runtime loop, an armed timer) catch up.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn remote(id: &str, timestamp: i64, content: &str) -> ReceivedMessage {
    ReceivedMessage::new(id, Origin::Remote, timestamp, content)
}

async fn activate(session: &mut TestSession) {
    session.handle.start().await.unwrap();
    assert!(
        session
            .wait_for_phase(SessionPhase::Connecting, Duration::from_secs(1))
            .await
    );
    session.handle.mark_connected().await.unwrap();
    assert!(
        session
            .wait_for_phase(SessionPhase::Active, Duration::from_secs(1))
            .await
    );
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::SessionPhase;
    use crate::view::AgentActivity;

    #[tokio::test(start_paused = true)]
    async fn connecting_times_out_at_the_deadline() {
        let mut session = TestSession::spawn();
        session.handle.start().await.unwrap();
        assert!(
            session
                .wait_for_phase(SessionPhase::Connecting, Duration::from_secs(1))
                .await
        );
        settle().await;

        // One millisecond short of the deadline: still connecting.
        tokio::time::advance(Duration::from_millis(199_999)).await;
        settle().await;
        assert!(session.drain().is_empty());

        tokio::time::advance(Duration::from_millis(2)).await;
        settle().await;

        let drained = session.drain();
        let timed_out: Vec<_> = drained
            .iter()
            .filter(|u| {
                matches!(u, SessionUpdate::Projection(v) if v.phase == SessionPhase::TimedOut)
            })
            .collect();
        assert_eq!(timed_out.len(), 1, "timed out exactly once");
    }

    #[tokio::test(start_paused = true)]
    async fn connecting_with_custom_deadline() {
        let mut session = TestSession::with_config(SessionConfig {
            connection_deadline: Duration::from_millis(5_000),
            ..SessionConfig::default()
        });
        session.handle.start().await.unwrap();
        assert!(
            session
                .wait_for_phase(SessionPhase::TimedOut, Duration::from_secs(60))
                .await
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connecting_before_deadline_never_times_out() {
        let mut session = TestSession::spawn();
        activate(&mut session).await;
        settle().await;

        // Long past the deadline; the cancelled timer stays quiet.
        tokio::time::advance(Duration::from_millis(400_000)).await;
        settle().await;

        assert!(session.drain().is_empty());
        let snapshot = session.handle.diagnostics().snapshot();
        assert_eq!(snapshot.invalid_transitions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_the_pending_deadline() {
        let mut session = TestSession::spawn();
        session.handle.start().await.unwrap();
        assert!(
            session
                .wait_for_phase(SessionPhase::Connecting, Duration::from_secs(1))
                .await
        );

        drop(session.handle);

        // The loop exits once every handle is gone; no timeout sneaks out
        // on the way down.
        loop {
            match session.updates.recv().await {
                Ok(SessionUpdate::Projection(view)) => {
                    assert_ne!(view.phase, SessionPhase::TimedOut);
                }
                Ok(SessionUpdate::Rejected { .. }) => {}
                Err(_) => break,
            }
        }
    }

    #[tokio::test]
    async fn transcript_flow_reaches_subscribers() {
        let mut session = TestSession::spawn();
        activate(&mut session).await;

        let mut partial = remote("1", 1000, "Hello");
        partial.is_final = false;
        session.handle.ingest(partial).await.unwrap();

        let view = session
            .next_projection(Duration::from_secs(1))
            .await
            .expect("projection after append");
        assert_eq!(view.turns.len(), 1);
        assert_eq!(view.turns[0].content, "Hello");
        assert!(!view.turns[0].is_final);
        assert!(view.is_accepting_input);

        let mut revision = remote("1", 1050, "Hello there");
        revision.edit_timestamp = Some(1050);
        session.handle.ingest(revision).await.unwrap();

        let view = session
            .next_projection(Duration::from_secs(1))
            .await
            .expect("projection after edit");
        assert_eq!(view.turns.len(), 1);
        assert_eq!(view.turns[0].content, "Hello there");
        assert!(view.turns[0].has_been_edited());
        assert_eq!(view.latest_turn().unwrap().id, "1");

        let snapshot = session.handle.diagnostics().snapshot();
        assert_eq!(snapshot.turns_appended, 1);
        assert_eq!(snapshot.edits_applied, 1);
    }

    #[tokio::test]
    async fn identical_redelivery_pushes_nothing() {
        let mut session = TestSession::spawn();
        activate(&mut session).await;

        let message = remote("1", 1000, "Hello");
        session.handle.ingest(message.clone()).await.unwrap();
        session.handle.ingest(message).await.unwrap();
        settle().await;

        let projections = session
            .drain()
            .into_iter()
            .filter(|u| matches!(u, SessionUpdate::Projection(_)))
            .count();
        assert_eq!(projections, 1);
        assert_eq!(session.handle.diagnostics().snapshot().duplicates_ignored, 1);
    }

    #[tokio::test]
    async fn malformed_event_is_reported_not_dropped() {
        let mut session = TestSession::spawn();
        activate(&mut session).await;

        session
            .handle
            .ingest(remote("", 1000, "lost"))
            .await
            .unwrap();
        let reason = session
            .next_rejection(Duration::from_secs(1))
            .await
            .expect("rejection surfaced");
        assert!(reason.contains("malformed"));
        assert_eq!(session.handle.diagnostics().snapshot().events_rejected, 1);

        // The session keeps going.
        session.handle.ingest(remote("1", 1000, "kept")).await.unwrap();
        let view = session.next_projection(Duration::from_secs(1)).await.unwrap();
        assert_eq!(view.turns.len(), 1);
    }

    #[tokio::test]
    async fn pre_connect_events_buffer_by_default() {
        let mut session = TestSession::spawn();
        session.handle.start().await.unwrap();
        assert!(
            session
                .wait_for_phase(SessionPhase::Connecting, Duration::from_secs(1))
                .await
        );

        session.handle.ingest(remote("1", 500, "early")).await.unwrap();
        let view = session.next_projection(Duration::from_secs(1)).await.unwrap();
        assert_eq!(view.turns.len(), 1);
        assert!(!view.is_accepting_input);
    }

    #[tokio::test]
    async fn pre_connect_events_rejected_when_disabled() {
        let mut session = TestSession::with_config(SessionConfig {
            pre_connect_buffer: false,
            ..SessionConfig::default()
        });
        session.handle.start().await.unwrap();
        assert!(
            session
                .wait_for_phase(SessionPhase::Connecting, Duration::from_secs(1))
                .await
        );

        session.handle.ingest(remote("1", 500, "early")).await.unwrap();
        let reason = session.next_rejection(Duration::from_secs(1)).await.unwrap();
        assert!(reason.contains("pre-connect"));
    }

    #[tokio::test]
    async fn idle_session_rejects_events() {
        let mut session = TestSession::spawn();
        session.handle.ingest(remote("1", 500, "too soon")).await.unwrap();
        assert!(session
            .next_rejection(Duration::from_secs(1))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn chat_message_becomes_a_local_final_turn() {
        let mut session = TestSession::spawn();
        activate(&mut session).await;

        session.handle.send_chat("  What are the rules?  ").await.unwrap();
        let view = session.next_projection(Duration::from_secs(1)).await.unwrap();
        assert_eq!(view.turns.len(), 1);
        assert_eq!(view.turns[0].origin, Origin::Local);
        assert_eq!(view.turns[0].content, "What are the rules?");
        assert!(view.turns[0].is_final);
    }

    #[tokio::test]
    async fn chat_gating_is_enforced() {
        let session = TestSession::with_config(SessionConfig {
            supports_chat_input: false,
            ..SessionConfig::default()
        });
        assert!(matches!(
            session.handle.send_chat("hi").await,
            Err(SessionError::ChatUnavailable)
        ));

        let session = TestSession::spawn();
        assert!(matches!(
            session.handle.send_chat("   ").await,
            Err(SessionError::ChatEmpty)
        ));
    }

    #[tokio::test]
    async fn ending_is_idempotent() {
        let mut session = TestSession::spawn();
        activate(&mut session).await;

        session.handle.end().await.unwrap();
        assert!(
            session
                .wait_for_phase(SessionPhase::Ended, Duration::from_secs(1))
                .await
        );

        session.handle.end().await.unwrap();
        settle().await;
        assert!(session.drain().is_empty());
        assert_eq!(
            session.handle.diagnostics().snapshot().invalid_transitions,
            0
        );
    }

    #[tokio::test]
    async fn remote_close_ends_the_session() {
        let mut session = TestSession::spawn();
        activate(&mut session).await;

        session.handle.remote_closed().await.unwrap();
        assert!(
            session
                .wait_for_phase(SessionPhase::Ended, Duration::from_secs(1))
                .await
        );
    }

    #[tokio::test]
    async fn misused_lifecycle_operation_is_a_reported_noop() {
        let mut session = TestSession::spawn();
        session.handle.mark_connected().await.unwrap();

        let reason = session.next_rejection(Duration::from_secs(1)).await.unwrap();
        assert!(reason.contains("not valid"));
        assert_eq!(
            session.handle.diagnostics().snapshot().invalid_transitions,
            1
        );

        // Still idle: a proper start works.
        session.handle.start().await.unwrap();
        assert!(
            session
                .wait_for_phase(SessionPhase::Connecting, Duration::from_secs(1))
                .await
        );
    }

    #[tokio::test]
    async fn agent_activity_changes_are_projected_once() {
        let mut session = TestSession::spawn();
        activate(&mut session).await;

        session
            .handle
            .agent_activity(AgentActivity::Speaking)
            .await
            .unwrap();
        let view = session.next_projection(Duration::from_secs(1)).await.unwrap();
        assert_eq!(view.agent_activity, AgentActivity::Speaking);

        // Same activity again changes nothing.
        session
            .handle
            .agent_activity(AgentActivity::Speaking)
            .await
            .unwrap();
        settle().await;
        assert!(session.drain().is_empty());
    }

    #[tokio::test]
    async fn scripted_source_drives_the_session() {
        let mut session = TestSession::spawn();
        activate(&mut session).await;

        let source = ScriptedSource::new([
            remote("a", 1000, "first"),
            remote("b", 2000, "second"),
        ]);
        drive(source, &session.handle).await.unwrap();
        settle().await;

        let last_projection = session
            .drain()
            .into_iter()
            .filter_map(|u| match u {
                SessionUpdate::Projection(view) => Some(view),
                SessionUpdate::Rejected { .. } => None,
            })
            .next_back()
            .expect("projections from the scripted feed");
        let ids: Vec<_> = last_projection.turns.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[tokio::test]
    async fn updates_stream_skips_nothing_in_order() {
        use tokio_stream::StreamExt;

        let session = TestSession::spawn();
        let mut stream = Box::pin(updates_stream(session.handle.subscribe()));

        session.handle.start().await.unwrap();
        let update = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        match update {
            SessionUpdate::Projection(view) => {
                assert_eq!(view.phase, SessionPhase::Connecting);
            }
            SessionUpdate::Rejected { reason } => panic!("unexpected rejection: {reason}"),
        }
    }

}
