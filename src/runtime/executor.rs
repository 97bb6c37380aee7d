//! Session event-loop executor

use super::{SessionEvent, SessionHandle, SessionUpdate};
use crate::config::SessionConfig;
use crate::diagnostics::SessionDiagnostics;
use crate::lifecycle::{transition, LifecycleEffect, LifecycleEvent, SessionPhase};
use crate::transcript::{IngestOutcome, ReceivedMessage, TranscriptReconciler};
use crate::view::{project, AgentActivity};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::{CancellationToken, DropGuard};

/// The per-session event loop.
///
/// Single consumer of the event channel: all ingestion, transitions, and
/// projections happen serially here, so no locking is needed within a
/// session.
pub struct SessionRuntime {
    session_id: String,
    config: SessionConfig,
    reconciler: TranscriptReconciler,
    phase: SessionPhase,
    agent_activity: AgentActivity,
    diagnostics: Arc<SessionDiagnostics>,
    event_rx: mpsc::Receiver<SessionEvent>,
    /// Weak so an armed timer never keeps a fully-released session alive.
    event_tx: mpsc::WeakSender<SessionEvent>,
    update_tx: broadcast::Sender<SessionUpdate>,
    /// Guard for the pending deadline callback; dropping it cancels the
    /// timer, including on abnormal teardown of the runtime itself.
    deadline_guard: Option<DropGuard>,
}

impl SessionRuntime {
    /// Construct a runtime, spawn its event loop, and return the handle
    /// the embedding application drives it with.
    pub fn spawn(config: SessionConfig) -> SessionHandle {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (event_tx, event_rx) = mpsc::channel(32);
        let (update_tx, _) = broadcast::channel(128);
        let diagnostics = Arc::new(SessionDiagnostics::default());

        let runtime = Self {
            session_id,
            config: config.clone(),
            reconciler: TranscriptReconciler::new(),
            phase: SessionPhase::Idle,
            agent_activity: AgentActivity::Idle,
            diagnostics: Arc::clone(&diagnostics),
            event_rx,
            event_tx: event_tx.downgrade(),
            update_tx: update_tx.clone(),
            deadline_guard: None,
        };
        tokio::spawn(runtime.run());

        SessionHandle {
            config,
            event_tx,
            update_tx,
            diagnostics,
        }
    }

    /// Run until every handle is gone. Dropping `self` afterwards releases
    /// the deadline guard, so a still-armed timer cannot outlive the loop.
    async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "session runtime started");
        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event);
        }
        tracing::info!(
            session_id = %self.session_id,
            phase = ?self.phase,
            "session runtime stopped"
        );
    }

    fn process_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Message(message) => self.ingest_message(message),
            SessionEvent::Lifecycle(event) => self.apply_lifecycle(event),
            SessionEvent::AgentActivity(activity) => {
                if self.agent_activity != activity {
                    self.agent_activity = activity;
                    self.publish_projection();
                }
            }
        }
    }

    fn ingest_message(&mut self, message: ReceivedMessage) {
        if let Err(reason) = self.accepts_messages() {
            self.reject(&reason);
            return;
        }

        match self.reconciler.ingest(message) {
            Ok(IngestOutcome::Appended) => {
                self.diagnostics.record_appended();
                self.publish_projection();
            }
            Ok(IngestOutcome::Updated) => {
                self.diagnostics.record_edit();
                self.publish_projection();
            }
            // Nothing observable changed, so nothing is pushed.
            Ok(IngestOutcome::Unchanged) => self.diagnostics.record_duplicate(),
            Err(err) => self.reject(&err.to_string()),
        }
    }

    /// Phase gate for inbound conversational events. Pre-connect events
    /// are accepted only when the application enables the buffer.
    fn accepts_messages(&self) -> Result<(), String> {
        match self.phase {
            SessionPhase::Active => Ok(()),
            SessionPhase::Connecting if self.config.pre_connect_buffer => Ok(()),
            SessionPhase::Connecting => Err("pre-connect events are disabled".to_string()),
            phase => Err(format!("session is not accepting events while {phase:?}")),
        }
    }

    fn apply_lifecycle(&mut self, event: LifecycleEvent) {
        match transition(self.phase, event) {
            Ok(applied) => {
                let changed = applied.next != self.phase;
                if changed {
                    tracing::info!(
                        session_id = %self.session_id,
                        from = ?self.phase,
                        to = ?applied.next,
                        ?event,
                        "phase transition"
                    );
                }
                self.phase = applied.next;
                for effect in applied.effects {
                    self.execute_effect(effect);
                }
                if changed {
                    self.publish_projection();
                }
            }
            Err(err) => {
                self.diagnostics.record_invalid_transition();
                tracing::warn!(
                    session_id = %self.session_id,
                    error = %err,
                    "ignoring lifecycle event"
                );
                let _ = self.update_tx.send(SessionUpdate::Rejected {
                    reason: err.to_string(),
                });
            }
        }
    }

    fn execute_effect(&mut self, effect: LifecycleEffect) {
        match effect {
            LifecycleEffect::ArmDeadline => {
                let token = CancellationToken::new();
                let cancelled = token.clone();
                let deadline = self.config.connection_deadline;
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        biased;

                        () = cancelled.cancelled() => {}
                        () = tokio::time::sleep(deadline) => {
                            if let Some(tx) = event_tx.upgrade() {
                                let _ = tx
                                    .send(SessionEvent::Lifecycle(LifecycleEvent::DeadlineElapsed))
                                    .await;
                            }
                        }
                    }
                });
                self.deadline_guard = Some(token.drop_guard());
            }
            LifecycleEffect::CancelDeadline => {
                // Dropping the guard cancels the callback.
                self.deadline_guard = None;
            }
        }
    }

    fn reject(&self, reason: &str) {
        self.diagnostics.record_rejected();
        tracing::warn!(
            session_id = %self.session_id,
            phase = ?self.phase,
            reason,
            "dropping conversational event"
        );
        let _ = self.update_tx.send(SessionUpdate::Rejected {
            reason: reason.to_string(),
        });
    }

    fn publish_projection(&self) {
        let view = project(
            &self.reconciler,
            self.phase,
            self.agent_activity,
            &self.config,
        );
        let _ = self.update_tx.send(SessionUpdate::Projection(view));
    }
}
