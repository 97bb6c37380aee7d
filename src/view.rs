//! Read-only projection for presentation code
//!
//! Composes reconciler output and lifecycle state into the single
//! structure the rendering layer consumes. Pure: the runtime recomputes it
//! synchronously after every applied mutation, so no stale projection is
//! ever cached across a state change.

use crate::config::SessionConfig;
use crate::lifecycle::SessionPhase;
use crate::transcript::{TranscriptReconciler, Turn};
use serde::{Deserialize, Serialize};

/// What the remote agent is doing right now, as reported by the media
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentActivity {
    #[default]
    Idle,
    Listening,
    Thinking,
    Speaking,
}

/// The combined read-only view handed to presentation code.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptView {
    pub turns: Vec<Turn>,
    pub phase: SessionPhase,
    pub agent_activity: AgentActivity,
    /// True exactly while the session is active.
    pub is_accepting_input: bool,
    /// Typed chat is offered only while accepting input, and only when the
    /// application enables it at all.
    pub chat_input_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}

impl TranscriptView {
    /// The view before the first mutation: empty transcript, idle phase.
    pub fn initial(config: &SessionConfig) -> Self {
        project(
            &TranscriptReconciler::new(),
            SessionPhase::Idle,
            AgentActivity::Idle,
            config,
        )
    }

    /// The single most recent turn, for focus views that show one message
    /// at a time. Whether to window the transcript this way is the
    /// consumer's policy, not this crate's.
    pub fn latest_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

/// Compose current reconciler and lifecycle state into a projection.
pub fn project(
    reconciler: &TranscriptReconciler,
    phase: SessionPhase,
    agent_activity: AgentActivity,
    config: &SessionConfig,
) -> TranscriptView {
    let is_accepting_input = phase.is_accepting_input();
    TranscriptView {
        turns: reconciler.snapshot(),
        phase,
        agent_activity,
        is_accepting_input,
        chat_input_enabled: is_accepting_input && config.supports_chat_input,
        agent_name: config.agent_name.clone(),
    }
}
