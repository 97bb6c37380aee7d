//! Message reconciler
//!
//! Owns the canonical ordered turn sequence. Arrival order is
//! authoritative: the event source already serializes events per session,
//! so unknown identities append and known identities revise in place.

use super::turn::{millis_to_utc, ReceivedMessage, Turn};
use std::collections::HashMap;
use thiserror::Error;

/// Per-event ingestion failures. These never corrupt existing state and
/// never abort the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    /// The inbound event carried no usable identity. Rejected and surfaced
    /// rather than silently dropped, since silent loss would leave the
    /// transcript incomplete without anyone knowing.
    #[error("malformed event: missing id")]
    MalformedEvent,
}

/// What one ingest did to the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new turn was appended.
    Appended,
    /// An existing turn was revised in place.
    Updated,
    /// Identical re-delivery; no observable change.
    Unchanged,
}

/// The canonical ordered turn sequence for one session.
///
/// Append/update only: turns are never deleted and never move once
/// appended, so positions handed to presentation code stay stable.
#[derive(Debug, Default)]
pub struct TranscriptReconciler {
    turns: Vec<Turn>,
    by_id: HashMap<String, usize>,
}

impl TranscriptReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one raw event into the sequence.
    pub fn ingest(&mut self, message: ReceivedMessage) -> Result<IngestOutcome, TranscriptError> {
        if message.id.trim().is_empty() {
            return Err(TranscriptError::MalformedEvent);
        }

        let Some(&position) = self.by_id.get(&message.id) else {
            return Ok(self.append(message));
        };

        let turn = &mut self.turns[position];
        if turn.origin != message.origin {
            // First-seen origin wins; the re-delivery still revises content.
            tracing::warn!(
                id = %message.id,
                stored = ?turn.origin,
                received = ?message.origin,
                "event origin changed between deliveries"
            );
        }

        let revised_at = message.edit_timestamp.map(millis_to_utc);
        let revises_content = turn.content != message.content;
        let revises_timestamp = revised_at.is_some() && turn.revised_at != revised_at;
        // One-way latch: a final turn never reverts to non-final.
        let settles = message.is_final && !turn.is_final;

        if !revises_content && !revises_timestamp && !settles {
            return Ok(IngestOutcome::Unchanged);
        }

        turn.content = message.content;
        if let Some(at) = revised_at {
            turn.revised_at = Some(at);
        }
        if settles {
            turn.is_final = true;
        }
        Ok(IngestOutcome::Updated)
    }

    fn append(&mut self, message: ReceivedMessage) -> IngestOutcome {
        let turn = Turn {
            id: message.id.clone(),
            origin: message.origin,
            created_at: millis_to_utc(message.timestamp),
            revised_at: message.edit_timestamp.map(millis_to_utc),
            content: message.content,
            is_final: message.is_final,
        };
        self.by_id.insert(message.id, self.turns.len());
        self.turns.push(turn);
        IngestOutcome::Appended
    }

    /// The most recently appended turn, if any. Drives single-message
    /// focus views ("who is speaking now").
    pub fn latest(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// The full ordered sequence, copy-on-read: later ingests never mutate
    /// a snapshot already handed out.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
