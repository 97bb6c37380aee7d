//! Session-scoped diagnostics
//!
//! An explicitly passed inspection handle scoped to one session's
//! lifetime. Counts what the runtime did with the event stream; readable
//! at any time as a snapshot. Deliberately not a process-wide singleton.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one session. The runtime increments them; the embedding
/// application reads snapshots.
#[derive(Debug, Default)]
pub struct SessionDiagnostics {
    turns_appended: AtomicU64,
    edits_applied: AtomicU64,
    duplicates_ignored: AtomicU64,
    events_rejected: AtomicU64,
    invalid_transitions: AtomicU64,
}

impl SessionDiagnostics {
    pub(crate) fn record_appended(&self) {
        self.turns_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_edit(&self) {
        self.edits_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_duplicate(&self) {
        self.duplicates_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalid_transition(&self) {
        self.invalid_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            turns_appended: self.turns_appended.load(Ordering::Relaxed),
            edits_applied: self.edits_applied.load(Ordering::Relaxed),
            duplicates_ignored: self.duplicates_ignored.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            invalid_transitions: self.invalid_transitions.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub turns_appended: u64,
    pub edits_applied: u64,
    pub duplicates_ignored: u64,
    pub events_rejected: u64,
    pub invalid_transitions: u64,
}
