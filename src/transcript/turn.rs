//! Turn types
//!
//! The wire-facing event shape the media session delivers, and the
//! canonical turn it becomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The end user on this device.
    Local,
    /// The agent or any other remote participant.
    Remote,
}

/// A raw conversational event: one transcription fragment or one chat
/// message, as delivered over the session's data channel.
///
/// Field names follow the data-channel payload (camelCase). `final` is
/// absent on chat messages and defaults to `true`; only streaming
/// transcription fragments send `final: false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    pub id: String,
    pub origin: Origin,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub content: String,
    /// Set when this event revises an earlier one with the same id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_timestamp: Option<i64>,
    #[serde(default = "default_final", rename = "final")]
    pub is_final: bool,
}

fn default_final() -> bool {
    true
}

impl ReceivedMessage {
    /// A plain, final message with no edit marker.
    pub fn new(
        id: impl Into<String>,
        origin: Origin,
        timestamp: i64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            origin,
            timestamp,
            content: content.into(),
            edit_timestamp: None,
            is_final: true,
        }
    }
}

/// One addressable unit of transcript content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub id: String,
    pub origin: Origin,
    /// When the turn was first reported. Ordering in the transcript is
    /// first-seen arrival order, not this value.
    pub created_at: DateTime<Utc>,
    /// Present iff the turn has been edited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_at: Option<DateTime<Utc>>,
    pub content: String,
    #[serde(rename = "final")]
    pub is_final: bool,
}

impl Turn {
    pub fn has_been_edited(&self) -> bool {
        self.revised_at.is_some()
    }
}

/// Out-of-range timestamps clamp to the epoch rather than failing the event.
pub(crate) fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::UNIX_EPOCH)
}
