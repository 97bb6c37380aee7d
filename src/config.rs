//! Session configuration
//!
//! Supplied by the embedding application at construction time. The session
//! core consumes this and never mutates it.

use std::time::Duration;

/// Ceiling on time spent in `Connecting` before the session times out.
pub const DEFAULT_CONNECTION_DEADLINE: Duration = Duration::from_millis(200_000);

/// Per-session configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long the session may wait for the connection to establish.
    pub connection_deadline: Duration,
    /// Whether typed chat input is offered alongside voice.
    pub supports_chat_input: bool,
    /// Accept conversational events that arrive while still connecting.
    pub pre_connect_buffer: bool,
    /// Display name of the remote agent, when the application sets one.
    pub agent_name: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection_deadline: DEFAULT_CONNECTION_DEADLINE,
            supports_chat_input: true,
            pre_connect_buffer: true,
            agent_name: None,
        }
    }
}

impl SessionConfig {
    /// Build a config from environment overrides on top of the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            connection_deadline: std::env::var("VOXSESSION_CONNECTION_DEADLINE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(defaults.connection_deadline, Duration::from_millis),
            supports_chat_input: std::env::var("VOXSESSION_CHAT_INPUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.supports_chat_input),
            pre_connect_buffer: std::env::var("VOXSESSION_PRE_CONNECT_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.pre_connect_buffer),
            agent_name: std::env::var("VOXSESSION_AGENT_NAME").ok(),
        }
    }
}
