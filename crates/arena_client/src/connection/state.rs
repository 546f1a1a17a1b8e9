//! Connection lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No session, nothing running
    #[default]
    Idle,
    /// An open attempt is in flight
    Connecting,
    /// The channel is open and delivering events
    Open,
    /// A dropped channel is being closed before reconnecting
    Closing,
    /// Waiting out the backoff delay before the next attempt
    Reconnecting,
    /// The last connect cycle gave up; a new `connect()` is allowed
    Failed,
}

impl ConnectionState {
    /// Whether a connect cycle is currently running for the session.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Open | Self::Closing | Self::Reconnecting
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
