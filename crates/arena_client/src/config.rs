//! Client configuration types and defaults.
//!
//! Holds the connection parameters used by the [`ConnectionManager`](crate::ConnectionManager):
//! endpoint composition, attempt bounds and the backoff schedule.

use crate::connection::BackoffPolicy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;

/// Bytes escaped in a URL path segment: everything except RFC 3986 unreserved.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Environment variable overriding the WebSocket base address.
pub const WS_URL_ENV: &str = "ARENA_WS_URL";
/// Environment variable overriding the REST API base address.
pub const API_URL_ENV: &str = "ARENA_API_URL";
/// Environment variable overriding the participant token.
pub const PARTICIPANT_ENV: &str = "ARENA_PARTICIPANT";

/// Default WebSocket base address for local development.
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:8006";
/// Default REST API base address for local development.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8006";
/// Participant token used when joining a game as a spectator.
pub const DEFAULT_PARTICIPANT: &str = "observer";

/// Configuration for a [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base address of the game server's WebSocket endpoint
    pub ws_base_url: String,
    /// Participant token appended to the endpoint path
    pub participant: String,
    /// Maximum number of open attempts per connect cycle
    pub max_attempts: u32,
    /// How long a single attempt may wait for the channel to open
    pub attempt_timeout: Duration,
    /// Delay schedule between failed attempts
    pub backoff: BackoffPolicy,
    /// Server close codes that end the session instead of triggering a reconnect
    pub terminal_close_codes: Vec<u16>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_base_url: DEFAULT_WS_BASE_URL.to_string(),
            participant: DEFAULT_PARTICIPANT.to_string(),
            max_attempts: 5,
            attempt_timeout: Duration::from_secs(8),
            backoff: BackoffPolicy::default(),
            terminal_close_codes: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Default configuration with `ARENA_WS_URL` and `ARENA_PARTICIPANT` applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment overrides on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_value(WS_URL_ENV) {
            self.ws_base_url = url;
        }
        if let Some(participant) = env_value(PARTICIPANT_ENV) {
            self.participant = participant;
        }
        self
    }

    #[must_use]
    pub fn with_ws_base_url(mut self, url: impl Into<String>) -> Self {
        self.ws_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_participant(mut self, participant: impl Into<String>) -> Self {
        self.participant = participant.into();
        self
    }

    /// Sets the attempt bound. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn with_terminal_close_codes(mut self, codes: Vec<u16>) -> Self {
        self.terminal_close_codes = codes;
        self
    }

    /// Builds the endpoint URL for a session: `<base>/ws/<session>/<participant>`.
    ///
    /// Session id and participant are opaque tokens, so each is percent-encoded
    /// as a single path segment.
    pub fn endpoint_url(&self, session_id: &str) -> String {
        format!(
            "{}/ws/{}/{}",
            self.ws_base_url.trim_end_matches('/'),
            utf8_percent_encode(session_id, PATH_SEGMENT),
            utf8_percent_encode(&self.participant, PATH_SEGMENT)
        )
    }
}

/// Reads a non-empty environment variable.
pub(crate) fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.ws_base_url, "ws://localhost:8006");
        assert_eq!(config.participant, "observer");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.attempt_timeout, Duration::from_secs(8));
        assert!(config.terminal_close_codes.is_empty());
    }

    #[test]
    fn test_endpoint_url() {
        let config = ClientConfig::default();
        assert_eq!(
            config.endpoint_url("game-42"),
            "ws://localhost:8006/ws/game-42/observer"
        );

        let config = config
            .with_ws_base_url("wss://arena.example.com/")
            .with_participant("p1");
        assert_eq!(
            config.endpoint_url("abc"),
            "wss://arena.example.com/ws/abc/p1"
        );
    }

    #[test]
    fn test_endpoint_url_escapes_path_segments() {
        let config = ClientConfig::default().with_participant("team a");
        assert_eq!(
            config.endpoint_url("a/b?c#d e"),
            "ws://localhost:8006/ws/a%2Fb%3Fc%23d%20e/team%20a"
        );
        assert_eq!(
            config.endpoint_url("3f2c9a_v1.0~x"),
            "ws://localhost:8006/ws/3f2c9a_v1.0~x/team%20a"
        );
    }

    #[test]
    fn test_max_attempts_is_clamped() {
        let config = ClientConfig::default().with_max_attempts(0);
        assert_eq!(config.max_attempts, 1);
    }
}
