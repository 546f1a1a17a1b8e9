//! Error types for the arena client.
//!
//! Errors are split by the seam they cross: the transport layer, the
//! connection manager that callers talk to, and the REST API.

use std::time::Duration;

/// Errors produced by a [`Transport`](crate::transport::Transport) or its
/// [`Connector`](crate::transport::Connector).
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The runtime cannot create this kind of channel at all
    /// (unsupported URL scheme, TLS support not compiled in, ...).
    #[error("Transport unavailable: {0}")]
    Unsupported(String),

    /// The channel could not be opened.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Reading from or writing to an open channel failed.
    #[error("Transport I/O error: {0}")]
    Io(String),
}

/// Errors surfaced by [`ConnectionManager`](crate::ConnectionManager) to its owner.
///
/// Only hard failures show up here. Timeouts and drops that are recovered
/// by retrying never reach the caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The session identifier was empty.
    #[error("Session identifier must not be empty")]
    InvalidSession,

    /// The runtime lacks transport capability for the configured endpoint.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Every configured connection attempt failed or timed out.
    #[error("Connection failed after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    /// The server closed the connection with a code configured as terminal.
    #[error("Server closed the connection with terminal code {code}")]
    TerminalClose { code: u16 },

    /// The connect cycle was abandoned by `disconnect()` or a newer `connect()`.
    #[error("Connection attempt cancelled")]
    Cancelled,
}

/// Errors returned by the REST [`GameApi`](crate::api::GameApi).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be sent or the response body could not be read.
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("API error {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body was not the expected JSON document.
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The request did not complete within the configured timeout.
    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}
