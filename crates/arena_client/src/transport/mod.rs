//! Transport seam between the connection manager and the network.
//!
//! The manager never touches sockets directly. It asks a [`Connector`] to open a
//! [`Transport`] for a URL and then owns that handle exclusively until it is
//! closed. The production implementation is [`WebSocketConnector`]; tests plug
//! in scripted connectors.

use crate::error::TransportError;
use async_trait::async_trait;

pub mod websocket;

pub use websocket::WebSocketConnector;

/// Close information received from the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

/// One unit read from an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete text message
    Text(String),
    /// The remote side closed the channel. `None` means the stream simply ended.
    Closed(Option<CloseInfo>),
}

/// An open, bidirectional text channel.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Writes one text message.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Waits for the next frame. Non-text control traffic is handled internally.
    async fn recv(&mut self) -> Result<Frame, TransportError>;

    /// Closes the channel. Closing an already closed channel is not an error.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Factory that opens transports.
///
/// Returning [`TransportError::Unsupported`] marks the endpoint as impossible to
/// reach from this runtime; the manager fails the connect call instead of retrying.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}
