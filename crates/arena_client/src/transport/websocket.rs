//! WebSocket transport backed by `tokio-tungstenite`.

use super::{CloseInfo, Connector, Frame, Transport};
use crate::error::TransportError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

/// Opens plain `ws://` connections (and `wss://` when tungstenite is built with TLS).
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn open(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(TransportError::Unsupported(format!(
                "'{url}' is not a WebSocket URL"
            )));
        }

        let (stream, response) = connect_async(url).await.map_err(map_connect_error)?;
        debug!("🤝 WebSocket handshake with {} completed ({})", url, response.status());

        Ok(Box::new(WebSocketTransport {
            stream,
            closed: false,
        }))
    }
}

fn map_connect_error(error: tungstenite::Error) -> TransportError {
    match error {
        // Invalid or unsupported URLs (including wss:// without TLS support)
        // can never succeed, retrying would only burn the attempt budget.
        tungstenite::Error::Url(e) => TransportError::Unsupported(e.to_string()),
        other => TransportError::Connect(other.to_string()),
    }
}

struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Frame, TransportError> {
        loop {
            match self.stream.next().await {
                None => return Ok(Frame::Closed(None)),
                Some(Ok(Message::Text(text))) => return Ok(Frame::Text(text.as_str().to_owned())),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Ok(Frame::Text(text)),
                    Err(_) => warn!("Dropping binary frame that is not valid UTF-8"),
                },
                Some(Ok(Message::Close(frame))) => {
                    self.closed = true;
                    return Ok(Frame::Closed(frame.map(|f| CloseInfo {
                        code: u16::from(f.code),
                        reason: f.reason.as_str().to_owned(),
                    })));
                }
                // Pings are answered by tungstenite itself
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {
                    self.closed = true;
                    return Ok(Frame::Closed(None));
                }
                Some(Err(e)) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.stream.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed)
            | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_websocket_urls() {
        let result = WebSocketConnector.open("http://localhost:8006/ws/g1/observer").await;
        assert!(matches!(result, Err(TransportError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_retryable() {
        // Port 1 on loopback refuses connections on any sane test host
        let result = WebSocketConnector.open("ws://127.0.0.1:1/ws/g1/observer").await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
