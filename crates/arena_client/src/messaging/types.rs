//! Wire message definitions for client-server communication.
//!
//! Both directions use the same envelope:
//!
//! ```json
//! { "type": "game_state", "data": { "game_id": "g1", "round": 2, ... } }
//! ```

use crate::types::{GameAction, GameEnd, GameState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag of a state snapshot.
pub const GAME_STATE: &str = "game_state";
/// Tag of a single player action.
pub const GAME_ACTION: &str = "game_action";
/// Tag sent once when the game is over.
pub const GAME_END: &str = "game_end";
/// Tag of a server-side error report.
pub const ERROR: &str = "error";

/// Raw `{type, data}` envelope as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Outbound message built by the owner and serialized on send.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage<'a, T: Serialize + ?Sized> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub data: &'a T,
}

impl<'a, T: Serialize + ?Sized> OutboundMessage<'a, T> {
    pub fn new(kind: &'a str, data: &'a T) -> Self {
        Self { kind, data }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A decoded inbound message, one variant per recognized tag.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    GameState(GameState),
    GameAction(GameAction),
    GameEnd(GameEnd),
    Error(Value),
}

/// Why an inbound frame could not be turned into an [`InboundMessage`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Malformed '{kind}' payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown message type '{0}'")]
    UnknownKind(String),
}

impl InboundMessage {
    /// Parses a text frame into a typed message.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let wire: WireMessage = serde_json::from_str(text)?;
        Self::from_wire(wire)
    }

    /// Converts an already parsed envelope into a typed message.
    pub fn from_wire(wire: WireMessage) -> Result<Self, DecodeError> {
        let WireMessage { kind, data } = wire;
        let payload_error = |kind: &str, source| DecodeError::Payload {
            kind: kind.to_string(),
            source,
        };

        match kind.as_str() {
            GAME_STATE => serde_json::from_value(data)
                .map(Self::GameState)
                .map_err(|e| payload_error(GAME_STATE, e)),
            GAME_ACTION => serde_json::from_value(data)
                .map(Self::GameAction)
                .map_err(|e| payload_error(GAME_ACTION, e)),
            GAME_END => serde_json::from_value(data)
                .map(Self::GameEnd)
                .map_err(|e| payload_error(GAME_END, e)),
            ERROR => Ok(Self::Error(data)),
            _ => Err(DecodeError::UnknownKind(kind)),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameState(_) => GAME_STATE,
            Self::GameAction(_) => GAME_ACTION,
            Self::GameEnd(_) => GAME_END,
            Self::Error(_) => ERROR,
        }
    }
}
