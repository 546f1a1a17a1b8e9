//! Message envelope and decoding for the game WebSocket protocol.

pub mod types;

pub use types::{DecodeError, InboundMessage, OutboundMessage, WireMessage};
