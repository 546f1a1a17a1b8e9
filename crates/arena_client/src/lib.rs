//! # Arena Client
//!
//! Real-time client for Agent Arena game servers. It keeps one live channel to
//! a game session open, turns incoming frames into typed events and falls back
//! to REST polling while the channel is down.
//!
//! ## Components
//!
//! * **Connection Manager** - Bounded connect attempts, backoff, transparent
//!   reconnection and typed event subscriptions
//! * **Transport** - The seam between the manager and the network, with a
//!   WebSocket implementation
//! * **Game API** - Typed REST client for creating and driving games
//! * **Game Sync** - Live state with a polling fallback, published through a
//!   `watch` channel
//!
//! ## Message Flow
//!
//! 1. The manager opens `<ws_base>/ws/<game_id>/<participant>`
//! 2. Every frame is a `{"type": ..., "data": ...}` envelope
//! 3. Known types are decoded into [`GameState`], [`GameAction`] or [`GameEnd`]
//!    and delivered to the handlers registered for them
//! 4. Malformed frames are logged and dropped; they never close the channel
//!
//! ## Example
//!
//! ```rust,no_run
//! use arena_client::{shared, LifecycleEvent};
//!
//! # async fn example() -> Result<(), arena_client::ClientError> {
//! let manager = shared();
//! manager.on_game_end(|end| println!("winner: {:?}", end.winner_id));
//! manager.on_lifecycle(|event| {
//!     if let LifecycleEvent::Reconnecting { attempt, delay, .. } = event {
//!         println!("reconnect #{attempt} in {delay:?}");
//!     }
//! });
//! manager.connect("game-42").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod shared;
pub mod sync;
pub mod transport;
pub mod types;

pub use api::{ApiConfig, GameApi};
pub use config::ClientConfig;
pub use connection::{
    BackoffPolicy, ConnectionManager, ConnectionState, LifecycleEvent, SubscriptionId,
};
pub use error::{ApiError, ClientError, TransportError};
pub use shared::{has_shared, install_shared, reset_shared, shared};
pub use sync::{GameSync, SyncConfig};
pub use types::{GameAction, GameEnd, GameResult, GameState, GameStatus, Player, PlayerAction};
