//! Connection management for the live game channel.
//!
//! This module handles the lifecycle of the real-time connection, including
//! bounded connection attempts, backoff between retries, transparent
//! reconnection and typed event delivery.

pub mod backoff;
pub mod events;
pub mod manager;
pub mod state;

pub use backoff::BackoffPolicy;
pub use events::{LifecycleEvent, SubscriptionId};
pub use manager::ConnectionManager;
pub use state::ConnectionState;
