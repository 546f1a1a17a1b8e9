//! Process-wide connection manager.
//!
//! Most programs only ever talk to one game at a time. [`shared`] hands out
//! clones of a single lazily created [`ConnectionManager`] so independent parts
//! of a program observe the same connection, while [`install_shared`] and
//! [`reset_shared`] give tests and long-running hosts explicit control over its
//! lifetime.

use crate::config::ClientConfig;
use crate::connection::ConnectionManager;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

static SHARED: Lazy<Mutex<Option<ConnectionManager>>> = Lazy::new(|| Mutex::new(None));

/// Returns the process-wide manager, creating it from the environment on first use.
pub fn shared() -> ConnectionManager {
    SHARED
        .lock()
        .get_or_insert_with(|| {
            debug!("Creating shared connection manager from environment");
            ConnectionManager::new(ClientConfig::from_env())
        })
        .clone()
}

/// Replaces the process-wide manager.
///
/// The previous manager, if any, is disconnected. Its pending timers are
/// cancelled before this returns.
pub fn install_shared(manager: ConnectionManager) {
    let previous = SHARED.lock().replace(manager);
    if let Some(previous) = previous {
        previous.disconnect();
    }
}

/// Disconnects and releases the process-wide manager.
///
/// Resolves once its transport handle has been closed. The next [`shared`]
/// call creates a fresh manager.
pub async fn reset_shared() {
    let previous = SHARED.lock().take();
    if let Some(previous) = previous {
        previous.shutdown().await;
        debug!("Shared connection manager released");
    }
}

/// Whether a process-wide manager currently exists.
pub fn has_shared() -> bool {
    SHARED.lock().is_some()
}
