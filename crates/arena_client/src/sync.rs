//! Keeps a local copy of one game's state current.
//!
//! [`GameSync`] combines the live channel with the REST API: the initial state
//! is loaded over HTTP, live `game_state` snapshots replace it as they arrive,
//! and whenever the live channel is not open the REST state is polled instead.
//! Both sources publish into the same `watch` channel, so readers never care
//! where the latest snapshot came from.

use crate::api::GameApi;
use crate::connection::{ConnectionManager, SubscriptionId};
use crate::error::ApiError;
use crate::types::GameState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Settings for [`GameSync`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// How often the REST state is fetched while the live channel is down
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Live view of a single game.
pub struct GameSync {
    game_id: String,
    manager: ConnectionManager,
    api: GameApi,
    config: SyncConfig,
    state: Arc<watch::Sender<Option<GameState>>>,
    subscription: Mutex<Option<SubscriptionId>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl GameSync {
    pub fn new(
        game_id: impl Into<String>,
        manager: ConnectionManager,
        api: GameApi,
        config: SyncConfig,
    ) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            game_id: game_id.into(),
            manager,
            api,
            config,
            state: Arc::new(state),
            subscription: Mutex::new(None),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn api(&self) -> &GameApi {
        &self.api
    }

    /// Receiver that observes every new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<GameState>> {
        self.state.subscribe()
    }

    /// Most recent snapshot, if any has been loaded yet.
    pub fn latest(&self) -> Option<GameState> {
        self.state.borrow().clone()
    }

    /// Loads the initial state, then starts live updates and the polling fallback.
    ///
    /// Fails only if the initial REST load fails. Calling it twice has no
    /// further effect.
    pub async fn start(&self) -> Result<(), ApiError> {
        if self.subscription.lock().is_some() || self.cancel.is_cancelled() {
            return Ok(());
        }

        let initial = self.api.get_game_state(&self.game_id).await?;
        info!(
            "📋 Loaded game {} (round {}, {} players)",
            initial.game_id,
            initial.round,
            initial.players.len()
        );
        self.state.send_replace(Some(initial));

        let id = {
            let state = self.state.clone();
            let game_id = self.game_id.clone();
            self.manager.on_game_state(move |snapshot| {
                // A shared manager may be serving another game
                if snapshot.game_id.is_empty() || snapshot.game_id == game_id {
                    state.send_replace(Some(snapshot.clone()));
                }
            })
        };
        {
            let mut subscription = self.subscription.lock();
            if subscription.is_some() {
                self.manager.unsubscribe(id);
                return Ok(());
            }
            *subscription = Some(id);
        }

        let connect = tokio::spawn(connect_live(
            self.manager.clone(),
            self.game_id.clone(),
            self.cancel.clone(),
        ));
        let poll = tokio::spawn(poll_while_offline(
            self.manager.clone(),
            self.api.clone(),
            self.game_id.clone(),
            self.config.poll_interval,
            self.state.clone(),
            self.cancel.clone(),
        ));
        self.tasks.lock().extend([connect, poll]);

        Ok(())
    }

    /// Stops polling, drops the live subscription and disconnects.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(id) = self.subscription.lock().take() {
            self.manager.unsubscribe(id);
        }
        self.manager.shutdown().await;

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            let _ = task.await;
        }
        debug!("Game sync for {} stopped", self.game_id);
    }
}

async fn connect_live(manager: ConnectionManager, game_id: String, cancel: CancellationToken) {
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = manager.connect(&game_id) => result,
    };

    if let Err(e) = result {
        warn!(
            "Live updates for game {} unavailable, relying on polling: {}",
            game_id, e
        );
    }
}

async fn poll_while_offline(
    manager: ConnectionManager,
    api: GameApi,
    game_id: String,
    interval: Duration,
    state: Arc<watch::Sender<Option<GameState>>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        if manager.is_connected() {
            continue;
        }

        debug!("🔄 Polling state of game {} (live channel is {})", game_id, manager.state());
        let fetched = tokio::select! {
            _ = cancel.cancelled() => return,
            fetched = api.get_game_state(&game_id) => fetched,
        };
        match fetched {
            Ok(snapshot) => {
                state.send_replace(Some(snapshot));
            }
            Err(e) => warn!("Polling game {} failed: {}", game_id, e),
        }
    }
}
