//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that resolves which game to
//! observe, keeps it in sync and shuts the connection down cleanly.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{wait_for_shutdown_signal, wait_for_shutdown_signal_silent},
};
use arena_client::{
    install_shared, reset_shared, ConnectionManager, GameApi, GameState, GameSync,
    LifecycleEvent, Player,
};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Main application struct.
///
/// Owns the configuration and the [`GameSync`] for the observed game. The
/// connection manager is installed as the process-wide shared instance so the
/// whole program observes one connection.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Live view of the observed game
    sync: GameSync,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply environment, then command-line overrides
    /// 3. Validate merged configuration
    /// 4. Create and start the game first if asked to
    /// 5. Build the connection manager and game sync
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        config.apply_env_overrides();

        if let Some(ws_url) = args.ws_url {
            config.connection.ws_url = ws_url;
        }

        if let Some(api_url) = args.api_url {
            config.api.base_url = api_url;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        } else {
            info!("✅ Configuration loaded and validated successfully");
        }

        display_banner();

        let api = GameApi::new(config.to_api_config());

        let game_id = if args.create_players.is_empty() {
            args.game_id.ok_or("A game id is required unless --create-players is given")?
        } else {
            let players: Vec<Player> = args
                .create_players
                .iter()
                .enumerate()
                .map(|(index, name)| Player::new(format!("player_{}", index + 1), name.trim()))
                .collect();
            let created = api.create_game(&players).await?;
            info!(
                "🆕 Created game {} with {} players",
                created.game_id,
                created.players.len()
            );
            created.game_id
        };

        if args.start {
            let started = api.start_game(&game_id).await?;
            info!("▶️ Started game {} ({:?})", started.game_id, started.status);
        }

        let manager = ConnectionManager::new(config.to_client_config());
        install_shared(manager.clone());

        let sync = GameSync::new(game_id, manager, api, config.to_sync_config());

        Ok(Self { config, sync })
    }

    pub fn game_id(&self) -> &str {
        self.sync.game_id()
    }

    /// Live endpoint used for the observed game.
    pub fn endpoint_url(&self) -> String {
        self.sync.manager().endpoint_url(self.sync.game_id())
    }

    /// Runs the observer until a shutdown signal arrives or the game ends.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting arena observer for game {}", self.sync.game_id());
        self.log_configuration_summary();

        let finished = Arc::new(Notify::new());
        self.register_handlers(finished.clone());

        self.sync.start().await?;

        let watcher = {
            let mut states = self.sync.subscribe();
            let finished = finished.clone();
            tokio::spawn(async move {
                while states.changed().await.is_ok() {
                    let snapshot = states.borrow_and_update().clone();
                    if let Some(state) = snapshot {
                        log_state_summary(&state);
                        if state.is_finished() {
                            finished.notify_one();
                        }
                    }
                }
            })
        };

        if self.sync.latest().is_some_and(|state| state.is_finished()) {
            finished.notify_one();
        }

        info!("✅ Observer is now running!");
        info!("🛑 Press Ctrl+C to stop");

        tokio::select! {
            result = wait_for_shutdown_signal() => {
                result?;
                // A second signal skips the graceful path
                tokio::spawn(async move {
                    if let Err(e) = wait_for_shutdown_signal_silent().await {
                        error!("Failed to set up merciless shutdown signal handler: {e}");
                        return;
                    }
                    warn!("Shutdown handler received again! I'll make this quick.");
                    std::process::exit(1);
                });
            }
            _ = finished.notified() => {
                info!("🏁 Game {} has finished", self.sync.game_id());
            }
        }

        info!("🧹 Closing connection...");
        watcher.abort();
        self.sync.shutdown().await;
        reset_shared().await;

        if let Some(state) = self.sync.latest() {
            log_final_state(&state);
        }
        info!("👋 Arena observer stopped");
        Ok(())
    }

    fn register_handlers(&self, finished: Arc<Notify>) {
        let manager = self.sync.manager();

        manager.on_game_action(|action| {
            let target = action
                .target_player_id
                .as_deref()
                .or(action.target_player.as_deref());
            match (target, action.amount) {
                (Some(target), Some(amount)) => info!(
                    "🎬 {} {} → {} ({})",
                    action.player_id, action.action_type, target, amount
                ),
                (Some(target), None) => {
                    info!("🎬 {} {} → {}", action.player_id, action.action_type, target)
                }
                _ => info!("🎬 {} {}", action.player_id, action.action_type),
            }
            if let Some(message) = action.public_message.as_deref().or(action.message.as_deref()) {
                info!("   💬 {}", message);
            }
        });

        manager.on_game_end(move |end| {
            info!(
                "🏆 Game over, winner: {}",
                end.winner_id.as_deref().unwrap_or("none")
            );
            finished.notify_one();
        });

        manager.on_server_error(|payload| warn!("⚠️ Server error: {}", payload));

        manager.on_lifecycle(|event| match event {
            LifecycleEvent::Opened { session_id } => info!("🔗 Live updates for {} connected", session_id),
            LifecycleEvent::Closed { expected: true, .. } => {}
            LifecycleEvent::Closed { code, reason, .. } => warn!(
                "📴 Live connection lost (code: {:?}, reason: {:?}), polling until it returns",
                code, reason
            ),
            LifecycleEvent::Reconnecting { attempt, delay, .. } => {
                info!("⏳ Reconnecting in {:?} (retry {})", delay, attempt)
            }
            LifecycleEvent::Failed { attempts, reason, .. } => error!(
                "❌ Live updates unavailable after {} attempts ({}), polling only",
                attempts, reason
            ),
        });
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Endpoint: {}", self.endpoint_url());
        info!("  🔌 REST API: {}", self.sync.api().base_url());
        info!(
            "  🔁 Attempts: {} x {}ms timeout",
            self.config.connection.max_attempts, self.config.connection.attempt_timeout_ms
        );
        info!("  ⏱️ Poll interval: {}ms", self.config.sync.poll_interval_ms);
    }
}

fn log_state_summary(state: &GameState) {
    info!(
        "📊 Round {} | {:?} | phase: {} | pool: {} | {} of {} players active",
        state.round,
        state.status,
        if state.phase.is_empty() { "-" } else { state.phase.as_str() },
        state.prize_pool,
        state.active_players().count(),
        state.players.len()
    );
}

fn log_final_state(state: &GameState) {
    info!("📊 Final State:");
    info!("  - Rounds played: {}", state.round);
    info!("  - Prize pool: {}", state.prize_pool);
    for player in &state.players {
        info!(
            "  - {} ({}): balance {}{}",
            player.name,
            player.id,
            player.balance,
            if player.is_active { "" } else { ", out" }
        );
    }
    if let Some(winner) = state.winner_id.as_deref() {
        info!("  - Winner: {}", winner);
    }
}
