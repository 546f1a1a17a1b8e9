//! # Arena Observer - Main Entry Point
//!
//! Follows an Agent Arena game from the command line. Live updates arrive over
//! a WebSocket that reconnects on its own; while it is down the game state is
//! polled over REST.
//!
//! ## Quick Start
//!
//! ```bash
//! # Observe an existing game
//! arena --game 3f2c9a
//!
//! # Create a game with three players, start it and observe it
//! arena --create-players Alice,Bob,Carol --start
//!
//! # Point at another server, with JSON logs
//! arena -g 3f2c9a --ws-url ws://arena:8006 --api-url http://arena:8006 --json-logs
//! ```
//!
//! ## Configuration
//!
//! Configuration is loaded from a TOML file (default: `arena.toml`). If the file
//! doesn't exist, a default configuration will be created. `ARENA_WS_URL`,
//! `ARENA_API_URL` and `ARENA_PARTICIPANT` override the file; command-line
//! options override both.
//!
//! ## Signal Handling
//!
//! The observer disconnects cleanly on SIGINT (Ctrl+C) or SIGTERM, and on its
//! own once the game has ended.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Parses arguments, sets up logging and runs the observer.
///
/// # Exit Codes
///
/// * **0**: The game ended or a shutdown signal was received
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    let mut logging_settings = config.logging;
    if let Some(level) = &args.log_level {
        logging_settings.level = level.clone();
    }
    if let Err(e) = logging::setup_logging(&logging_settings, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{ApiSettings, ConfigError, ConnectionSettings, LoggingSettings, SyncSettings};
