//! Command-line interface handling for the arena observer.
//!
//! This module provides command-line argument parsing using the `clap` crate.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Configuration file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "arena.toml";

/// Command line arguments parsed from user input.
///
/// Every option except `--game` overrides a configuration file setting.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Game to observe
    pub game_id: Option<String>,
    /// Optional override for the WebSocket base address
    pub ws_url: Option<String>,
    /// Optional override for the REST API base address
    pub api_url: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Player names for a game created before observing it
    pub create_players: Vec<String>,
    /// Whether to start the game before observing it
    pub start: bool,
}

impl CliArgs {
    /// Parses the process arguments. Exits with usage help on invalid input.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list, as the shell would pass it.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            game_id: matches.get_one::<String>("game").cloned(),
            ws_url: matches.get_one::<String>("ws-url").cloned(),
            api_url: matches.get_one::<String>("api-url").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            create_players: matches
                .get_many::<String>("create-players")
                .map(|names| names.cloned().collect())
                .unwrap_or_default(),
            start: matches.get_flag("start"),
        }
    }
}

fn command() -> Command {
    Command::new("Arena Observer")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Follows an Agent Arena game live, falling back to polling when the connection drops")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("game")
                .short('g')
                .long("game")
                .value_name("GAME_ID")
                .help("Identifier of the game to observe")
                .required_unless_present("create-players"),
        )
        .arg(
            Arg::new("ws-url")
                .long("ws-url")
                .value_name("URL")
                .help("WebSocket base address (e.g. ws://localhost:8006)"),
        )
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .value_name("URL")
                .help("REST API base address (e.g. http://localhost:8006)"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("create-players")
                .long("create-players")
                .value_name("NAMES")
                .help("Create a new game with these comma-separated player names and observe it")
                .value_delimiter(',')
                .num_args(1..)
                .conflicts_with("game"),
        )
        .arg(
            Arg::new("start")
                .long("start")
                .help("Start the game before observing it")
                .action(clap::ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["arena", "--game", "g1"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from("arena.toml"));
        assert_eq!(args.game_id.as_deref(), Some("g1"));
        assert!(args.ws_url.is_none());
        assert!(!args.json_logs);
        assert!(args.create_players.is_empty());
        assert!(!args.start);
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "arena",
            "-c",
            "custom.toml",
            "-g",
            "g7",
            "--ws-url",
            "ws://arena:9000",
            "--api-url",
            "http://arena:9000",
            "-l",
            "debug",
            "--json-logs",
            "--start",
        ])
        .unwrap();

        assert_eq!(args.config_path, PathBuf::from("custom.toml"));
        assert_eq!(args.game_id.as_deref(), Some("g7"));
        assert_eq!(args.ws_url.as_deref(), Some("ws://arena:9000"));
        assert_eq!(args.api_url.as_deref(), Some("http://arena:9000"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert!(args.start);
    }

    #[test]
    fn test_create_players_replaces_game() {
        let args =
            CliArgs::try_parse_from(["arena", "--create-players", "Alice,Bob,Carol", "--start"])
                .unwrap();
        assert!(args.game_id.is_none());
        assert_eq!(args.create_players, vec!["Alice", "Bob", "Carol"]);

        assert!(CliArgs::try_parse_from(["arena"]).is_err());
        assert!(
            CliArgs::try_parse_from(["arena", "-g", "g1", "--create-players", "Alice"]).is_err()
        );
    }
}
