//! Game payload types shared by the live connection and the REST API.
//!
//! The game server has shipped with slightly different field names over time
//! (`round` vs `current_round`, `winner_id` vs `winner`, ...). The models accept
//! both spellings and keep any field they do not know about in `extra`, so a
//! newer server never breaks deserialization of an older client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    Waiting,
    Active,
    Paused,
    Completed,
    #[serde(other)]
    Unknown,
}

/// Full snapshot of a game as sent in `game_state` messages and REST responses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: String,
    #[serde(default, alias = "current_round")]
    pub round: u32,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub prize_pool: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_player_id: Option<String>,
    #[serde(default)]
    pub status: GameStatus,
    #[serde(default, alias = "winner", skip_serializing_if = "Option::is_none")]
    pub winner_id: Option<String>,
    #[serde(default, alias = "start_time", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, alias = "last_update", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameState {
    /// Players that are still in the game.
    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|player| player.is_active)
    }

    /// Looks up a player by id.
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == player_id)
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Player {
    /// Creates a player entry for `create_game`.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance: 100,
            is_active: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }
}

fn default_true() -> bool {
    true
}

/// A card held by a player.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default)]
    pub price: i64,
    #[serde(default, rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub used: bool,
}

/// An action performed by a player, as broadcast in `game_action` messages.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameAction {
    pub player_id: String,
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_process: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An action submitted by this client. The server stamps the time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerAction {
    pub player_id: String,
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}

impl PlayerAction {
    pub fn new(player_id: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            action_type: action_type.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_target(mut self, target_player_id: impl Into<String>) -> Self {
        self.target_player_id = Some(target_player_id.into());
        self
    }

    #[must_use]
    pub fn with_amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Payload of a `game_end` message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameEnd {
    #[serde(default, alias = "winner")]
    pub winner_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Final result of a completed game.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameResult {
    pub game_id: String,
    pub winner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner_name: Option<String>,
    #[serde(default)]
    pub final_balance: i64,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default, alias = "total_rounds")]
    pub rounds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default)]
    pub prize_pool: i64,
}
