//! REST client for the game server's HTTP API.
//!
//! Used to create and start games, to submit player actions outside the live
//! channel and to poll game state while the live channel is down.

use crate::config::{env_value, API_URL_ENV, DEFAULT_API_BASE_URL};
use crate::error::ApiError;
use crate::types::{GameResult, GameState, Player, PlayerAction};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Settings for [`GameApi`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base address of the REST API, without a trailing `/api`
    pub base_url: String,
    /// Timeout applied to every request
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            // Agents can take a while to answer on action endpoints
            timeout: Duration::from_secs(30),
        }
    }
}

impl ApiConfig {
    /// Default settings with `ARENA_API_URL` applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env_value(API_URL_ENV) {
            self.base_url = url;
        }
        self
    }
}

/// Typed client for the game REST endpoints.
#[derive(Debug, Clone)]
pub struct GameApi {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl GameApi {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates a new game with the given players.
    pub async fn create_game(&self, players: &[Player]) -> Result<GameState, ApiError> {
        self.post("/api/games", Some(&json!({ "players": players })))
            .await
    }

    pub async fn get_game_state(&self, game_id: &str) -> Result<GameState, ApiError> {
        self.get(&format!("/api/games/{game_id}")).await
    }

    pub async fn start_game(&self, game_id: &str) -> Result<GameState, ApiError> {
        self.post::<(), _>(&format!("/api/games/{game_id}/start"), None)
            .await
    }

    pub async fn perform_action(
        &self,
        game_id: &str,
        action: &PlayerAction,
    ) -> Result<GameState, ApiError> {
        self.post(&format!("/api/games/{game_id}/action"), Some(action))
            .await
    }

    pub async fn buy_item(&self, game_id: &str, item_type: &str) -> Result<GameState, ApiError> {
        self.post(
            &format!("/api/games/{game_id}/buy-item"),
            Some(&json!({ "item_type": item_type })),
        )
        .await
    }

    pub async fn use_item(
        &self,
        game_id: &str,
        item_id: &str,
        target_player_id: &str,
    ) -> Result<GameState, ApiError> {
        self.post(
            &format!("/api/games/{game_id}/use-item"),
            Some(&json!({
                "item_id": item_id,
                "target_player_id": target_player_id,
            })),
        )
        .await
    }

    /// Asks another player for `amount`, with a message attached.
    pub async fn negotiate(
        &self,
        game_id: &str,
        target_player_id: &str,
        amount: i64,
        message: &str,
    ) -> Result<GameState, ApiError> {
        self.post(
            &format!("/api/games/{game_id}/negotiate"),
            Some(&json!({
                "target_player_id": target_player_id,
                "amount": amount,
                "message": message,
            })),
        )
        .await
    }

    pub async fn respond_negotiation(
        &self,
        game_id: &str,
        negotiation_id: &str,
        accepted: bool,
    ) -> Result<GameState, ApiError> {
        self.post(
            &format!("/api/games/{game_id}/respond-negotiation"),
            Some(&json!({
                "negotiation_id": negotiation_id,
                "accepted": accepted,
            })),
        )
        .await
    }

    pub async fn get_game_result(&self, game_id: &str) -> Result<GameResult, ApiError> {
        self.get(&format!("/api/games/{game_id}/result")).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let url = self.url(path);
        debug!("➡️ GET {}", url);
        let request = self.client.get(&url).timeout(self.timeout);
        self.execute(url, request).await
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<R, ApiError> {
        let url = self.url(path);
        debug!("➡️ POST {}", url);
        let mut request = self.client.post(&url).timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(url, request).await
    }

    async fn execute<R: DeserializeOwned>(
        &self,
        url: String,
        request: reqwest::RequestBuilder,
    ) -> Result<R, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.request_error(&url, e))?;

        let status = response.status();
        debug!("⬅️ {} {}", status.as_u16(), url);
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(&url, e))?;

        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            url,
            message: e.to_string(),
        })
    }

    fn request_error(&self, url: &str, source: reqwest::Error) -> ApiError {
        if source.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            ApiError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}
