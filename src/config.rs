//! Application configuration: TOML file, then environment, then CLI flags.

use crate::autoplay::AutoplaySettings;
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::llm_client::{CompletionOptions, DEFAULT_BASE_URL, LlmConfig, LlmProvider};
use crate::strategy::StrategyId;
use derive_getters::Getters;
use derive_more::{Display, Error};
use llm2048_board::DEFAULT_WIN_TILE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Environment variable overriding the model name.
pub const MODEL_ENV: &str = "LLM2048_MODEL";
/// Environment variable overriding the server address (Ollama's own name).
pub const HOST_ENV: &str = "OLLAMA_HOST";
/// Environment variable holding a bearer key for OpenAI-compatible servers.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Settings for a run of the AI player.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Wire protocol of the model server.
    provider: LlmProvider,
    /// Server address.
    base_url: String,
    /// Model name, e.g. `llama3.2`.
    model: String,
    /// Prompt framing.
    strategy: StrategyId,
    /// Sampling temperature.
    temperature: f32,
    /// Token limit per reply.
    max_tokens: u32,
    /// HTTP timeout for one model call, in seconds.
    request_timeout_secs: u64,
    /// Decision cache ceiling.
    cache_capacity: usize,
    /// Board side length.
    board_size: usize,
    /// Tile value that wins.
    win_tile: u32,
    /// Pause between AI moves, in milliseconds.
    move_delay_ms: u64,
    /// Optional move limit per game.
    max_moves: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Ollama,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "llama3.2".to_string(),
            strategy: StrategyId::default(),
            temperature: CompletionOptions::default().temperature,
            max_tokens: CompletionOptions::default().max_tokens,
            request_timeout_secs: 120,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            board_size: 4,
            win_tile: DEFAULT_WIN_TILE,
            move_delay_ms: 2000,
            max_moves: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file. Missing keys take defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(model = %config.model, strategy = %config.strategy, "Config loaded successfully");
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise starts from defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            debug!("Config file absent, using defaults");
            Ok(Self::default())
        }
    }

    /// Applies environment overrides.
    #[instrument(skip(self))]
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup, keyed by variable name.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup(MODEL_ENV) {
            debug!(%model, "Model overridden from environment");
            self.model = model;
        }
        if let Some(host) = lookup(HOST_ENV) {
            self.base_url = normalize_host(&host);
            debug!(base_url = %self.base_url, "Server overridden from environment");
        }
    }

    /// Replaces the model name.
    pub fn set_model(&mut self, model: String) {
        self.model = model;
    }

    /// Replaces the strategy.
    pub fn set_strategy(&mut self, strategy: StrategyId) {
        self.strategy = strategy;
    }

    /// Replaces the server address.
    pub fn set_base_url(&mut self, base_url: String) {
        self.base_url = normalize_host(&base_url);
    }

    /// Replaces the pause between moves.
    pub fn set_move_delay_ms(&mut self, delay: u64) {
        self.move_delay_ms = delay;
    }

    /// Replaces the move limit.
    pub fn set_max_moves(&mut self, max_moves: Option<u32>) {
        self.max_moves = max_moves;
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_size < 2 {
            return Err(ConfigError::new(format!(
                "board_size must be at least 2, got {}",
                self.board_size
            )));
        }
        if self.win_tile < 4 || !self.win_tile.is_power_of_two() {
            return Err(ConfigError::new(format!(
                "win_tile must be a power of two >= 4, got {}",
                self.win_tile
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::new("model must not be empty".to_string()));
        }
        Ok(())
    }

    /// Builds the model client configuration. Reads `OPENAI_API_KEY` for
    /// OpenAI-compatible servers; Ollama needs no key.
    #[instrument(skip(self), fields(provider = ?self.provider, model = %self.model))]
    pub fn llm_config(&self) -> LlmConfig {
        let api_key = match self.provider {
            LlmProvider::Ollama => None,
            LlmProvider::OpenAI => std::env::var(API_KEY_ENV).ok(),
        };
        LlmConfig::new(
            self.provider,
            self.base_url.clone(),
            self.model.clone(),
            api_key,
            Duration::from_secs(self.request_timeout_secs),
        )
    }

    /// Sampling options for each model call.
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Pacing for the autoplay driver.
    pub fn autoplay_settings(&self) -> AutoplaySettings {
        AutoplaySettings::new(Duration::from_millis(self.move_delay_ms), self.max_moves)
    }
}

/// Accepts `host:port` as Ollama does and adds a scheme when missing.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
