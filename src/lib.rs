//! llm2048 library - 2048 with a language model at the controls
//!
//! The engine lives in the `llm2048_board` crate; this crate adds the AI player.
//!
//! # Architecture
//!
//! - **Prompt**: renders a board, its legal moves and a strategy into a prompt
//! - **Resolver**: turns free-form model output into a guaranteed legal move
//! - **Cache**: remembers decisions per (board, legal moves, strategy)
//! - **LLM client**: Ollama or OpenAI-compatible chat over HTTP
//! - **Worker**: runs one move request off the game loop, cancellable
//! - **Autoplay**: plays a whole game through the worker
//!
//! # Example
//!
//! ```no_run
//! use llm2048::{AppConfig, Autoplay, DecisionCache, Game, LlmClient, LlmOracle, MoveOracle};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = AppConfig::default();
//! let client = Arc::new(LlmClient::new(config.llm_config())?);
//! let oracle: Arc<dyn MoveOracle> = Arc::new(LlmOracle::new(
//!     client,
//!     config.model(),
//!     *config.strategy(),
//!     Arc::new(DecisionCache::default()),
//!     config.completion_options(),
//! ));
//!
//! let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
//! let mut autoplay = Autoplay::new(Game::new(4), oracle, config.autoplay_settings(), tx);
//! let summary = autoplay.run().await;
//! println!("{} after {} moves", summary.outcome(), summary.moves());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod autoplay;
mod cache;
mod config;
mod llm_client;
mod oracle;
mod prompt;
mod resolver;
mod strategy;
mod worker;

// Crate-level exports - Engine
pub use llm2048_board::{
    Board, BoardError, DEFAULT_WIN_TILE, Direction, Game, GameState, LegalMoves, MAX_TILE,
    MoveResult, apply_move, classify, classify_with, legal_moves, new_board, spawn,
};

// Crate-level exports - Configuration
pub use config::{API_KEY_ENV, AppConfig, ConfigError, HOST_ENV, MODEL_ENV};

// Crate-level exports - Strategies and prompts
pub use prompt::{SYSTEM_INSTRUCTION, build_prompt};
pub use strategy::StrategyId;

// Crate-level exports - Output resolution
pub use resolver::{NoLegalMoves, Normalized, Resolution, ResolvedBy, normalize, resolve};

// Crate-level exports - Decision cache
pub use cache::{CacheKey, DEFAULT_CACHE_CAPACITY, DecisionCache};

// Crate-level exports - LLM client
pub use llm_client::{
    ChatModel, CompletionOptions, DEFAULT_BASE_URL, LlmClient, LlmConfig, LlmError, LlmErrorKind,
    LlmProvider, ModelInfo,
};

// Crate-level exports - Oracles
pub use oracle::{LlmOracle, MoveOracle, OracleError, RandomOracle};

// Crate-level exports - Background worker
pub use worker::{
    MoveWorker, THINKING_MESSAGE, WorkerError, WorkerEvent, WorkerFailure, WorkerState,
    start_ai_move,
};

// Crate-level exports - AI play
pub use autoplay::{Autoplay, AutoplaySettings, GameEvent, GameSummary, Outcome, StopHandle};
