//! Move oracles: decision makers that pick a direction for a board.

use crate::cache::{CacheKey, DecisionCache};
use crate::llm_client::{ChatModel, CompletionOptions, LlmError};
use crate::prompt::{SYSTEM_INSTRUCTION, build_prompt};
use crate::resolver::{NoLegalMoves, resolve};
use crate::strategy::StrategyId;
use async_trait::async_trait;
use derive_more::{Display, Error, From};
use llm2048_board::{Board, Direction, LegalMoves};
use rand::seq::IndexedRandom;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Why an oracle could not produce a move.
#[derive(Debug, Clone, Display, Error, From)]
pub enum OracleError {
    /// The board has no legal move; the game is over.
    #[display("no legal moves")]
    NoLegalMoves(NoLegalMoves),
    /// The model call failed.
    #[display("{}", _0)]
    Model(LlmError),
}

/// Chooses a direction for a board.
#[async_trait]
pub trait MoveOracle: Send + Sync {
    /// Returns one member of `legal`.
    async fn choose(&self, board: &Board, legal: LegalMoves) -> Result<Direction, OracleError>;

    /// Label used in logs and game summaries.
    fn name(&self) -> String;

    /// Called when a fresh game starts.
    fn reset(&self) {}
}

/// Picks uniformly among legal moves.
#[derive(Debug, Clone, Default)]
pub struct RandomOracle;

#[async_trait]
impl MoveOracle for RandomOracle {
    #[instrument(skip(self, _board), fields(legal = %legal))]
    async fn choose(&self, _board: &Board, legal: LegalMoves) -> Result<Direction, OracleError> {
        let direction = legal
            .to_vec()
            .choose(&mut rand::rng())
            .copied()
            .ok_or(NoLegalMoves)?;
        debug!(%direction, "Random move");
        Ok(direction)
    }

    fn name(&self) -> String {
        "Random".to_string()
    }
}

/// Asks a language model, with a shared decision cache in front of it.
#[derive(Clone)]
pub struct LlmOracle {
    model: Arc<dyn ChatModel>,
    model_name: String,
    strategy: StrategyId,
    cache: Arc<DecisionCache>,
    options: CompletionOptions,
}

impl LlmOracle {
    /// Creates an oracle over `model`.
    #[instrument(skip(model, model_name, cache), fields(model = %model_name.as_ref(), strategy = %strategy))]
    pub fn new(
        model: Arc<dyn ChatModel>,
        model_name: impl AsRef<str>,
        strategy: StrategyId,
        cache: Arc<DecisionCache>,
        options: CompletionOptions,
    ) -> Self {
        Self {
            model,
            model_name: model_name.as_ref().to_string(),
            strategy,
            cache,
            options,
        }
    }

    /// Strategy used to frame prompts.
    pub fn strategy(&self) -> StrategyId {
        self.strategy
    }

    /// Shared decision cache.
    pub fn cache(&self) -> &Arc<DecisionCache> {
        &self.cache
    }
}

impl std::fmt::Debug for LlmOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmOracle")
            .field("model_name", &self.model_name)
            .field("strategy", &self.strategy)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MoveOracle for LlmOracle {
    #[instrument(skip(self, board), fields(model = %self.model_name, strategy = %self.strategy, legal = %legal))]
    async fn choose(&self, board: &Board, legal: LegalMoves) -> Result<Direction, OracleError> {
        if legal.is_empty() {
            return Err(NoLegalMoves.into());
        }

        let key = CacheKey::new(board, legal, self.strategy);
        if let Some(direction) = self.cache.get(&key) {
            info!(%direction, "Cache hit");
            return Ok(direction);
        }

        let prompt = build_prompt(board, legal, self.strategy);
        let raw = self
            .model
            .complete(&prompt, SYSTEM_INSTRUCTION, &self.options)
            .await?;
        debug!(raw = %raw, "Model replied");

        let resolution = resolve(&raw, legal, &mut rand::rng())?;
        info!(direction = %resolution.direction, pass = %resolution.pass, "Model move resolved");
        self.cache.put(key, resolution.direction);
        Ok(resolution.direction)
    }

    fn name(&self) -> String {
        format!("AI ({}, {})", self.model_name, self.strategy)
    }

    fn reset(&self) {
        self.cache.clear();
    }
}
