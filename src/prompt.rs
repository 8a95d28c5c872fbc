//! Prompt construction for the model-backed oracle.
//!
//! Output depends only on the board, the legal-move set and the strategy.

use crate::strategy::StrategyId;
use llm2048_board::{Board, LegalMoves};
use tracing::{debug, instrument};

/// System instruction sent alongside every prompt.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert 2048 player. \
Answer with exactly one word naming a move. Do not explain.";

/// Builds the user prompt for one decision.
#[instrument(skip(board), fields(size = board.size(), legal = %legal, strategy = %strategy))]
pub fn build_prompt(board: &Board, legal: LegalMoves, strategy: StrategyId) -> String {
    let (max_value, (max_row, max_col)) = board.max_tile();
    let moves: Vec<&str> = legal.iter().map(|d| d.name()).collect();
    let options = moves.join(", ");

    let prompt = format!(
        "You are playing 2048 on a {n}x{n} board. Sliding tiles merges equal \
neighbours into their sum; a new 2 appears after every move that changes the board.\n\
\n\
Current board (0 = empty):\n\
{grid}\n\
\n\
Score: {score}\n\
Empty cells: {empty}\n\
Largest tile: {max_value} at row {row}, column {col}\n\
\n\
{guidance}\n\
\n\
Legal moves: {options}\n\
Respond with ONLY one word from: {options}",
        n = board.size(),
        grid = board.render(),
        score = board.score(),
        empty = board.empty_cells().len(),
        row = max_row + 1,
        col = max_col + 1,
        guidance = strategy.guidance(),
    );

    debug!(length = prompt.len(), "Prompt built");
    prompt
}
