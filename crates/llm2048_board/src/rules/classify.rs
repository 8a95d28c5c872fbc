//! Terminal-state detection.

use super::mergeable;
use crate::board::Board;
use crate::types::GameState;
use tracing::instrument;

/// Tile value that wins the game unless configured otherwise.
pub const DEFAULT_WIN_TILE: u32 = 2048;

/// Classifies `board` against the default winning tile.
#[instrument(level = "trace", skip(board))]
pub fn classify(board: &Board) -> GameState {
    classify_with(board, DEFAULT_WIN_TILE)
}

/// Classifies `board` against `win_tile`.
///
/// WIN if any cell equals `win_tile`; otherwise CONTINUE if a cell is empty
/// or two orthogonal neighbours are equal and below [`MAX_TILE`]; otherwise
/// LOSE.
///
/// [`MAX_TILE`]: super::MAX_TILE
#[instrument(level = "trace", skip(board))]
pub fn classify_with(board: &Board, win_tile: u32) -> GameState {
    if board.cells().contains(&win_tile) {
        return GameState::Win;
    }
    if board.cells().contains(&0) {
        return GameState::Continue;
    }

    let n = board.size();
    let last = n - 1;

    // Interior pairs: right and down neighbours of every cell not on the
    // trailing row or column.
    for i in 0..last {
        for j in 0..last {
            let v = board.get(i, j);
            if mergeable(v, board.get(i + 1, j)) || mergeable(v, board.get(i, j + 1)) {
                return GameState::Continue;
            }
        }
    }
    // Trailing row, horizontal pairs.
    for k in 0..last {
        if mergeable(board.get(last, k), board.get(last, k + 1)) {
            return GameState::Continue;
        }
    }
    // Trailing column, vertical pairs.
    for k in 0..last {
        if mergeable(board.get(k, last), board.get(k + 1, last)) {
            return GameState::Continue;
        }
    }

    GameState::Lose
}
