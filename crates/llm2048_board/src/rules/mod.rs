//! Board mechanics: directional moves, spawning and terminal-state detection.
//!
//! Every direction is reduced to a "slide left" problem by transposing
//! (vertical moves) and reversing rows (moves toward the far edge), solved
//! row by row, then mapped back.

mod classify;
mod spawn;

pub use classify::{DEFAULT_WIN_TILE, classify, classify_with};
pub use spawn::{SPAWN_VALUE, new_board, spawn};

use crate::board::Board;
use crate::types::{Direction, LegalMoves, MoveResult};
use tracing::{instrument, trace};

/// Largest tile a `u32` cell can hold. A pair of these never merges.
pub const MAX_TILE: u32 = 1 << 31;

/// True when `a` and `b` would merge into one tile.
pub(crate) fn mergeable(a: u32, b: u32) -> bool {
    a != 0 && a == b && a < MAX_TILE
}

/// Compacts non-zero tiles to the front of `row` keeping their order.
///
/// Returns true when any tile changed column.
fn compact(row: &mut [u32]) -> bool {
    let mut moved = false;
    let mut write = 0;
    for read in 0..row.len() {
        if row[read] != 0 {
            if read != write {
                row[write] = row[read];
                row[read] = 0;
                moved = true;
            }
            write += 1;
        }
    }
    moved
}

/// Slides one row left and merges equal neighbours once per pair.
///
/// Returns true when the row changed.
pub(crate) fn slide_and_merge_left(row: &mut [u32]) -> bool {
    let mut changed = compact(row);
    for j in 0..row.len().saturating_sub(1) {
        if mergeable(row[j], row[j + 1]) {
            row[j] *= 2;
            row[j + 1] = 0;
            changed = true;
        }
    }
    // Close the gaps left by merges.
    compact(row);
    changed
}

fn slide_board_left(mut board: Board) -> (Board, bool) {
    let mut changed = false;
    for row in board.rows_mut() {
        changed |= slide_and_merge_left(row);
    }
    (board, changed)
}

/// Applies `direction` to `board` without spawning.
#[instrument(level = "trace", skip(board), fields(size = board.size()))]
pub fn apply_move(board: &Board, direction: Direction) -> MoveResult {
    let (board, changed) = match direction {
        Direction::Left => slide_board_left(board.clone()),
        Direction::Right => {
            let (b, changed) = slide_board_left(board.reverse_rows());
            (b.reverse_rows(), changed)
        }
        Direction::Up => {
            let (b, changed) = slide_board_left(board.transpose());
            (b.transpose(), changed)
        }
        Direction::Down => {
            let (b, changed) = slide_board_left(board.transpose().reverse_rows());
            (b.reverse_rows().transpose(), changed)
        }
    };
    trace!(changed, "Move applied");
    MoveResult { board, changed }
}

/// Directions whose application would change `board`.
#[instrument(level = "trace", skip(board), fields(size = board.size()))]
pub fn legal_moves(board: &Board) -> LegalMoves {
    Direction::ALL
        .into_iter()
        .filter(|&d| apply_move(board, d).changed)
        .collect()
}
