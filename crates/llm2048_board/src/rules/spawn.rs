//! Random tile placement.

use crate::board::Board;
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{instrument, trace};

/// Value of every spawned tile.
pub const SPAWN_VALUE: u32 = 2;

/// Places a 2 on a uniformly chosen empty cell.
///
/// A full board is returned unchanged.
#[instrument(level = "trace", skip(board, rng), fields(size = board.size()))]
pub fn spawn<R: Rng + ?Sized>(mut board: Board, rng: &mut R) -> Board {
    let empty = board.empty_cells();
    if let Some(&(row, col)) = empty.choose(rng) {
        trace!(row, col, "Spawning tile");
        board.set(row, col, SPAWN_VALUE);
    }
    board
}

/// Creates an N×N board holding two spawned tiles.
#[instrument(level = "trace", skip(rng))]
pub fn new_board<R: Rng + ?Sized>(size: usize, rng: &mut R) -> Board {
    let board = spawn(Board::empty(size), rng);
    spawn(board, rng)
}
