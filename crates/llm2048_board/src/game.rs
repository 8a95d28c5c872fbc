//! Mutable game session over the pure board mechanics.

use crate::board::Board;
use crate::rules::{DEFAULT_WIN_TILE, apply_move, classify_with, legal_moves, new_board, spawn};
use crate::types::{Direction, GameState, LegalMoves};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument};

/// One game of 2048: board, move counter and undo history.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    history: Vec<Board>,
    moves: u32,
    win_tile: u32,
    rng: StdRng,
}

impl Game {
    /// Starts a game on an N×N board seeded from the thread RNG.
    #[instrument]
    pub fn new(size: usize) -> Self {
        Self::with_rng(size, DEFAULT_WIN_TILE, StdRng::from_rng(&mut rand::rng()))
    }

    /// Starts a reproducible game from `seed`.
    #[instrument]
    pub fn seeded(size: usize, win_tile: u32, seed: u64) -> Self {
        Self::with_rng(size, win_tile, StdRng::seed_from_u64(seed))
    }

    /// Starts a game with an explicit RNG.
    pub fn with_rng(size: usize, win_tile: u32, mut rng: StdRng) -> Self {
        let board = new_board(size, &mut rng);
        info!(size, win_tile, "New game");
        Self {
            board,
            history: Vec::new(),
            moves: 0,
            win_tile,
            rng,
        }
    }

    /// Resumes play from an existing board.
    pub fn from_board(board: Board, win_tile: u32, rng: StdRng) -> Self {
        Self {
            board,
            history: Vec::new(),
            moves: 0,
            win_tile,
            rng,
        }
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Number of board-changing moves played.
    pub fn moves(&self) -> u32 {
        self.moves
    }

    /// Winning tile for this game.
    pub fn win_tile(&self) -> u32 {
        self.win_tile
    }

    /// Sum of all tiles.
    pub fn score(&self) -> u64 {
        self.board.score()
    }

    /// Classifies the current board.
    pub fn status(&self) -> GameState {
        classify_with(&self.board, self.win_tile)
    }

    /// Directions that would change the current board.
    pub fn legal_moves(&self) -> LegalMoves {
        legal_moves(&self.board)
    }

    /// Plays `direction`. Returns false, recording nothing, if the board
    /// would not change.
    #[instrument(skip(self), fields(moves = self.moves))]
    pub fn play(&mut self, direction: Direction) -> bool {
        let result = apply_move(&self.board, direction);
        if !result.changed {
            debug!("Move does not change the board");
            return false;
        }
        let previous = std::mem::replace(&mut self.board, spawn(result.board, &mut self.rng));
        self.history.push(previous);
        self.moves += 1;
        true
    }

    /// Restores the board before the last move. Returns false when there is
    /// nothing to undo.
    #[instrument(skip(self))]
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(board) => {
                self.board = board;
                self.moves = self.moves.saturating_sub(1);
                debug!(remaining = self.history.len(), "Undid move");
                true
            }
            None => false,
        }
    }
}
