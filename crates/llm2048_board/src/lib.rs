//! Pure 2048 board mechanics.
//!
//! This crate owns the grid algebra only: sliding and merging in four
//! directions, spawning tiles, legal-move detection and win/lose
//! classification. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use llm2048_board::{Board, Direction, apply_move};
//!
//! let board = Board::from_rows(vec![
//!     vec![2, 2, 0, 0],
//!     vec![0, 0, 0, 0],
//!     vec![0, 0, 0, 0],
//!     vec![0, 0, 0, 0],
//! ])
//! .unwrap();
//! let result = apply_move(&board, Direction::Left);
//! assert!(result.changed);
//! assert_eq!(result.board.get(0, 0), 4);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod board;
mod game;
mod rules;
mod types;

pub use board::{Board, BoardError};
pub use game::Game;
pub use rules::{
    DEFAULT_WIN_TILE, MAX_TILE, SPAWN_VALUE, apply_move, classify, classify_with, legal_moves,
    new_board, spawn,
};
pub use types::{Direction, GameState, LegalMoves, MoveResult};
