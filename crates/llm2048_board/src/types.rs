//! Core domain types for 2048.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::board::Board;

/// Direction tiles slide in.
///
/// Variants are declared in canonical order (UP, DOWN, LEFT, RIGHT); every
/// set of directions iterates in this order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Direction {
    /// Slide toward row 0.
    Up,
    /// Slide toward the last row.
    Down,
    /// Slide toward column 0.
    Left,
    /// Slide toward the last column.
    Right,
}

impl Direction {
    /// All four directions in canonical order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Upper-case name as the model is asked to write it.
    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Classification of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameState {
    /// The winning tile is on the board.
    Win,
    /// At least one move is still possible.
    Continue,
    /// No empty cell and no adjacent equal pair.
    Lose,
}

impl GameState {
    /// Returns true for WIN and LOSE.
    pub fn is_terminal(self) -> bool {
        !matches!(self, GameState::Continue)
    }
}

/// Outcome of applying one directional operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    /// Board after sliding and merging.
    pub board: Board,
    /// False when the move left every cell untouched.
    pub changed: bool,
}

/// Set of directions, iterated in canonical order.
///
/// Two sets holding the same directions are equal and hash identically
/// regardless of insertion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LegalMoves(u8);

impl LegalMoves {
    /// The empty set.
    pub const NONE: LegalMoves = LegalMoves(0);

    /// Every direction.
    pub const ALL: LegalMoves = LegalMoves(0b1111);

    /// Adds a direction.
    pub fn insert(&mut self, direction: Direction) {
        self.0 |= direction.bit();
    }

    /// Returns a copy with `direction` added.
    pub fn with(mut self, direction: Direction) -> Self {
        self.insert(direction);
        self
    }

    /// Membership test.
    pub fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    /// True when no direction is legal.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of directions in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates in canonical order.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    /// First member in canonical order.
    pub fn first(self) -> Option<Direction> {
        self.iter().next()
    }

    /// Collects the members into a vector.
    pub fn to_vec(self) -> Vec<Direction> {
        self.iter().collect()
    }
}

impl FromIterator<Direction> for LegalMoves {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        iter.into_iter()
            .fold(LegalMoves::NONE, |set, direction| set.with(direction))
    }
}

impl std::fmt::Display for LegalMoves {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(Direction::name).collect();
        write!(f, "{}", names.join(", "))
    }
}
