//! Square grid of tile values.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// N×N grid of tiles in row-major order. Zero marks an empty cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<u32>,
}

impl Board {
    /// Creates an all-empty board of side `size`.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn empty(size: usize) -> Self {
        assert!(size > 0, "board size must be positive");
        Self {
            size,
            cells: vec![0; size * size],
        }
    }

    /// Builds a board from nested rows, validating shape and tile values.
    #[instrument(skip(rows), fields(rows = rows.len()))]
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self, BoardError> {
        let size = rows.len();
        if size == 0 {
            return Err(BoardError::new("Board must have at least one row".to_string()));
        }

        let mut cells = Vec::with_capacity(size * size);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(BoardError::new(format!(
                    "Row {} has {} cells, expected {}",
                    index,
                    row.len(),
                    size
                )));
            }
            if let Some(bad) = row.iter().find(|&&v| v != 0 && (v < 2 || !v.is_power_of_two())) {
                return Err(BoardError::new(format!(
                    "Row {} holds {}, which is not a power of two >= 2",
                    index, bad
                )));
            }
            cells.extend(row);
        }

        Ok(Self { size, cells })
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tile at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the board.
    pub fn get(&self, row: usize, col: usize) -> u32 {
        assert!(row < self.size && col < self.size, "cell out of bounds");
        self.cells[row * self.size + col]
    }

    /// Sets the tile at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate lies outside the board.
    pub fn set(&mut self, row: usize, col: usize, value: u32) {
        assert!(row < self.size && col < self.size, "cell out of bounds");
        self.cells[row * self.size + col] = value;
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[u32] {
        &self.cells
    }

    /// Iterates over rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        self.cells.chunks(self.size)
    }

    /// Copies the grid into nested rows.
    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        self.rows().map(<[u32]>::to_vec).collect()
    }

    /// Coordinates of every empty cell, row-major.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == 0)
            .map(|(i, _)| (i / self.size, i % self.size))
            .collect()
    }

    /// Sum of all tiles.
    pub fn score(&self) -> u64 {
        self.cells.iter().map(|&v| u64::from(v)).sum()
    }

    /// Largest tile and the coordinate of its first occurrence.
    pub fn max_tile(&self) -> (u32, (usize, usize)) {
        let (index, value) = self
            .cells
            .iter()
            .enumerate()
            .fold((0, 0), |best, (i, &v)| if v > best.1 { (i, v) } else { best });
        (value, (index / self.size, index % self.size))
    }

    /// Fixed-width text grid: every cell right-aligned to four columns.
    pub fn render(&self) -> String {
        self.rows()
            .map(|row| {
                row.iter()
                    .map(|v| format!("{:>4}", v))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Mirror across the main diagonal.
    pub(crate) fn transpose(&self) -> Self {
        let n = self.size;
        let mut cells = vec![0; n * n];
        for row in 0..n {
            for col in 0..n {
                cells[col * n + row] = self.cells[row * n + col];
            }
        }
        Self { size: n, cells }
    }

    /// Reverse every row in place.
    pub(crate) fn reverse_rows(&self) -> Self {
        let mut cells = self.cells.clone();
        for row in cells.chunks_mut(self.size) {
            row.reverse();
        }
        Self {
            size: self.size,
            cells,
        }
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u32]> {
        self.cells.chunks_mut(self.size)
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Rejected board input.
#[derive(Debug, Clone, Display, Error)]
#[display("Board error: {} at {}:{}", message, file, line)]
pub struct BoardError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl BoardError {
    /// Creates a new board error with caller location tracking.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
