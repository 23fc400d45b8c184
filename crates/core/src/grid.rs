//! Grid module - the 8x8 gem grid
//!
//! Flat row-major array of cells for cache locality and zero allocation.
//! Coordinates are `Pos { row, col }` with row 0 at the top; gravity pulls towards
//! the last row. Cell sets are passed around as u64 bitmasks (see [`Pos::bit`]).

use std::fmt;

use crate::rng::GemSource;
use crate::types::{Cell, Gem, GemKind, Pos, CELL_COUNT, GRID_COLS, GRID_ROWS};

/// The gem grid - 8 rows x 8 columns using flat array storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid {
    /// Flat array of cells, row-major order (row * COLS + col)
    cells: [Cell; CELL_COUNT],
}

/// Error returned by [`Grid::parse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridParseError {
    RowCount(usize),
    RowWidth { row: usize, width: usize },
    UnknownGem { row: usize, col: usize, ch: char },
}

impl fmt::Display for GridParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridParseError::RowCount(n) => {
                write!(f, "expected {} rows, found {}", GRID_ROWS, n)
            }
            GridParseError::RowWidth { row, width } => {
                write!(f, "row {} has {} cells, expected {}", row, width, GRID_COLS)
            }
            GridParseError::UnknownGem { row, col, ch } => {
                write!(f, "unknown gem '{}' at ({}, {})", ch, row, col)
            }
        }
    }
}

impl std::error::Error for GridParseError {}

impl Grid {
    /// Create a new empty grid
    pub fn new() -> Self {
        Self {
            cells: [None; CELL_COUNT],
        }
    }

    /// Populate every cell so that no row or column starts with a triple.
    ///
    /// Cells are filled row by row, left to right. A kind is excluded when the two
    /// cells to the left or the two cells above already share it.
    pub fn populate(source: &mut GemSource) -> Self {
        let mut grid = Self::new();
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLS {
                let pos = Pos::new(row, col);
                let mut excluded = [GemKind::Ruby; 2];
                let mut n = 0usize;

                if col >= 2 {
                    let l1 = grid.kind_at(Pos::new(row, col - 1));
                    let l2 = grid.kind_at(Pos::new(row, col - 2));
                    if let (Some(a), Some(b)) = (l1, l2) {
                        if a == b {
                            excluded[n] = a;
                            n += 1;
                        }
                    }
                }

                if row >= 2 {
                    let u1 = grid.kind_at(Pos::new(row - 1, col));
                    let u2 = grid.kind_at(Pos::new(row - 2, col));
                    if let (Some(a), Some(b)) = (u1, u2) {
                        if a == b {
                            excluded[n] = a;
                            n += 1;
                        }
                    }
                }

                let kind = source.any_except(&excluded[..n]);
                grid.set(pos, Some(Gem::new(kind)));
            }
        }
        grid
    }

    /// Build a grid from letter rows (`R S E T A D`, `.` for empty).
    ///
    /// Whitespace inside a row is ignored, so `"R S E T A D R S"` and `"RSETADRS"` are
    /// equivalent. Blank lines are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use gem_fusion_core::Grid;
    /// use gem_fusion_core::types::{GemKind, Pos};
    ///
    /// let grid = Grid::parse(
    ///     "RRRSADRS
    ///      ETADRSET
    ///      ADRSETAD
    ///      RSETADRS
    ///      ETADRSET
    ///      ADRSETAD
    ///      RSETADRS
    ///      ETADRSET",
    /// )
    /// .unwrap();
    /// assert_eq!(grid.kind_at(Pos::new(0, 3)), Some(GemKind::Sapphire));
    /// ```
    pub fn parse(s: &str) -> Result<Self, GridParseError> {
        let rows: Vec<&str> = s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if rows.len() != GRID_ROWS as usize {
            return Err(GridParseError::RowCount(rows.len()));
        }

        let mut grid = Self::new();
        for (r, line) in rows.iter().enumerate() {
            let chars: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
            if chars.len() != GRID_COLS as usize {
                return Err(GridParseError::RowWidth {
                    row: r,
                    width: chars.len(),
                });
            }
            for (c, ch) in chars.into_iter().enumerate() {
                let cell = if ch == '.' {
                    None
                } else {
                    let kind = GemKind::from_letter(ch).ok_or(GridParseError::UnknownGem {
                        row: r,
                        col: c,
                        ch,
                    })?;
                    Some(Gem::new(kind))
                };
                grid.cells[r * GRID_COLS as usize + c] = cell;
            }
        }
        Ok(grid)
    }

    pub fn rows(&self) -> u8 {
        GRID_ROWS
    }

    pub fn cols(&self) -> u8 {
        GRID_COLS
    }

    /// Get cell at `pos`; `None` if out of bounds
    pub fn get(&self, pos: Pos) -> Option<Cell> {
        if !pos.in_bounds() {
            return None;
        }
        Some(self.cells[pos.index()])
    }

    /// Gem at `pos`, flattening out-of-bounds and empty
    pub fn gem(&self, pos: Pos) -> Option<Gem> {
        self.get(pos).flatten()
    }

    pub fn kind_at(&self, pos: Pos) -> Option<GemKind> {
        self.gem(pos).map(|g| g.kind)
    }

    /// Set cell at `pos`; returns false if out of bounds
    pub fn set(&mut self, pos: Pos, cell: Cell) -> bool {
        if !pos.in_bounds() {
            return false;
        }
        self.cells[pos.index()] = cell;
        true
    }

    /// Exchange two cells; returns false if either is out of bounds
    pub fn swap(&mut self, a: Pos, b: Pos) -> bool {
        if !a.in_bounds() || !b.in_bounds() {
            return false;
        }
        self.cells.swap(a.index(), b.index());
        true
    }

    pub fn is_occupied(&self, pos: Pos) -> bool {
        matches!(self.get(pos), Some(Some(_)))
    }

    /// Empty every cell in `mask`; returns how many gems were removed
    pub fn clear_mask(&mut self, mask: u64) -> u32 {
        let mut removed = 0;
        for i in 0..CELL_COUNT {
            if mask & (1u64 << i) != 0 && self.cells[i].take().is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Compact each column downward, preserving the order of the gems.
    ///
    /// `fall` receives, for every destination cell, how many rows its gem fell
    /// (0 for cells that did not move). Returns whether any gem moved.
    pub fn collapse(&mut self, fall: &mut [u8; CELL_COUNT]) -> bool {
        fall.fill(0);
        let mut moved = false;

        for col in 0..GRID_COLS {
            // Two-pointer pass from the bottom: `write` is the next free slot.
            let mut write = GRID_ROWS;
            for read in (0..GRID_ROWS).rev() {
                let src = Pos::new(read, col);
                let Some(gem) = self.cells[src.index()] else {
                    continue;
                };
                write -= 1;
                if write != read {
                    let dst = Pos::new(write, col);
                    self.cells[dst.index()] = Some(gem);
                    self.cells[src.index()] = None;
                    fall[dst.index()] = write - read;
                    moved = true;
                }
            }
        }

        moved
    }

    /// Fill every empty cell, top-down, with a fresh unconstrained gem.
    /// Returns the set of cells filled.
    pub fn refill(&mut self, source: &mut GemSource) -> u64 {
        let mut filled = 0u64;
        for col in 0..GRID_COLS {
            for row in 0..GRID_ROWS {
                let pos = Pos::new(row, col);
                if self.cells[pos.index()].is_none() {
                    self.cells[pos.index()] = Some(Gem::new(source.any()));
                    filled |= pos.bit();
                }
            }
        }
        filled
    }

    /// Every cell holds a gem
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }

    /// No column has an empty cell below an occupied one
    pub fn is_settled(&self) -> bool {
        (0..GRID_COLS).all(|col| {
            let mut seen_gem = false;
            (0..GRID_ROWS).all(|row| {
                let occupied = self.cells[Pos::new(row, col).index()].is_some();
                if occupied {
                    seen_gem = true;
                    true
                } else {
                    !seen_gem
                }
            })
        })
    }

    /// Set of empty cells
    pub fn empty_mask(&self) -> u64 {
        let mut mask = 0u64;
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.is_none() {
                mask |= 1u64 << i;
            }
        }
        mask
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Clear the entire grid
    pub fn clear(&mut self) {
        self.cells.fill(None);
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Grid {
    /// Letter rows, the inverse of [`Grid::parse`]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLS {
                let ch = self
                    .kind_at(Pos::new(row, col))
                    .map(|k| k.letter())
                    .unwrap_or('.');
                write!(f, "{}", ch)?;
            }
            if row + 1 < GRID_ROWS {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
