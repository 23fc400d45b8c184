//! Match detection
//!
//! Scans every row (top to bottom) and then every column (left to right) for maximal
//! runs of at least [`MIN_MATCH_LEN`] gems of one kind. A horizontal and a vertical run
//! may share a cell; both are reported.

use arrayvec::ArrayVec;

use crate::grid::Grid;
use crate::types::{Axis, GemKind, Pos, GRID_COLS, GRID_ROWS, MAX_MATCHES, MAX_RUN_LEN, MIN_MATCH_LEN};

/// A maximal run of same-kind gems along one axis, cells in scan order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub kind: GemKind,
    pub axis: Axis,
    pub cells: ArrayVec<Pos, MAX_RUN_LEN>,
}

impl Match {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn first(&self) -> Option<Pos> {
        self.cells.first().copied()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.contains(&pos)
    }

    /// Cell set as a bitmask
    pub fn mask(&self) -> u64 {
        self.cells.iter().fold(0u64, |m, p| m | p.bit())
    }

    /// Coordinates as `(row, col)` tuples
    pub fn coords(&self) -> ArrayVec<(u8, u8), MAX_RUN_LEN> {
        self.cells.iter().map(|p| (p.row, p.col)).collect()
    }
}

/// All runs found in one scan
pub type MatchList = ArrayVec<Match, MAX_MATCHES>;

/// Find every maximal run of length >= 3, rows first then columns.
pub fn find_matches(grid: &Grid) -> MatchList {
    let mut out = MatchList::new();

    for row in 0..GRID_ROWS {
        scan_line(grid, Axis::Row, row, GRID_COLS, &mut out);
    }
    for col in 0..GRID_COLS {
        scan_line(grid, Axis::Column, col, GRID_ROWS, &mut out);
    }

    out
}

fn scan_line(grid: &Grid, axis: Axis, line: u8, len: u8, out: &mut MatchList) {
    let at = |i: u8| match axis {
        Axis::Row => Pos::new(line, i),
        Axis::Column => Pos::new(i, line),
    };

    let mut i = 0u8;
    while i < len {
        let Some(kind) = grid.kind_at(at(i)) else {
            i += 1;
            continue;
        };

        let mut run = 1u8;
        while i + run < len && grid.kind_at(at(i + run)) == Some(kind) {
            run += 1;
        }

        if run as usize >= MIN_MATCH_LEN {
            let cells = (i..i + run).map(at).collect();
            // Capacity is sized for the densest possible grid.
            let _ = out.try_push(Match { kind, axis, cells });
        }
        i += run;
    }
}

/// Union of all matched cells
pub fn matched_mask(matches: &[Match]) -> u64 {
    matches.iter().fold(0u64, |m, r| m | r.mask())
}

/// Whether the gem at `pos` sits in a run of 3+ along either axis.
///
/// Cheaper than a full scan when only the cells touched by a swap can have changed.
pub fn creates_match_at(grid: &Grid, pos: Pos) -> bool {
    let Some(kind) = grid.kind_at(pos) else {
        return false;
    };

    let count = |dr: i8, dc: i8| {
        let mut n = 0usize;
        let mut cur = pos;
        while let Some(next) = cur.offset(dr, dc) {
            if grid.kind_at(next) != Some(kind) {
                break;
            }
            n += 1;
            cur = next;
        }
        n
    };

    let horizontal = 1 + count(0, -1) + count(0, 1);
    let vertical = 1 + count(-1, 0) + count(1, 0);
    horizontal >= MIN_MATCH_LEN || vertical >= MIN_MATCH_LEN
}
