use arrayvec::ArrayVec;

use crate::core::{creates_match_at, find_matches, score_matches, BoardState, Grid, SwapError};
use crate::types::{Pos, GRID_COLS, GRID_ROWS, MAX_SWAPS};

/// Swaps in scan order (row-major, right neighbour before lower neighbour)
pub type SwapList = ArrayVec<(Pos, Pos), MAX_SWAPS>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayError {
    NotPlayable,
    NoLegalSwap,
    Rejected(SwapError),
}

impl PlayError {
    pub fn code(self) -> &'static str {
        match self {
            PlayError::NotPlayable => "not_playable",
            PlayError::NoLegalSwap => "no_legal_swap",
            PlayError::Rejected(e) => e.code(),
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            PlayError::NotPlayable => "board is not accepting swaps",
            PlayError::NoLegalSwap => "no swap on the board makes a match",
            PlayError::Rejected(e) => e.message(),
        }
    }
}

fn for_each_adjacent_pair(mut f: impl FnMut(Pos, Pos)) {
    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            let a = Pos::new(row, col);
            if col + 1 < GRID_COLS {
                f(a, Pos::new(row, col + 1));
            }
            if row + 1 < GRID_ROWS {
                f(a, Pos::new(row + 1, col));
            }
        }
    }
}

/// Whether swapping `a` and `b` would create a match. Only the two touched cells can
/// start a new run, so only they are checked.
fn swap_matches(grid: &Grid, a: Pos, b: Pos) -> bool {
    if grid.kind_at(a) == grid.kind_at(b) {
        return false;
    }
    let mut probe = *grid;
    if !probe.swap(a, b) {
        return false;
    }
    creates_match_at(&probe, a) || creates_match_at(&probe, b)
}

/// Every adjacent swap that creates at least one match.
pub fn legal_swaps(grid: &Grid) -> SwapList {
    let mut out = SwapList::new();
    for_each_adjacent_pair(|a, b| {
        if swap_matches(grid, a, b) {
            let _ = out.try_push((a, b));
        }
    });
    out
}

pub fn has_legal_swap(grid: &Grid) -> bool {
    let mut found = false;
    for_each_adjacent_pair(|a, b| {
        if !found && swap_matches(grid, a, b) {
            found = true;
        }
    });
    found
}

/// Greedy hint: the legal swap with the highest immediate score, first in scan order
/// on ties. Cascades are not looked ahead.
pub fn best_swap(grid: &Grid) -> Option<(Pos, Pos)> {
    let mut best: Option<((Pos, Pos), u32)> = None;
    for (a, b) in legal_swaps(grid) {
        let mut probe = *grid;
        probe.swap(a, b);
        let points = score_matches(&find_matches(&probe));
        match best {
            Some((_, top)) if top >= points => {}
            _ => best = Some(((a, b), points)),
        }
    }
    best.map(|(swap, _)| swap)
}

/// Request the hinted swap on a live session (autoplay and bots).
pub fn apply_best_swap(state: &mut BoardState) -> Result<(Pos, Pos), PlayError> {
    if !state.phase().accepts_input() {
        return Err(PlayError::NotPlayable);
    }
    let (a, b) = best_swap(state.grid()).ok_or(PlayError::NoLegalSwap)?;
    state.request_swap(a, b).map_err(PlayError::Rejected)?;
    Ok((a, b))
}
