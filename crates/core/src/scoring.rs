//! Scoring and resolution planning
//!
//! Rules:
//! - Base points: distinct matched cells x [`CELL_SCORE`] (a cell shared by a row run and
//!   a column run counts once).
//! - Long runs: every gem beyond the third earns [`LONG_MATCH_BONUS`].
//! - A run of 4 upgrades its first free cell to a line-clear gem, a run of 5+ to a color
//!   bomb, and a run that crosses a run of the other axis upgrades the shared cell to an
//!   area bomb. Upgraded gems stay on the board.
//! - Special gems that get cleared detonate; cells removed only by a detonation earn
//!   [`CELL_SCORE`] each.

use arrayvec::ArrayVec;

use crate::grid::Grid;
use crate::matcher::{matched_mask, Match};
use crate::types::{
    Gem, Pos, SpecialKind, CELL_COUNT, CELL_SCORE, GRID_COLS, LONG_MATCH_BONUS, MAX_MATCHES,
    MIN_MATCH_LEN,
};

/// Points for one resolution step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreResult {
    /// Distinct matched cells x CELL_SCORE
    pub base: u32,
    /// Bonus for runs longer than 3
    pub long_bonus: u32,
    /// Cells removed by detonations only
    pub blast_bonus: u32,
    pub total: u32,
}

/// Upgrade granted to one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upgrade {
    pub pos: Pos,
    pub special: SpecialKind,
}

/// Everything one resolution step does to the grid
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvePlan {
    /// Union of all run cells
    pub matched: u64,
    /// Upgrades in match scan order
    pub upgrades: ArrayVec<Upgrade, MAX_MATCHES>,
    /// Cells that receive an upgrade and survive
    pub upgraded: u64,
    /// Cells to remove (runs minus upgraded, plus detonations)
    pub cleared: u64,
    pub score: ScoreResult,
}

/// Base + long-run points for a set of matches.
pub fn score_matches(matches: &[Match]) -> u32 {
    let base = matched_mask(matches).count_ones() * CELL_SCORE;
    base + long_run_bonus(matches)
}

fn long_run_bonus(matches: &[Match]) -> u32 {
    matches
        .iter()
        .filter(|m| m.len() > MIN_MATCH_LEN)
        .map(|m| (m.len() - MIN_MATCH_LEN) as u32 * LONG_MATCH_BONUS)
        .sum()
}

/// Upgrade earned by a run on its own: 4 -> line clear, 5+ -> color bomb
pub fn special_for_len(len: usize) -> SpecialKind {
    match len {
        0..=3 => SpecialKind::None,
        4 => SpecialKind::LineClear,
        _ => SpecialKind::ColorBomb,
    }
}

/// Decide which cells get upgraded.
///
/// Deterministic: matches are visited in scan order and each picks at most one cell;
/// a cell is never targeted twice and a gem that is already special is never chosen
/// (it detonates instead).
pub fn plan_upgrades(grid: &Grid, matches: &[Match]) -> ArrayVec<Upgrade, MAX_MATCHES> {
    let mut out: ArrayVec<Upgrade, MAX_MATCHES> = ArrayVec::new();
    let mut taken = 0u64;

    let is_free = |pos: Pos, taken: u64| {
        taken & pos.bit() == 0
            && grid
                .gem(pos)
                .map(|g| !g.special.is_special())
                .unwrap_or(false)
    };

    for (i, m) in matches.iter().enumerate() {
        let crossing = matches
            .iter()
            .enumerate()
            .filter(|(j, other)| *j != i && other.axis != m.axis)
            .flat_map(|(_, other)| other.cells.iter().copied())
            .find(|p| m.contains(*p));

        let by_len = special_for_len(m.len());
        let (special, target) = match (by_len, crossing) {
            (SpecialKind::ColorBomb, _) => (
                SpecialKind::ColorBomb,
                m.cells.iter().copied().find(|p| is_free(*p, taken)),
            ),
            (_, Some(shared)) => (
                SpecialKind::AreaBomb,
                Some(shared).filter(|p| is_free(*p, taken)),
            ),
            (SpecialKind::LineClear, None) => (
                SpecialKind::LineClear,
                m.cells.iter().copied().find(|p| is_free(*p, taken)),
            ),
            _ => (SpecialKind::None, None),
        };

        if let Some(pos) = target {
            taken |= pos.bit();
            let _ = out.try_push(Upgrade { pos, special });
        }
    }

    out
}

/// Cells a special gem at `pos` removes when it detonates.
pub fn blast_area(grid: &Grid, pos: Pos, gem: Gem) -> u64 {
    match gem.special {
        SpecialKind::None => 0,
        SpecialKind::LineClear => {
            let mut mask = 0u64;
            for col in 0..GRID_COLS {
                mask |= Pos::new(pos.row, col).bit();
            }
            mask
        }
        SpecialKind::AreaBomb => {
            let mut mask = 0u64;
            for dr in -1i8..=1 {
                for dc in -1i8..=1 {
                    if let Some(p) = pos.offset(dr, dc) {
                        mask |= p.bit();
                    }
                }
            }
            mask
        }
        SpecialKind::ColorBomb => {
            let mut mask = 0u64;
            for i in 0..CELL_COUNT {
                if let Some(p) = Pos::from_index(i) {
                    if grid.kind_at(p) == Some(gem.kind) {
                        mask |= p.bit();
                    }
                }
            }
            mask
        }
    }
}

/// Build the full resolution for one set of matches: upgrades, chained detonations
/// and points. The grid is only read; [`crate::BoardState`] applies the plan.
pub fn plan_resolution(grid: &Grid, matches: &[Match]) -> ResolvePlan {
    let matched = matched_mask(matches);
    let upgrades = plan_upgrades(grid, matches);
    let upgraded = upgrades.iter().fold(0u64, |m, u| m | u.pos.bit());

    let mut cleared = matched & !upgraded;
    let mut detonated = 0u64;
    loop {
        let pending = cleared & !detonated;
        let mut grew = false;
        for i in 0..CELL_COUNT {
            if pending & (1u64 << i) == 0 {
                continue;
            }
            detonated |= 1u64 << i;
            let Some(pos) = Pos::from_index(i) else {
                continue;
            };
            let Some(gem) = grid.gem(pos) else {
                continue;
            };
            let blast = blast_area(grid, pos, gem) & !upgraded & !cleared;
            if blast != 0 {
                cleared |= blast;
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }
    // Blasts may hit empty cells; only gems count.
    cleared &= !grid.empty_mask();

    let base = matched.count_ones() * CELL_SCORE;
    let long_bonus = long_run_bonus(matches);
    let blast_bonus = (cleared & !matched).count_ones() * CELL_SCORE;

    ResolvePlan {
        matched,
        upgrades,
        upgraded,
        cleared,
        score: ScoreResult {
            base,
            long_bonus,
            blast_bonus,
            total: base + long_bonus + blast_bonus,
        },
    }
}
