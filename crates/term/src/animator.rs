//! Animator: turns board events into per-cell motion.
//!
//! The board engine only reports what happened ([`BoardEvent`]) and waits a settle
//! duration per phase. All interpolation lives here, in grid units; the view converts
//! grid units to terminal cells.

use crate::core::RuleSet;
use crate::types::{BoardEvent, Pos, CELL_COUNT, GRID_COLS, GRID_ROWS};

/// How long a score popup stays in the side panel
pub const POPUP_MS: u32 = 900;

/// Visual state of one grid cell for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellVisual {
    /// Offset in grid rows (negative is up)
    pub d_row: f32,
    /// Offset in grid columns
    pub d_col: f32,
    /// 1 = fully visible, 0 = gone
    pub alpha: f32,
    /// Cell was just upgraded to a special gem
    pub flash: bool,
}

impl Default for CellVisual {
    fn default() -> Self {
        Self {
            d_row: 0.0,
            d_col: 0.0,
            alpha: 1.0,
            flash: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Still,
    /// Gems at `a` and `b` slide in from each other's cell
    Swap { a: Pos, b: Pos },
    Clear { cells: u64, upgraded: u64 },
    /// Rows to fall per destination cell
    Fall { rows: [u8; CELL_COUNT] },
    /// New gems drop in from above the grid
    Drop { rows: [u8; CELL_COUNT] },
}

/// Score popup shown after a clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Popup {
    pub points: u32,
    pub cascade: u32,
    pub remaining_ms: u32,
}

#[derive(Debug, Clone)]
pub struct Animator {
    rules: RuleSet,
    motion: Motion,
    elapsed_ms: u32,
    duration_ms: u32,
    popup: Option<Popup>,
    game_over: bool,
}

impl Animator {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            motion: Motion::Still,
            elapsed_ms: 0,
            duration_ms: 0,
            popup: None,
            game_over: false,
        }
    }

    /// Drop any motion in flight (restart)
    pub fn reset(&mut self) {
        self.motion = Motion::Still;
        self.elapsed_ms = 0;
        self.duration_ms = 0;
        self.popup = None;
        self.game_over = false;
    }

    pub fn on_event(&mut self, event: BoardEvent) {
        match event {
            BoardEvent::Swapped { a, b } | BoardEvent::SwapReverted { a, b } => {
                self.start(Motion::Swap { a, b }, self.rules.swap_settle_ms);
            }
            BoardEvent::Cleared {
                cells,
                upgraded,
                points,
                cascade,
            } => {
                self.start(Motion::Clear { cells, upgraded }, self.rules.clear_settle_ms);
                self.popup = Some(Popup {
                    points,
                    cascade,
                    remaining_ms: POPUP_MS,
                });
            }
            BoardEvent::Collapsed { fall } => {
                self.start(Motion::Fall { rows: fall }, self.rules.fall_settle_ms);
            }
            BoardEvent::Refilled { cells } => {
                self.start(Motion::Drop { rows: drop_rows(cells) }, self.rules.refill_settle_ms);
            }
            BoardEvent::GameOver { .. } => {
                self.game_over = true;
            }
        }
    }

    pub fn tick(&mut self, elapsed_ms: u32) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms).min(self.duration_ms);
        if let Some(p) = self.popup.as_mut() {
            p.remaining_ms = p.remaining_ms.saturating_sub(elapsed_ms);
            if p.remaining_ms == 0 {
                self.popup = None;
            }
        }
    }

    /// Progress of the current motion in `[0, 1]`
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        self.elapsed_ms as f32 / self.duration_ms as f32
    }

    pub fn is_animating(&self) -> bool {
        self.motion != Motion::Still && self.elapsed_ms < self.duration_ms
    }

    pub fn popup(&self) -> Option<Popup> {
        self.popup
    }

    pub fn saw_game_over(&self) -> bool {
        self.game_over
    }

    pub fn cell_visual(&self, pos: Pos) -> CellVisual {
        if !self.is_animating() || !pos.in_bounds() {
            return CellVisual::default();
        }
        let t = ease_out(self.progress());
        let left = 1.0 - t;

        match self.motion {
            Motion::Still => CellVisual::default(),
            Motion::Swap { a, b } => {
                let from = if pos == a {
                    b
                } else if pos == b {
                    a
                } else {
                    return CellVisual::default();
                };
                CellVisual {
                    d_row: (from.row as f32 - pos.row as f32) * left,
                    d_col: (from.col as f32 - pos.col as f32) * left,
                    ..CellVisual::default()
                }
            }
            Motion::Clear { cells, upgraded } => {
                if cells & pos.bit() != 0 {
                    CellVisual {
                        alpha: left,
                        ..CellVisual::default()
                    }
                } else {
                    CellVisual {
                        flash: upgraded & pos.bit() != 0,
                        ..CellVisual::default()
                    }
                }
            }
            Motion::Fall { rows } | Motion::Drop { rows } => CellVisual {
                d_row: -(rows[pos.index()] as f32) * left,
                ..CellVisual::default()
            },
        }
    }

    fn start(&mut self, motion: Motion, duration_ms: u32) {
        self.motion = motion;
        self.elapsed_ms = 0;
        self.duration_ms = duration_ms;
    }
}

/// Refilled gems enter from above: each one starts as many rows higher as there are
/// new gems in its column.
fn drop_rows(cells: u64) -> [u8; CELL_COUNT] {
    let mut rows = [0u8; CELL_COUNT];
    for col in 0..GRID_COLS {
        let filled = (0..GRID_ROWS)
            .filter(|&row| cells & Pos::new(row, col).bit() != 0)
            .count() as u8;
        for row in 0..GRID_ROWS {
            let pos = Pos::new(row, col);
            if cells & pos.bit() != 0 {
                rows[pos.index()] = filled;
            }
        }
    }
    rows
}

fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animator() -> Animator {
        Animator::new(RuleSet::default())
    }

    #[test]
    fn test_idle_cells_are_identity() {
        let a = animator();
        assert!(!a.is_animating());
        assert_eq!(a.cell_visual(Pos::new(2, 2)), CellVisual::default());
    }

    #[test]
    fn test_swap_slides_from_partner_cell() {
        let mut a = animator();
        let (p, q) = (Pos::new(3, 3), Pos::new(3, 4));
        a.on_event(BoardEvent::Swapped { a: p, b: q });

        let v = a.cell_visual(p);
        assert_eq!(v.d_col, 1.0);
        assert_eq!(v.d_row, 0.0);
        assert_eq!(a.cell_visual(q).d_col, -1.0);
        assert_eq!(a.cell_visual(Pos::new(0, 0)), CellVisual::default());

        a.tick(RuleSet::default().swap_settle_ms);
        assert!(!a.is_animating());
        assert_eq!(a.cell_visual(p), CellVisual::default());
    }

    #[test]
    fn test_clear_fades_and_flashes_upgrades() {
        let mut a = animator();
        let cleared = Pos::new(0, 1).bit() | Pos::new(0, 2).bit();
        let upgraded = Pos::new(0, 0).bit();
        a.on_event(BoardEvent::Cleared {
            cells: cleared,
            upgraded,
            points: 60,
            cascade: 1,
        });
        a.tick(RuleSet::default().clear_settle_ms / 2);

        let v = a.cell_visual(Pos::new(0, 1));
        assert!(v.alpha < 1.0 && v.alpha > 0.0);
        assert!(a.cell_visual(Pos::new(0, 0)).flash);
        assert_eq!(a.popup().map(|p| p.points), Some(60));
    }

    #[test]
    fn test_fall_offsets_shrink_to_zero() {
        let mut a = animator();
        let mut fall = [0u8; CELL_COUNT];
        fall[Pos::new(5, 2).index()] = 2;
        a.on_event(BoardEvent::Collapsed { fall });

        assert_eq!(a.cell_visual(Pos::new(5, 2)).d_row, -2.0);
        a.tick(RuleSet::default().fall_settle_ms / 2);
        let mid = a.cell_visual(Pos::new(5, 2)).d_row;
        assert!(mid > -2.0 && mid < 0.0);
        a.tick(RuleSet::default().fall_settle_ms);
        assert_eq!(a.cell_visual(Pos::new(5, 2)).d_row, 0.0);
    }

    #[test]
    fn test_refill_drops_by_column_count() {
        let cells = Pos::new(0, 4).bit() | Pos::new(1, 4).bit() | Pos::new(0, 6).bit();
        let rows = drop_rows(cells);
        assert_eq!(rows[Pos::new(0, 4).index()], 2);
        assert_eq!(rows[Pos::new(1, 4).index()], 2);
        assert_eq!(rows[Pos::new(0, 6).index()], 1);
        assert_eq!(rows[Pos::new(2, 4).index()], 0);
    }

    #[test]
    fn test_popup_expires() {
        let mut a = animator();
        a.on_event(BoardEvent::Cleared {
            cells: 0b111,
            upgraded: 0,
            points: 30,
            cascade: 2,
        });
        a.tick(POPUP_MS - 1);
        assert!(a.popup().is_some());
        a.tick(1);
        assert!(a.popup().is_none());
    }

    #[test]
    fn test_game_over_and_reset() {
        let mut a = animator();
        a.on_event(BoardEvent::GameOver { score: 10 });
        assert!(a.saw_game_over());
        a.reset();
        assert!(!a.saw_game_over());
    }
}
