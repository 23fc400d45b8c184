//! Cursor and selection over the grid.
//!
//! Selecting works like clicking a gem: the first pick marks it, picking an adjacent
//! gem asks for a swap, picking a distant gem moves the mark, and picking the marked
//! gem again drops it.

use crate::types::{PlayerAction, Pos, GRID_COLS, GRID_ROWS};

/// What a cursor operation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOutcome {
    Moved(Pos),
    Selected(Pos),
    Deselected,
    /// Two adjacent gems were picked; the selection is cleared
    SwapRequested(Pos, Pos),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pos: Pos,
    selected: Option<Pos>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

impl Cursor {
    /// Cursor near the centre of the grid, nothing selected
    pub fn new() -> Self {
        Self {
            pos: Pos::new(GRID_ROWS / 2 - 1, GRID_COLS / 2 - 1),
            selected: None,
        }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn selected(&self) -> Option<Pos> {
        self.selected
    }

    /// Place the cursor; out-of-bounds positions are ignored.
    pub fn set_pos(&mut self, pos: Pos) -> bool {
        if !pos.in_bounds() {
            return false;
        }
        self.pos = pos;
        true
    }

    /// Move by one step, clamped to the grid edges.
    pub fn move_by(&mut self, d_row: i8, d_col: i8) -> CursorOutcome {
        match self.pos.offset(d_row, d_col) {
            Some(next) if next != self.pos => {
                self.pos = next;
                CursorOutcome::Moved(next)
            }
            _ => CursorOutcome::Ignored,
        }
    }

    /// Pick the gem under the cursor.
    pub fn select(&mut self) -> CursorOutcome {
        self.select_at(self.pos)
    }

    /// Pick the gem at `pos`, also moving the cursor there.
    pub fn select_at(&mut self, pos: Pos) -> CursorOutcome {
        if !pos.in_bounds() {
            return CursorOutcome::Ignored;
        }
        self.pos = pos;

        match self.selected {
            None => {
                self.selected = Some(pos);
                CursorOutcome::Selected(pos)
            }
            Some(prev) if prev == pos => {
                self.selected = None;
                CursorOutcome::Deselected
            }
            Some(prev) if prev.is_adjacent(pos) => {
                self.selected = None;
                CursorOutcome::SwapRequested(prev, pos)
            }
            Some(_) => {
                self.selected = Some(pos);
                CursorOutcome::Selected(pos)
            }
        }
    }

    pub fn cancel(&mut self) -> CursorOutcome {
        if self.selected.take().is_some() {
            CursorOutcome::Deselected
        } else {
            CursorOutcome::Ignored
        }
    }

    /// Back to the starting position with nothing selected
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Apply a cursor-level action. Hint and restart are not cursor actions.
    pub fn apply(&mut self, action: PlayerAction) -> CursorOutcome {
        match action {
            PlayerAction::CursorUp => self.move_by(-1, 0),
            PlayerAction::CursorDown => self.move_by(1, 0),
            PlayerAction::CursorLeft => self.move_by(0, -1),
            PlayerAction::CursorRight => self.move_by(0, 1),
            PlayerAction::Select => self.select(),
            PlayerAction::Cancel => self.cancel(),
            PlayerAction::Hint | PlayerAction::Restart => CursorOutcome::Ignored,
        }
    }
}
