//! Shared types for Gem Fusion - plain data structures and constants
//!
//! Everything here is pure data with no dependencies, so it can be used by the
//! board engine, the terminal presentation layer and the remote control adapter alike.
//!
//! # Grid Dimensions
//!
//! - **Rows**: 8 (indexed 0-7, top to bottom)
//! - **Columns**: 8 (indexed 0-7, left to right)
//!
//! Gravity pulls gems towards row 7. Refilled gems enter from above row 0.
//!
//! # Scoring
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `CELL_SCORE` | 10 | Points per distinct matched (or blasted) cell |
//! | `LONG_MATCH_BONUS` | 20 | Points per gem beyond 3 in a single run |
//! | `START_MOVES` | 30 | Move budget of a new session |
//!
//! # Settle Durations
//!
//! Each engine phase waits for its animation budget before advancing:
//!
//! | Constant | Value |
//! |----------|-------|
//! | `SWAP_SETTLE_MS` | 160 |
//! | `CLEAR_SETTLE_MS` | 280 |
//! | `FALL_SETTLE_MS` | 150 |
//! | `REFILL_SETTLE_MS` | 200 |
//!
//! # Examples
//!
//! ```
//! use gem_fusion_types::{GemKind, Pos, GRID_COLS, GRID_ROWS};
//!
//! assert_eq!(GemKind::from_str("Ruby"), Some(GemKind::Ruby));
//! assert_eq!(GemKind::from_letter('s'), Some(GemKind::Sapphire));
//!
//! let a = Pos::new(2, 3);
//! assert!(a.is_adjacent(Pos::new(2, 4)));
//! assert!(!a.is_adjacent(Pos::new(3, 4)));
//!
//! assert_eq!(GRID_ROWS, 8);
//! assert_eq!(GRID_COLS, 8);
//! ```

use std::fmt;

/// Grid height in cells (8 rows)
pub const GRID_ROWS: u8 = 8;

/// Grid width in cells (8 columns)
pub const GRID_COLS: u8 = 8;

/// Total number of cells on the grid
pub const CELL_COUNT: usize = (GRID_ROWS as usize) * (GRID_COLS as usize);

/// Shortest run that counts as a match
pub const MIN_MATCH_LEN: usize = 3;

/// Upper bound on simultaneous runs: two per row plus two per column on an 8x8 grid
pub const MAX_MATCHES: usize = 2 * (GRID_ROWS as usize + GRID_COLS as usize);

/// Upper bound on adjacent cell pairs (horizontal + vertical)
pub const MAX_SWAPS: usize = (GRID_ROWS as usize) * (GRID_COLS as usize - 1)
    + (GRID_ROWS as usize - 1) * (GRID_COLS as usize);

/// Longest possible run (a full row or column)
pub const MAX_RUN_LEN: usize = if GRID_ROWS > GRID_COLS {
    GRID_ROWS as usize
} else {
    GRID_COLS as usize
};

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Points per distinct matched cell
pub const CELL_SCORE: u32 = 10;

/// Points per gem beyond the third in a single run
pub const LONG_MATCH_BONUS: u32 = 20;

/// Move budget of a new session
pub const START_MOVES: u32 = 30;

/// Swap slide animation budget
pub const SWAP_SETTLE_MS: u32 = 160;

/// Matched gems fade-out budget (alpha 255 -> 0 at 15 per frame)
pub const CLEAR_SETTLE_MS: u32 = 280;

/// Gravity fall budget
pub const FALL_SETTLE_MS: u32 = 150;

/// Refill drop-in budget
pub const REFILL_SETTLE_MS: u32 = 200;

/// Hard cap on phase transitions performed by a single `settle()` call
pub const MAX_SETTLE_STEPS: u32 = 4096;


/// Number of gem categories in the palette
pub const GEM_KIND_COUNT: usize = 6;

/// The six gem categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GemKind {
    Ruby,
    Sapphire,
    Emerald,
    Topaz,
    Amethyst,
    Diamond,
}

impl GemKind {
    /// Palette in index order
    pub const ALL: [GemKind; GEM_KIND_COUNT] = [
        GemKind::Ruby,
        GemKind::Sapphire,
        GemKind::Emerald,
        GemKind::Topaz,
        GemKind::Amethyst,
        GemKind::Diamond,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    /// Wire/snapshot code: 1-6 (0 is reserved for an empty cell)
    pub fn code(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_code(code: u8) -> Option<Self> {
        (code as usize).checked_sub(1).and_then(Self::from_index)
    }

    /// Parse gem kind from its name (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use gem_fusion_types::GemKind;
    ///
    /// assert_eq!(GemKind::from_str("topaz"), Some(GemKind::Topaz));
    /// assert_eq!(GemKind::from_str("DIAMOND"), Some(GemKind::Diamond));
    /// assert_eq!(GemKind::from_str("opal"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ruby" => Some(GemKind::Ruby),
            "sapphire" => Some(GemKind::Sapphire),
            "emerald" => Some(GemKind::Emerald),
            "topaz" => Some(GemKind::Topaz),
            "amethyst" => Some(GemKind::Amethyst),
            "diamond" => Some(GemKind::Diamond),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GemKind::Ruby => "ruby",
            GemKind::Sapphire => "sapphire",
            GemKind::Emerald => "emerald",
            GemKind::Topaz => "topaz",
            GemKind::Amethyst => "amethyst",
            GemKind::Diamond => "diamond",
        }
    }

    /// Single-letter form used by grid fixtures (`R S E T A D`, case-insensitive)
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'R' => Some(GemKind::Ruby),
            'S' => Some(GemKind::Sapphire),
            'E' => Some(GemKind::Emerald),
            'T' => Some(GemKind::Topaz),
            'A' => Some(GemKind::Amethyst),
            'D' => Some(GemKind::Diamond),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            GemKind::Ruby => 'R',
            GemKind::Sapphire => 'S',
            GemKind::Emerald => 'E',
            GemKind::Topaz => 'T',
            GemKind::Amethyst => 'A',
            GemKind::Diamond => 'D',
        }
    }
}

impl fmt::Display for GemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upgrade carried by a gem
///
/// - **LineClear**: earned by a run of 4; clears its row when cleared
/// - **AreaBomb**: earned where a row run crosses a column run; clears its 3x3 block
/// - **ColorBomb**: earned by a run of 5+; clears every gem of its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpecialKind {
    #[default]
    None,
    LineClear,
    AreaBomb,
    ColorBomb,
}

impl SpecialKind {
    /// Precedence when two upgrades compete for one cell
    pub fn rank(self) -> u8 {
        match self {
            SpecialKind::None => 0,
            SpecialKind::LineClear => 1,
            SpecialKind::AreaBomb => 2,
            SpecialKind::ColorBomb => 3,
        }
    }

    pub fn code(self) -> u8 {
        self.rank()
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SpecialKind::None),
            1 => Some(SpecialKind::LineClear),
            2 => Some(SpecialKind::AreaBomb),
            3 => Some(SpecialKind::ColorBomb),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpecialKind::None => "none",
            SpecialKind::LineClear => "line_clear",
            SpecialKind::AreaBomb => "area_bomb",
            SpecialKind::ColorBomb => "color_bomb",
        }
    }

    pub fn is_special(self) -> bool {
        self != SpecialKind::None
    }
}

/// A gem occupying one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gem {
    pub kind: GemKind,
    pub special: SpecialKind,
}

impl Gem {
    pub const fn new(kind: GemKind) -> Self {
        Self {
            kind,
            special: SpecialKind::None,
        }
    }

    pub const fn with_special(kind: GemKind, special: SpecialKind) -> Self {
        Self { kind, special }
    }
}

/// A grid cell: `None` only transiently between removal and refill
pub type Cell = Option<Gem>;

/// Grid coordinate (row 0 is the top)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: u8,
    pub col: u8,
}

impl Pos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn in_bounds(self) -> bool {
        self.row < GRID_ROWS && self.col < GRID_COLS
    }

    /// Row-major index into a flat cell array
    #[inline(always)]
    pub fn index(self) -> usize {
        (self.row as usize) * (GRID_COLS as usize) + (self.col as usize)
    }

    pub fn from_index(i: usize) -> Option<Self> {
        if i >= CELL_COUNT {
            return None;
        }
        let cols = GRID_COLS as usize;
        Some(Self::new((i / cols) as u8, (i % cols) as u8))
    }

    /// Bit for this cell in a u64 cell set
    #[inline(always)]
    pub fn bit(self) -> u64 {
        1u64 << self.index()
    }

    /// Neighbour at a signed offset, `None` when it leaves the grid
    pub fn offset(self, d_row: i8, d_col: i8) -> Option<Self> {
        let row = self.row as i16 + d_row as i16;
        let col = self.col as i16 + d_col as i16;
        if row < 0 || col < 0 || row >= GRID_ROWS as i16 || col >= GRID_COLS as i16 {
            return None;
        }
        Some(Self::new(row as u8, col as u8))
    }

    /// 4-directional adjacency
    pub fn is_adjacent(self, other: Pos) -> bool {
        let dr = self.row.abs_diff(other.row);
        let dc = self.col.abs_diff(other.col);
        dr + dc == 1
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Direction of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Row,
    Column,
}

/// Engine phase
///
/// `Idle -> AnimatingSwap -> ResolvingMatches -> Falling -> Refilling -> (ResolvingMatches | Idle)`,
/// with `GameOver` entered from `Idle` once the move budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    AnimatingSwap,
    ResolvingMatches,
    Falling,
    Refilling,
    GameOver,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::AnimatingSwap => "animating_swap",
            Phase::ResolvingMatches => "resolving_matches",
            Phase::Falling => "falling",
            Phase::Refilling => "refilling",
            Phase::GameOver => "game_over",
        }
    }

    pub fn accepts_input(self) -> bool {
        self == Phase::Idle
    }

    /// Whether the engine still has transitions to run on its own
    pub fn is_busy(self) -> bool {
        !matches!(self, Phase::Idle | Phase::GameOver)
    }
}

/// Player intents produced by the input layer
///
/// Cursor movement and selection never reach the engine directly; the cursor model
/// turns two selections into a swap request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    /// Select the gem under the cursor
    Select,
    /// Drop the current selection
    Cancel,
    /// Show a legal swap
    Hint,
    /// Start a new session
    Restart,
}

impl PlayerAction {
    /// Parse action from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use gem_fusion_types::PlayerAction;
    ///
    /// assert_eq!(PlayerAction::from_str("select"), Some(PlayerAction::Select));
    /// assert_eq!(PlayerAction::from_str("cursorLeft"), Some(PlayerAction::CursorLeft));
    /// assert_eq!(PlayerAction::from_str("jump"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cursorup" => Some(PlayerAction::CursorUp),
            "cursordown" => Some(PlayerAction::CursorDown),
            "cursorleft" => Some(PlayerAction::CursorLeft),
            "cursorright" => Some(PlayerAction::CursorRight),
            "select" => Some(PlayerAction::Select),
            "cancel" => Some(PlayerAction::Cancel),
            "hint" => Some(PlayerAction::Hint),
            "restart" => Some(PlayerAction::Restart),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerAction::CursorUp => "cursorUp",
            PlayerAction::CursorDown => "cursorDown",
            PlayerAction::CursorLeft => "cursorLeft",
            PlayerAction::CursorRight => "cursorRight",
            PlayerAction::Select => "select",
            PlayerAction::Cancel => "cancel",
            PlayerAction::Hint => "hint",
            PlayerAction::Restart => "restart",
        }
    }
}

/// Record of the most recent engine transition, consumed by the presentation layer.
///
/// Cell sets are u64 bitmasks indexed by [`Pos::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    /// A player swap was applied to the grid
    Swapped { a: Pos, b: Pos },
    /// The swap made no match and was undone
    SwapReverted { a: Pos, b: Pos },
    /// Cells about to be removed, with points awarded and the cascade depth (1 = direct)
    Cleared {
        cells: u64,
        upgraded: u64,
        points: u32,
        cascade: u32,
    },
    /// Gravity result: rows fallen per destination cell
    Collapsed { fall: [u8; CELL_COUNT] },
    /// Cells filled with fresh gems
    Refilled { cells: u64 },
    /// The move budget is spent and the board has settled
    GameOver { score: u32 },
}

impl BoardEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardEvent::Swapped { .. } => "swapped",
            BoardEvent::SwapReverted { .. } => "swap_reverted",
            BoardEvent::Cleared { .. } => "cleared",
            BoardEvent::Collapsed { .. } => "collapsed",
            BoardEvent::Refilled { .. } => "refilled",
            BoardEvent::GameOver { .. } => "game_over",
        }
    }
}
