//! Board state module - the session state machine
//!
//! Owns the grid, RNG, score and move budget, and drives every transition:
//!
//! ```text
//! Idle -> AnimatingSwap -> ResolvingMatches -> Falling -> Refilling -> Idle
//!              |                 ^                            |
//!              +--(no match)--> Idle          (cascade) ------+
//! ```
//!
//! Callers feed it swap requests and time; they never touch the grid directly.

use std::fmt;

use arrayvec::ArrayVec;

use crate::grid::Grid;
use crate::matcher::{find_matches, MatchList};
use crate::rng::GemSource;
use crate::scoring::plan_resolution;
use crate::snapshot::{board_hash, BoardSnapshot};
use crate::types::{
    BoardEvent, Gem, Phase, Pos, CELL_COUNT, CLEAR_SETTLE_MS, FALL_SETTLE_MS, GRID_COLS,
    GRID_ROWS, MAX_SETTLE_STEPS, REFILL_SETTLE_MS, START_MOVES, SWAP_SETTLE_MS,
};

/// Tunable rules for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSet {
    pub start_moves: u32,
    /// A swap that makes no match still costs its move
    pub charge_reverted_swaps: bool,
    pub swap_settle_ms: u32,
    pub clear_settle_ms: u32,
    pub fall_settle_ms: u32,
    pub refill_settle_ms: u32,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            start_moves: START_MOVES,
            charge_reverted_swaps: true,
            swap_settle_ms: SWAP_SETTLE_MS,
            clear_settle_ms: CLEAR_SETTLE_MS,
            fall_settle_ms: FALL_SETTLE_MS,
            refill_settle_ms: REFILL_SETTLE_MS,
        }
    }
}

impl RuleSet {
    /// Defaults overridden by `GEM_MOVES` and `GEM_CHARGE_REVERTED`.
    pub fn from_env() -> Self {
        let mut rules = Self::default();
        if let Some(moves) = std::env::var("GEM_MOVES")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
        {
            rules.start_moves = moves;
        }
        if let Ok(v) = std::env::var("GEM_CHARGE_REVERTED") {
            rules.charge_reverted_swaps = parse_flag(&v).unwrap_or(rules.charge_reverted_swaps);
        }
        rules
    }

    /// Time the given phase is shown before the engine moves on
    pub fn settle_ms(&self, phase: Phase) -> u32 {
        match phase {
            Phase::AnimatingSwap => self.swap_settle_ms,
            Phase::ResolvingMatches => self.clear_settle_ms,
            Phase::Falling => self.fall_settle_ms,
            Phase::Refilling => self.refill_settle_ms,
            Phase::Idle | Phase::GameOver => 0,
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Why a swap request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapError {
    OutOfBounds,
    SameCell,
    NotAdjacent,
    NotIdle,
    GameOver,
}

impl SwapError {
    pub fn code(self) -> &'static str {
        match self {
            SwapError::OutOfBounds => "out_of_bounds",
            SwapError::SameCell => "same_cell",
            SwapError::NotAdjacent => "not_adjacent",
            SwapError::NotIdle => "not_idle",
            SwapError::GameOver => "game_over",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            SwapError::OutOfBounds => "cell outside the grid",
            SwapError::SameCell => "cannot swap a cell with itself",
            SwapError::NotAdjacent => "cells are not orthogonally adjacent",
            SwapError::NotIdle => "board is still resolving",
            SwapError::GameOver => "no moves left",
        }
    }
}

impl fmt::Display for SwapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for SwapError {}

/// Complete board session
#[derive(Debug, Clone)]
pub struct BoardState {
    grid: Grid,
    source: GemSource,
    rules: RuleSet,
    phase: Phase,
    /// Time spent in the current phase
    phase_timer_ms: u32,
    score: u32,
    moves_left: u32,
    /// Seed the current episode was populated from
    seed: u32,
    /// Monotonic episode id (increments on restart)
    episode_id: u32,
    /// Monotonic id of accepted swap requests within the episode
    turn_id: u32,
    /// Chain depth of the resolution in progress (1 = direct match, 0 = none)
    cascade: u32,
    pending_swap: Option<(Pos, Pos)>,
    pending_clear: u64,
    /// Fall distances from the last collapse
    fall: [u8; CELL_COUNT],
    /// Transitions not yet consumed by observers, oldest first
    events: EventQueue,
}

/// Events recorded since the last drain
pub type EventQueue = ArrayVec<BoardEvent, EVENT_QUEUE_LEN>;

/// A transition records at most two events; older ones are dropped past this.
pub const EVENT_QUEUE_LEN: usize = 8;

impl BoardState {
    /// New session with default rules
    pub fn new(seed: u32) -> Self {
        Self::with_rules(seed, RuleSet::default())
    }

    pub fn with_rules(seed: u32, rules: RuleSet) -> Self {
        let mut state = Self::empty(seed, rules);
        state.initialize();
        state
    }

    /// Session over a prepared grid; refills still draw from `seed`.
    ///
    /// The grid is taken as is: it may already contain matches, which the first swap
    /// resolution will pick up along with the swap's own.
    pub fn from_grid(grid: Grid, seed: u32, rules: RuleSet) -> Self {
        let mut state = Self::empty(seed, rules);
        state.grid = grid;
        state
    }

    fn empty(seed: u32, rules: RuleSet) -> Self {
        Self {
            grid: Grid::new(),
            source: GemSource::new(seed),
            rules,
            phase: Phase::Idle,
            phase_timer_ms: 0,
            score: 0,
            moves_left: rules.start_moves,
            seed,
            episode_id: 0,
            turn_id: 0,
            cascade: 0,
            pending_swap: None,
            pending_clear: 0,
            fall: [0; CELL_COUNT],
            events: EventQueue::new(),
        }
    }

    /// Populate a fresh grid and reset the counters of the episode.
    pub fn initialize(&mut self) {
        self.grid = Grid::populate(&mut self.source);
        self.phase = Phase::Idle;
        self.phase_timer_ms = 0;
        self.score = 0;
        self.moves_left = self.rules.start_moves;
        self.turn_id = 0;
        self.cascade = 0;
        self.pending_swap = None;
        self.pending_clear = 0;
        self.fall = [0; CELL_COUNT];
        self.events.clear();
        if self.moves_left == 0 {
            self.phase = Phase::GameOver;
        }
    }

    /// Start a new episode, continuing the RNG sequence.
    pub fn restart(&mut self) {
        self.seed = self.source.seed();
        self.source = GemSource::new(self.seed);
        self.episode_id = self.episode_id.wrapping_add(1);
        self.initialize();
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn episode_id(&self) -> u32 {
        self.episode_id
    }

    pub fn turn_id(&self) -> u32 {
        self.turn_id
    }

    pub fn cascade(&self) -> u32 {
        self.cascade
    }

    pub fn pending_swap(&self) -> Option<(Pos, Pos)> {
        self.pending_swap
    }

    /// Fall distances recorded by the last gravity pass
    pub fn fall(&self) -> &[u8; CELL_COUNT] {
        &self.fall
    }

    /// Move budget spent and the board has settled
    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Whether the engine is between idle states
    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    /// Most recent transition; drops anything older that was not taken
    pub fn take_last_event(&mut self) -> Option<BoardEvent> {
        let last = self.events.last().copied();
        self.events.clear();
        last
    }

    /// Every pending transition, oldest first
    pub fn take_events(&mut self) -> EventQueue {
        std::mem::take(&mut self.events)
    }

    pub fn last_event(&self) -> Option<BoardEvent> {
        self.events.last().copied()
    }

    /// All runs currently on the grid
    pub fn find_matches(&self) -> MatchList {
        find_matches(&self.grid)
    }

    /// Swap two adjacent gems and start the swap animation phase.
    ///
    /// Consumes one move. Rejected requests change nothing.
    pub fn request_swap(&mut self, a: Pos, b: Pos) -> Result<(), SwapError> {
        if self.phase == Phase::GameOver || self.moves_left == 0 {
            return Err(SwapError::GameOver);
        }
        if self.phase != Phase::Idle {
            return Err(SwapError::NotIdle);
        }
        if !a.in_bounds() || !b.in_bounds() {
            return Err(SwapError::OutOfBounds);
        }
        if a == b {
            return Err(SwapError::SameCell);
        }
        if !a.is_adjacent(b) {
            return Err(SwapError::NotAdjacent);
        }

        self.grid.swap(a, b);
        self.moves_left -= 1;
        self.turn_id = self.turn_id.wrapping_add(1);
        self.pending_swap = Some((a, b));
        self.enter(Phase::AnimatingSwap);
        self.push_event(BoardEvent::Swapped { a, b });
        Ok(())
    }

    /// Check the swapped grid once the swap motion is over.
    ///
    /// Returns whether the swap produced a match. A swap without a match is undone.
    pub fn resolve_after_animation(&mut self) -> bool {
        if self.phase != Phase::AnimatingSwap {
            return false;
        }
        let Some((a, b)) = self.pending_swap.take() else {
            self.finish_turn();
            return false;
        };

        let matches = find_matches(&self.grid);
        if !matches.is_empty() {
            self.cascade = 1;
            self.begin_resolution(&matches);
            return true;
        }

        self.grid.swap(a, b);
        if !self.rules.charge_reverted_swaps {
            self.moves_left += 1;
        }
        self.push_event(BoardEvent::SwapReverted { a, b });
        self.finish_turn();
        false
    }

    /// Compact every column downward. Returns whether any gem moved.
    pub fn apply_gravity(&mut self) -> bool {
        let moved = self.grid.collapse(&mut self.fall);
        self.push_event(BoardEvent::Collapsed { fall: self.fall });
        moved
    }

    /// Fill every empty cell. Returns the filled cells.
    pub fn refill(&mut self) -> u64 {
        let cells = self.grid.refill(&mut self.source);
        self.push_event(BoardEvent::Refilled { cells });
        cells
    }

    /// Run one phase transition. Returns whether anything happened.
    pub fn advance(&mut self) -> bool {
        match self.phase {
            Phase::Idle | Phase::GameOver => false,
            Phase::AnimatingSwap => {
                self.resolve_after_animation();
                true
            }
            Phase::ResolvingMatches => {
                self.grid.clear_mask(self.pending_clear);
                self.pending_clear = 0;
                self.apply_gravity();
                self.enter(Phase::Falling);
                true
            }
            Phase::Falling => {
                self.refill();
                self.enter(Phase::Refilling);
                true
            }
            Phase::Refilling => {
                let matches = find_matches(&self.grid);
                if matches.is_empty() {
                    self.finish_turn();
                } else {
                    self.cascade += 1;
                    self.begin_resolution(&matches);
                }
                true
            }
        }
    }

    /// Accumulate time and run at most one transition once the current phase's settle
    /// duration has elapsed. Returns whether a transition ran.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if !self.phase.is_busy() {
            self.phase_timer_ms = 0;
            return false;
        }

        self.phase_timer_ms = self.phase_timer_ms.saturating_add(elapsed_ms);
        let needed = self.rules.settle_ms(self.phase);
        if self.phase_timer_ms < needed {
            return false;
        }
        self.advance()
    }

    /// Run transitions until the board is idle (or game over). Returns the number of
    /// transitions run.
    pub fn settle(&mut self) -> u32 {
        let mut steps = 0;
        while self.phase.is_busy() && steps < MAX_SETTLE_STEPS {
            self.advance();
            steps += 1;
        }
        steps
    }

    /// Progress through the current phase in `[0, 1]`
    pub fn phase_progress(&self) -> f32 {
        let needed = self.rules.settle_ms(self.phase);
        if needed == 0 {
            return 1.0;
        }
        (self.phase_timer_ms as f32 / needed as f32).min(1.0)
    }

    pub fn snapshot_into(&self, out: &mut BoardSnapshot) {
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLS {
                let gem = self.grid.gem(Pos::new(row, col));
                let (r, c) = (row as usize, col as usize);
                out.gems[r][c] = gem.map(|g| g.kind.code()).unwrap_or(0);
                out.specials[r][c] = gem.map(|g| g.special.code()).unwrap_or(0);
            }
        }
        out.board_hash = board_hash(&out.gems, &out.specials);
        out.phase = self.phase;
        out.score = self.score;
        out.moves_left = self.moves_left;
        out.episode_id = self.episode_id;
        out.seed = self.seed;
        out.turn_id = self.turn_id;
        out.cascade = self.cascade;
        out.pending_swap = self.pending_swap;
        out.game_over = self.is_game_over();
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        let mut s = BoardSnapshot::default();
        self.snapshot_into(&mut s);
        s
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_timer_ms = 0;
    }

    fn begin_resolution(&mut self, matches: &MatchList) {
        let plan = plan_resolution(&self.grid, matches);
        for upgrade in &plan.upgrades {
            if let Some(gem) = self.grid.gem(upgrade.pos) {
                self.grid
                    .set(upgrade.pos, Some(Gem::with_special(gem.kind, upgrade.special)));
            }
        }

        self.score = self.score.saturating_add(plan.score.total);
        self.pending_clear = plan.cleared;
        self.enter(Phase::ResolvingMatches);
        self.push_event(BoardEvent::Cleared {
            cells: plan.cleared,
            upgraded: plan.upgraded,
            points: plan.score.total,
            cascade: self.cascade,
        });
    }

    fn finish_turn(&mut self) {
        self.cascade = 0;
        self.pending_swap = None;
        if self.moves_left == 0 {
            self.enter(Phase::GameOver);
            self.push_event(BoardEvent::GameOver { score: self.score });
        } else {
            self.enter(Phase::Idle);
        }
    }

    fn push_event(&mut self, event: BoardEvent) {
        if self.events.is_full() {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    #[cfg(test)]
    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GemKind, SpecialKind};

    const BASE: &str = "RSETADRS
                        ETADRSET
                        ADRSETAD
                        RSETADRS
                        ETADRSET
                        ADRSETAD
                        RSETADRS
                        ETADRSET";

    fn state_with_row0(row0: &str) -> BoardState {
        let grid = Grid::parse(&BASE.replacen("RSETADRS", row0, 1)).unwrap();
        BoardState::from_grid(grid, 7, RuleSet::default())
    }

    #[test]
    fn test_new_board_is_idle_full_and_match_free() {
        let state = BoardState::new(12345);
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.grid().is_full());
        assert!(state.find_matches().is_empty());
        assert_eq!(state.moves_left(), START_MOVES);
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn test_swap_validation() {
        let mut state = state_with_row0("RSETADRS");
        let before = *state.grid();

        assert_eq!(
            state.request_swap(Pos::new(0, 0), Pos::new(0, 8)),
            Err(SwapError::OutOfBounds)
        );
        assert_eq!(
            state.request_swap(Pos::new(0, 0), Pos::new(0, 0)),
            Err(SwapError::SameCell)
        );
        assert_eq!(
            state.request_swap(Pos::new(0, 0), Pos::new(1, 1)),
            Err(SwapError::NotAdjacent)
        );
        assert_eq!(
            state.request_swap(Pos::new(0, 0), Pos::new(0, 2)),
            Err(SwapError::NotAdjacent)
        );
        assert_eq!(state.grid(), &before);
        assert_eq!(state.moves_left(), START_MOVES);
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn test_swap_rejected_while_busy() {
        let mut state = state_with_row0("RRSRADRS");
        state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();
        assert_eq!(
            state.request_swap(Pos::new(5, 5), Pos::new(5, 6)),
            Err(SwapError::NotIdle)
        );
        assert_eq!(state.moves_left(), START_MOVES - 1);
    }

    #[test]
    fn test_swap_emits_event_and_enters_animation() {
        let mut state = state_with_row0("RRSRADRS");
        state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();
        assert_eq!(state.phase(), Phase::AnimatingSwap);
        assert_eq!(
            state.take_last_event(),
            Some(BoardEvent::Swapped {
                a: Pos::new(0, 2),
                b: Pos::new(0, 3)
            })
        );
        assert_eq!(state.take_last_event(), None);
        assert_eq!(state.grid().kind_at(Pos::new(0, 2)), Some(GemKind::Ruby));
    }

    #[test]
    fn test_matching_swap_scores_and_settles() {
        let mut state = state_with_row0("RRSRADRS");
        state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();

        assert!(state.resolve_after_animation());
        assert_eq!(state.phase(), Phase::ResolvingMatches);
        match state.take_last_event() {
            Some(BoardEvent::Cleared {
                cells,
                points,
                cascade,
                ..
            }) => {
                assert_eq!(cells.count_ones(), 3);
                assert_eq!(points, 30);
                assert_eq!(cascade, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }

        state.settle();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.grid().is_full());
        assert!(state.find_matches().is_empty());
        assert!(state.score() >= 30);
        assert_eq!(state.moves_left(), START_MOVES - 1);
        assert_eq!(state.cascade(), 0);
    }

    #[test]
    fn test_non_matching_swap_reverts() {
        let mut state = state_with_row0("RSETADRS");
        let before = *state.grid();
        state.request_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        assert_ne!(state.grid(), &before);

        assert!(!state.resolve_after_animation());
        assert_eq!(state.grid(), &before);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.score(), 0);
        assert_eq!(state.moves_left(), START_MOVES - 1);
        assert_eq!(
            state.take_last_event(),
            Some(BoardEvent::SwapReverted {
                a: Pos::new(0, 0),
                b: Pos::new(0, 1)
            })
        );
    }

    #[test]
    fn test_reverted_swap_refund_when_configured() {
        let grid = Grid::parse(BASE).unwrap();
        let rules = RuleSet {
            charge_reverted_swaps: false,
            ..RuleSet::default()
        };
        let mut state = BoardState::from_grid(grid, 7, rules);
        state.request_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        state.settle();
        assert_eq!(state.moves_left(), START_MOVES);
    }

    #[test]
    fn test_four_run_upgrade_survives_clear() {
        let mut state = state_with_row0("RRRRADRS");
        // Kick the resolution through a no-op swap far from row 0.
        state.phase = Phase::AnimatingSwap;
        state.pending_swap = Some((Pos::new(7, 6), Pos::new(7, 7)));
        state.grid_mut().swap(Pos::new(7, 6), Pos::new(7, 7));
        assert!(state.resolve_after_animation());

        let gem = state.grid().gem(Pos::new(0, 0)).unwrap();
        assert_eq!(gem.special, SpecialKind::LineClear);
        assert_eq!(gem.kind, GemKind::Ruby);

        assert!(state.advance());
        assert_eq!(state.phase(), Phase::Falling);
        // The upgraded gem stays in row 0; nothing above it can fall.
        let gem = state.grid().gem(Pos::new(0, 0)).unwrap();
        assert_eq!(gem.special, SpecialKind::LineClear);
        assert!(state.grid().is_settled());
    }

    #[test]
    fn test_tick_waits_for_settle_duration() {
        let mut state = state_with_row0("RSETADRS");
        state.request_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();

        assert!(!state.tick(SWAP_SETTLE_MS - 1));
        assert_eq!(state.phase(), Phase::AnimatingSwap);
        assert!(state.tick(1));
        assert_eq!(state.phase(), Phase::Idle);
        assert!(!state.tick(1000));
    }

    #[test]
    fn test_tick_runs_one_transition_per_call() {
        let mut state = state_with_row0("RRSRADRS");
        state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();
        assert!(state.tick(10_000));
        assert_eq!(state.phase(), Phase::ResolvingMatches);
        assert!(state.tick(10_000));
        assert_eq!(state.phase(), Phase::Falling);
    }

    #[test]
    fn test_gravity_and_refill_transitions() {
        let mut state = state_with_row0("RRSRADRS");
        state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();
        state.advance(); // resolve
        state.advance(); // clear + gravity
        assert!(state.grid().is_settled());
        assert!(!state.grid().is_full());
        assert!(matches!(
            state.take_last_event(),
            Some(BoardEvent::Collapsed { .. })
        ));

        state.advance(); // refill
        assert!(state.grid().is_full());
        match state.take_last_event() {
            Some(BoardEvent::Refilled { cells }) => assert_eq!(cells.count_ones(), 3),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_game_over_after_last_move() {
        let grid = Grid::parse(BASE).unwrap();
        let rules = RuleSet {
            start_moves: 1,
            ..RuleSet::default()
        };
        let mut state = BoardState::from_grid(grid, 7, rules);
        assert!(!state.is_game_over());

        state.request_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        assert!(!state.is_game_over());
        state.settle();
        assert!(state.is_game_over());
        assert_eq!(
            state.request_swap(Pos::new(0, 0), Pos::new(0, 1)),
            Err(SwapError::GameOver)
        );
    }

    #[test]
    fn test_game_over_event_after_cascade() {
        let grid = Grid::parse(&BASE.replacen("RSETADRS", "RRSRADRS", 1)).unwrap();
        let rules = RuleSet {
            start_moves: 1,
            ..RuleSet::default()
        };
        let mut state = BoardState::from_grid(grid, 7, rules);
        state.request_swap(Pos::new(0, 2), Pos::new(0, 3)).unwrap();
        let mut last = None;
        while state.is_busy() {
            state.advance();
            if let Some(ev) = state.take_last_event() {
                last = Some(ev);
            }
        }
        assert_eq!(
            last,
            Some(BoardEvent::GameOver {
                score: state.score()
            })
        );
    }

    #[test]
    fn test_restart_increments_episode_and_resets() {
        let mut state = BoardState::new(99);
        state.request_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        state.settle();

        state.restart();
        assert_eq!(state.episode_id(), 1);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.moves_left(), START_MOVES);
        assert_eq!(state.score(), 0);
        assert_eq!(state.turn_id(), 0);
        assert!(state.find_matches().is_empty());
    }

    #[test]
    fn test_same_seed_same_session() {
        let mut a = BoardState::new(4242);
        let mut b = BoardState::new(4242);
        assert_eq!(a.grid(), b.grid());

        for (p, q) in [
            (Pos::new(3, 3), Pos::new(3, 4)),
            (Pos::new(5, 1), Pos::new(6, 1)),
        ] {
            let ra = a.request_swap(p, q);
            let rb = b.request_swap(p, q);
            assert_eq!(ra, rb);
            a.settle();
            b.settle();
            assert_eq!(a.snapshot(), b.snapshot());
        }
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let state = state_with_row0("RRRSADRS");
        let snap = state.snapshot();
        assert_eq!(snap.gems[0][0], GemKind::Ruby.code());
        assert_eq!(snap.gems[0][3], GemKind::Sapphire.code());
        assert_eq!(snap.specials[0][0], 0);
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.moves_left, START_MOVES);
        assert!(!snap.game_over);
        assert_ne!(snap.board_hash, 0);
    }

    #[test]
    fn test_swap_error_codes() {
        assert_eq!(SwapError::NotAdjacent.code(), "not_adjacent");
        assert_eq!(
            SwapError::GameOver.to_string(),
            "game_over: no moves left"
        );
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" False "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
