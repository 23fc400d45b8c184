use crate::types::{Phase, Pos, GRID_COLS, GRID_ROWS};

pub type CodeGrid = [[u8; GRID_COLS as usize]; GRID_ROWS as usize];

/// Plain copy of a session for renderers and the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardSnapshot {
    /// Gem codes (0 = empty, 1..=6 = [`crate::types::GemKind::code`])
    pub gems: CodeGrid,
    /// Special codes ([`crate::types::SpecialKind::code`])
    pub specials: CodeGrid,
    /// FNV-1a over `gems` then `specials`
    pub board_hash: u64,
    pub phase: Phase,
    pub score: u32,
    pub moves_left: u32,
    pub episode_id: u32,
    pub seed: u32,
    pub turn_id: u32,
    pub cascade: u32,
    pub pending_swap: Option<(Pos, Pos)>,
    pub game_over: bool,
}

impl BoardSnapshot {
    pub fn clear(&mut self) {
        self.gems = [[0u8; GRID_COLS as usize]; GRID_ROWS as usize];
        self.specials = [[0u8; GRID_COLS as usize]; GRID_ROWS as usize];
        self.board_hash = 0;
        self.phase = Phase::Idle;
        self.score = 0;
        self.moves_left = 0;
        self.episode_id = 0;
        self.seed = 0;
        self.turn_id = 0;
        self.cascade = 0;
        self.pending_swap = None;
        self.game_over = false;
    }

    /// Accepting swap requests
    pub fn playable(&self) -> bool {
        !self.game_over && self.phase.accepts_input()
    }

    pub fn gem_code(&self, pos: Pos) -> u8 {
        if !pos.in_bounds() {
            return 0;
        }
        self.gems[pos.row as usize][pos.col as usize]
    }

    pub fn special_code(&self, pos: Pos) -> u8 {
        if !pos.in_bounds() {
            return 0;
        }
        self.specials[pos.row as usize][pos.col as usize]
    }
}

impl Default for BoardSnapshot {
    fn default() -> Self {
        Self {
            gems: [[0u8; GRID_COLS as usize]; GRID_ROWS as usize],
            specials: [[0u8; GRID_COLS as usize]; GRID_ROWS as usize],
            board_hash: 0,
            phase: Phase::Idle,
            score: 0,
            moves_left: 0,
            episode_id: 0,
            seed: 0,
            turn_id: 0,
            cascade: 0,
            pending_swap: None,
            game_over: false,
        }
    }
}

/// Stable 64-bit FNV-1a. `DefaultHasher` output may change between Rust releases,
/// and these hashes go over the wire.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a(u64);

impl Fnv1a {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    pub fn new() -> Self {
        Self(Self::OFFSET)
    }
}

impl Default for Fnv1a {
    fn default() -> Self {
        Self::new()
    }
}

impl std::hash::Hasher for Fnv1a {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }
}

/// FNV-1a hash of the cell contents; changes whenever any gem or special changes.
pub fn board_hash(gems: &CodeGrid, specials: &CodeGrid) -> u64 {
    use std::hash::Hasher;

    let mut h = Fnv1a::new();
    for row in gems.iter().chain(specials.iter()) {
        h.write(row);
    }
    h.finish()
}
