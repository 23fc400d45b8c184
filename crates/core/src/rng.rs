//! RNG module - deterministic gem generation
//!
//! A small LCG drives every random draw so that a seed fully determines a session
//! (initial grid and every refill). [`GemSource`] wraps it with the palette rules used
//! by initialization (exclusions) and refill (unconstrained).

use crate::types::{GemKind, GEM_KIND_COUNT};

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    ///
    /// Uses multiply-shift reduction so the result depends on the high bits; the low
    /// bits of a power-of-two LCG cycle with a short period.
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        ((self.next_u32() as u64 * max as u64) >> 32) as u32
    }

    /// Current internal state (restarting from it continues the sequence)
    pub fn state(&self) -> u32 {
        self.state
    }
}

/// Draws gem kinds for a session
#[derive(Debug, Clone)]
pub struct GemSource {
    rng: SimpleRng,
}

impl GemSource {
    pub fn new(seed: u32) -> Self {
        Self {
            rng: SimpleRng::new(seed),
        }
    }

    /// Any kind from the full palette
    pub fn any(&mut self) -> GemKind {
        let i = self.rng.next_range(GEM_KIND_COUNT as u32) as usize;
        GemKind::ALL[i]
    }

    /// A kind not listed in `excluded`, falling back to [`GemSource::any`] when every
    /// kind is excluded.
    pub fn any_except(&mut self, excluded: &[GemKind]) -> GemKind {
        let mut available = [GemKind::Ruby; GEM_KIND_COUNT];
        let mut n = 0usize;
        for kind in GemKind::ALL {
            if !excluded.contains(&kind) {
                available[n] = kind;
                n += 1;
            }
        }

        if n == 0 {
            return self.any();
        }

        let i = self.rng.next_range(n as u32) as usize;
        available[i]
    }

    /// RNG state, used as the seed of the next episode on restart
    pub fn seed(&self) -> u32 {
        self.rng.state()
    }
}

impl Default for GemSource {
    fn default() -> Self {
        Self::new(1)
    }
}
