//! Board Engine - pure, deterministic, and testable
//!
//! This crate contains all the game rules, state management, and simulation logic.
//! It has **zero dependencies** on UI, networking, or I/O, making it:
//!
//! - **Deterministic**: Same seed produces identical sessions (for AI training)
//! - **Testable**: Unit tests for every rule
//! - **Portable**: Can run in any environment (terminal, headless, bots)
//! - **Fast**: Fixed-capacity collections, no heap allocation while resolving
//!
//! # Module Structure
//!
//! - [`grid`]: 8x8 gem grid with gravity and refill
//! - [`matcher`]: maximal-run detection along rows and columns
//! - [`scoring`]: points, special-gem upgrades and detonations
//! - [`board_state`]: session state machine (swap, resolve, fall, refill, cascade)
//! - [`rng`]: seeded gem generation
//! - [`snapshot`]: plain copies for renderers and the adapter
//!
//! # Game Rules
//!
//! - **Swap**: two orthogonally adjacent gems; costs one move
//! - **Match**: 3+ gems of one kind in a row or column; a swap with no match is undone
//! - **Score**: 10 per distinct matched cell, +20 per gem beyond the third
//! - **Specials**: 4 in a line makes a line-clear gem, 5+ a color bomb, crossing runs
//!   an area bomb; cleared specials detonate
//! - **Cascade**: refilled gems that line up resolve before the board is idle again
//! - **Game over**: when the move budget is spent and the board has settled
//!
//! # Example
//!
//! ```
//! use gem_fusion_core::BoardState;
//! use gem_fusion_core::types::{Phase, Pos};
//!
//! let mut board = BoardState::new(12345);
//! assert!(board.find_matches().is_empty());
//!
//! board.request_swap(Pos::new(3, 3), Pos::new(3, 4)).unwrap();
//! assert_eq!(board.phase(), Phase::AnimatingSwap);
//!
//! board.settle();
//! assert!(matches!(board.phase(), Phase::Idle | Phase::GameOver));
//! assert!(board.grid().is_full());
//! ```
//!
//! # Timing
//!
//! Each busy phase lasts a settle duration (see [`RuleSet`]). Call
//! [`BoardState::tick`](board_state::BoardState::tick) every frame with elapsed time,
//! or [`BoardState::settle`](board_state::BoardState::settle) to resolve instantly.

pub mod board_state;
pub mod grid;
pub mod matcher;
pub mod rng;
pub mod scoring;
pub mod snapshot;

pub use gem_fusion_types as types;

// Re-export commonly used types for convenience
pub use board_state::{BoardState, EventQueue, RuleSet, SwapError};
pub use grid::{Grid, GridParseError};
pub use matcher::{creates_match_at, find_matches, matched_mask, Match, MatchList};
pub use rng::{GemSource, SimpleRng};
pub use scoring::{plan_resolution, score_matches, ResolvePlan, ScoreResult, Upgrade};
pub use snapshot::{board_hash, BoardSnapshot, CodeGrid, Fnv1a};
