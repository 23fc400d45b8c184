//! Move analysis on top of the board engine: which swaps are legal and which one a
//! hint should suggest.

pub mod hint;

pub use gem_fusion_core as core;
pub use gem_fusion_types as types;

pub use hint::{
    apply_best_swap, best_swap, has_legal_swap, legal_swaps, PlayError, SwapList,
};
