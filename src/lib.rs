//! Gem Fusion (workspace facade crate).
//!
//! Re-exports the workspace crates under one `gem_fusion::{core,engine,input,term,adapter,types}`
//! path so the binary, integration tests and benches share a single import surface.

pub use gem_fusion_adapter as adapter;
pub use gem_fusion_core as core;
pub use gem_fusion_engine as engine;
pub use gem_fusion_input as input;
pub use gem_fusion_term as term;
pub use gem_fusion_types as types;
