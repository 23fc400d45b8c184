//! Terminal "game renderer" module.
//!
//! A small, game-oriented rendering layer for terminal gameplay. It avoids widget
//! toolkits and renders into a framebuffer that is diffed and flushed to the terminal.
//!
//! - `core` stays deterministic: the view only reads [`core::BoardSnapshot`]
//! - [`Animator`] owns every interpolation (swap slide, clear fade, fall, drop-in)
//! - Grid cells map to `cell_w x cell_h` terminal cells (4x2 by default)

pub mod animator;
pub mod fb;
pub mod game_view;
pub mod renderer;

pub use gem_fusion_core as core;
pub use gem_fusion_types as types;

pub use animator::{Animator, CellVisual, Popup};
pub use fb::{Cell, CellStyle, FrameBuffer, Rect, Rgb};
pub use game_view::{AdapterStatusView, AnchorY, Decor, GameView, Viewport};
pub use renderer::{encode_diff_into, encode_full_into, DrawStats, TerminalRenderer};
