//! Terminal input module (engine-facing).
//!
//! Independent of any UI framework. It maps `crossterm` key events into
//! [`crate::types::PlayerAction`] and keeps the cursor/selection model that turns two
//! selections into a swap request. The board engine never sees keys or the cursor.

pub mod cursor;
pub mod map;

pub use gem_fusion_types as types;

pub use cursor::{Cursor, CursorOutcome};
pub use map::{handle_key_event, should_quit};
