//! Input mapping: held directions and discrete actions.
//!
//! # Invariants
//! - Gameplay consumes actions and move intents, never raw key events.
//! - The move intent is either zero or unit length on the XZ plane.

pub mod action;
mod state;

pub use action::Action;
pub use state::{Direction, InputState};
