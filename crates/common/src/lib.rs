//! Shared types used by every cubestack crate.
//!
//! # Invariants
//! - Types here carry no game rules; they are plain data plus math helpers.
//! - `splitmix64` output depends only on its input.

mod bounds;
mod rng;
mod types;

pub use bounds::Aabb;
pub use rng::splitmix64;
pub use types::{EntityId, Transform};
