//! Scene Kernel: authoritative scene graph, simulation ticking, deterministic replay hooks.
//!
//! # Invariants
//! - All state mutations flow through explicit operations and are logged.
//! - Parent links never form a cycle.
//! - Replaying the event log reproduces the same `state_hash`.

pub mod scene;

pub use scene::{EntityData, Scene, SceneError, SceneEvent};
