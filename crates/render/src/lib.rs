//! Rendering adapter: renderer-agnostic frame description.
//!
//! # Invariants
//! - Renderers never mutate the scene.
//! - A frame is derived from scene state, components, assets and a view.
//!
//! A [`DrawList`] flattens the scene into colored, transformed unit cubes,
//! split into opaque and blended passes. GPU backends consume the draw list;
//! the [`DebugTextRenderer`] dumps the scene for logs and tests.

mod draw;
mod renderer;

pub use draw::{DrawItem, DrawList};
pub use renderer::{DebugTextRenderer, RenderView, Renderer};
