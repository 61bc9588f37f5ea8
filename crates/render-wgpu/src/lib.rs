//! wgpu render backend for the cube game.
//!
//! Draws a ground grid and instanced unit cubes from a
//! [`cubestack_render::DrawList`]: opaque cubes with depth writes, then
//! translucent ones (drop zone, particles) blended back to front.
//!
//! # Invariants
//! - Renderer never mutates scene state.
//! - Camera motion is not part of the deterministic simulation.
//! - Simulation tick rate is independent of render frame rate.

mod camera;
mod gpu;
mod shaders;

pub use camera::ChaseCamera;
pub use gpu::WgpuRenderer;
