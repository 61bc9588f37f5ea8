//! Developer tooling: a read-only scene inspector shared by the desktop
//! inspector panel and the CLI.
//!
//! # Invariants
//! - Tools never mutate the scene or its components.

mod inspector;

pub use inspector::{EntityInfo, SceneInspector, SceneSummary};
