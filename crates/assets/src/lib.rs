//! Asset registry: content-addressed meshes and materials, prefab models.
//!
//! Assets are identified by content-addressed hashes. The renderer consumes
//! assets by handle, never by raw file paths.
//!
//! # Layout
//! - `store`: mesh/material registry, persisted as JSON for inspection.
//! - `prefab`: multi-part box models (the house) built from local files or
//!   the built-in definition.

mod prefab;
mod store;

pub use prefab::{Prefab, PrefabPart};
pub use store::{Asset, AssetId, AssetStore, Material, Mesh};

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("asset not found: {0:?}")]
    NotFound(AssetId),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid prefab {name}: {reason}")]
    InvalidPrefab { name: String, reason: String },
}
