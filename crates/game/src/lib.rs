//! Gameplay for the cube collection game.
//!
//! The character walks over a field of spinning cubes, stacks the ones it
//! touches on its back and unloads them in the drop zone for points. Past the
//! score threshold the house grows, and when it is nearly complete a particle
//! burst plays and a popup announces the finished house.
//!
//! # Layout
//! - `stack`: carried cubes, their follow/lean animation and the drop timer.
//! - `props`: collectible grid, drop zone, house and its growth.
//! - `score`: the counter and its threshold event.
//! - `game`: the fixed-step orchestrator tying them to the scene.
//!
//! Everything advances on a fixed tick so identical seeds and inputs give
//! identical scenes.

pub mod autopilot;
pub mod broadphase;
pub mod character;
pub mod collision;
pub mod config;
mod game;
pub mod particles;
pub mod popup;
pub mod props;
pub mod score;
pub mod stack;

pub use autopilot::Autopilot;
pub use config::{ConfigError, GameConfig};
pub use game::{Game, GameEvent, Journal, TickReport};
pub use score::{ScoreEvent, Scoreboard};

use cubestack_assets::AssetError;
use cubestack_common::EntityId;
use cubestack_kernel::SceneError;

/// Errors raised while building or advancing a game.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("scene: {0}")]
    Scene(#[from] SceneError),
    #[error("asset: {0}")]
    Asset(#[from] AssetError),
    #[error("entity {0:?} disappeared from the scene")]
    MissingEntity(EntityId),
}
