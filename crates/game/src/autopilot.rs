use crate::Game;
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Collecting,
    Delivering,
}

/// Scripted player for headless runs: gathers the nearest cubes until it
/// carries `capacity`, walks them to the drop zone and waits there until the
/// stack is empty.
#[derive(Debug, Clone)]
pub struct Autopilot {
    capacity: usize,
    mode: Mode,
}

impl Autopilot {
    /// A capacity of zero behaves like one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            mode: Mode::Collecting,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Walking intent for the next tick.
    pub fn steer(&mut self, game: &Game) -> Vec3 {
        let position = game.character_position();
        if self.mode == Mode::Collecting {
            let full = game.stack_len() >= self.capacity;
            let exhausted = game.collectibles_remaining() == 0;
            if full || (exhausted && game.stack_len() > 0) {
                tracing::debug!(carried = game.stack_len(), "autopilot heading to drop zone");
                self.mode = Mode::Delivering;
            }
        }

        match self.mode {
            Mode::Collecting => nearest_collectible(game, position)
                .map(|target| toward(position, target))
                .unwrap_or(Vec3::ZERO),
            Mode::Delivering => {
                if game.in_drop_zone() {
                    if game.stack_len() == 0 {
                        self.mode = Mode::Collecting;
                    }
                    Vec3::ZERO
                } else {
                    toward(position, game.drop_zone_center())
                }
            }
        }
    }
}

fn nearest_collectible(game: &Game, from: Vec3) -> Option<Vec3> {
    let scene = game.scene();
    game.collectibles()
        .into_iter()
        .filter_map(|id| scene.world_position(id))
        .min_by(|a, b| {
            flat_distance(from, *a)
                .partial_cmp(&flat_distance(from, *b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    Vec3::new(b.x - a.x, 0.0, b.z - a.z).length()
}

/// Unit XZ direction from `from` to `to`, zero when already there.
fn toward(from: Vec3, to: Vec3) -> Vec3 {
    Vec3::new(to.x - from.x, 0.0, to.z - from.z).normalize_or_zero()
}
