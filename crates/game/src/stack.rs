//! The stack of cubes carried on the character's back.
//!
//! Collected cubes become children of the character root. While walking they
//! trail and lean against the motion, each cube following the one below it;
//! standing still they settle into a straight column. Inside the drop zone a
//! repeating timer pops the top cube until the stack is empty or the
//! character walks out.

use crate::config::StackConfig;
use crate::GameError;
use cubestack_common::{EntityId, Transform};
use cubestack_ecs::ComponentStore;
use cubestack_kernel::Scene;
use glam::{EulerRot, Quat, Vec3};

#[derive(Debug, Clone)]
pub struct CubeStack {
    cubes: Vec<EntityId>,
    velocity: Vec3,
    last_position: Vec3,
    is_dropping: bool,
    in_drop_zone: bool,
    /// Seconds accumulated toward the next drop.
    drop_timer: f32,
    config: StackConfig,
}

impl CubeStack {
    /// `start` is the character position, so the first velocity is zero.
    pub fn new(config: StackConfig, start: Vec3) -> Self {
        Self {
            cubes: Vec::new(),
            velocity: Vec3::ZERO,
            last_position: start,
            is_dropping: false,
            in_drop_zone: false,
            drop_timer: 0.0,
            config,
        }
    }

    /// Carried cubes, bottom first.
    pub fn cubes(&self) -> &[EntityId] {
        &self.cubes
    }

    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn is_dropping(&self) -> bool {
        self.is_dropping
    }

    pub fn in_drop_zone(&self) -> bool {
        self.in_drop_zone
    }

    fn drop_interval(&self) -> f32 {
        self.config.drop_interval_ms as f32 / 1000.0
    }

    /// Move `collectible` from the field onto the top of the stack. The new
    /// stack cube keeps the collectible's look and spin angle at half size.
    pub fn collect(
        &mut self,
        scene: &mut Scene,
        components: &mut ComponentStore,
        character: EntityId,
        collectible: EntityId,
    ) -> Result<EntityId, GameError> {
        let source = scene
            .transform(collectible)
            .ok_or(GameError::MissingEntity(collectible))?;
        let renderable = components.get_renderable(collectible).copied();
        scene.despawn(collectible);
        components.remove_entity(collectible);

        let height =
            self.config.collect_height + self.cubes.len() as f32 * self.config.collect_spacing;
        let local = Transform::from_position(Vec3::new(0.0, height, self.config.back_offset))
            .with_rotation(source.rotation)
            .with_scale(Vec3::splat(self.config.cube_scale));
        let cube = scene.spawn_child(character, local)?;
        components.set_name(cube, "stackCube");
        if let Some(renderable) = renderable {
            components.set_renderable(cube, renderable);
        }
        self.cubes.push(cube);
        tracing::debug!(cube = %cube.short(), stack = self.cubes.len(), "cube collected");
        Ok(cube)
    }

    /// Record the character's displacement since the previous tick.
    pub fn update_velocity(&mut self, position: Vec3) {
        self.velocity = position - self.last_position;
        self.last_position = position;
    }

    /// Ease every cube toward its column slot (idle) or its trailing, leaning
    /// pose (moving).
    pub fn update(
        &self,
        scene: &mut Scene,
        character_rotation: Quat,
        is_idle: bool,
    ) -> Result<(), GameError> {
        let c = &self.config;
        let local_velocity = character_rotation.inverse() * self.velocity;
        let reference_yaw = if !is_idle && !self.cubes.is_empty() {
            local_velocity.x.atan2(c.stack_spacing) * 0.5
        } else {
            0.0
        };

        let mut below: Option<Vec3> = None;
        for (i, &cube) in self.cubes.iter().enumerate() {
            let mut t = scene
                .transform(cube)
                .ok_or(GameError::MissingEntity(cube))?;
            let fi = i as f32;
            let height = c.base_height + fi * c.stack_spacing;

            let (target, rot_x, rot_y) = if is_idle {
                (Vec3::new(0.0, height, c.back_offset), 0.0, 0.0)
            } else {
                let lean = 1.0 + fi * c.lean_increment;
                let rot_x = ((-local_velocity.z).atan2(c.stack_spacing) * 0.5 * lean)
                    .clamp(-c.max_lean_angle, c.max_lean_angle);
                let rot_y = reference_yaw * (1.0 - (fi * c.rotation_delay_factor).min(1.0));
                let trail = local_velocity * c.follow_distance * lean;
                let target = match below {
                    None => Vec3::new(0.0, c.base_height, c.back_offset),
                    Some(prev) => Vec3::new(prev.x - trail.x, height, prev.z - trail.z),
                };
                (target, rot_x, rot_y)
            };

            t.position.x += (target.x - t.position.x) * c.lerp_factor;
            t.position.z += (target.z - t.position.z) * c.lerp_factor;
            t.position.y = target.y;
            let goal = Quat::from_euler(EulerRot::XYZ, rot_x, rot_y, 0.0);
            t.rotation = t.rotation.slerp(goal, c.lerp_factor);
            scene.set_transform(cube, t);
            below = Some(t.position);
        }
        Ok(())
    }

    /// Begin unloading. No-op while already dropping or with nothing to drop.
    pub fn start_dropping(&mut self) {
        if self.is_dropping || self.cubes.is_empty() {
            return;
        }
        self.is_dropping = true;
        self.drop_timer = 0.0;
        tracing::debug!(stack = self.cubes.len(), "drop started");
    }

    pub fn stop_dropping(&mut self) {
        if self.is_dropping {
            tracing::debug!(stack = self.cubes.len(), "drop stopped");
        }
        self.is_dropping = false;
        self.drop_timer = 0.0;
    }

    /// Entering the zone starts dropping; leaving it stops.
    pub fn update_drop_zone_status(&mut self, in_zone: bool) {
        self.in_drop_zone = in_zone;
        if in_zone && !self.is_dropping {
            self.start_dropping();
        } else if !in_zone && self.is_dropping {
            self.stop_dropping();
        }
    }

    /// Run the drop timer for `dt` seconds, removing one cube per elapsed
    /// interval. Returns how many cubes were delivered.
    pub fn advance_drops(
        &mut self,
        scene: &mut Scene,
        components: &mut ComponentStore,
        dt: f32,
    ) -> u32 {
        if !self.is_dropping {
            return 0;
        }
        let interval = self.drop_interval();
        let mut dropped = 0;
        self.drop_timer += dt;
        while self.is_dropping && self.drop_timer >= interval {
            self.drop_timer -= interval;
            if !self.in_drop_zone {
                self.stop_dropping();
                break;
            }
            let Some(cube) = self.cubes.pop() else {
                self.stop_dropping();
                break;
            };
            scene.despawn(cube);
            components.remove_entity(cube);
            dropped += 1;
        }
        dropped
    }

    /// Remove every carried cube from the scene and reset motion state.
    pub fn clear(&mut self, scene: &mut Scene, components: &mut ComponentStore, start: Vec3) {
        for cube in self.cubes.drain(..) {
            scene.despawn(cube);
            components.remove_entity(cube);
        }
        self.velocity = Vec3::ZERO;
        self.last_position = start;
        self.is_dropping = false;
        self.in_drop_zone = false;
        self.drop_timer = 0.0;
    }
}
