//! Scene props: the collectible cube field, the drop zone, the house and the
//! celebration that plays when the house is nearly built.

use crate::broadphase::GridPartition;
use crate::config::{DropZoneConfig, GameConfig, GridConfig, HouseConfig, ParticleConfig};
use crate::particles::ParticleBurst;
use crate::popup::Popup;
use crate::GameError;
use cubestack_assets::{AssetStore, Material, Prefab};
use cubestack_common::{Aabb, EntityId, Transform};
use cubestack_ecs::{BoxCollider, ComponentStore, MaterialHandle, MeshHandle, Renderable};
use cubestack_kernel::Scene;
use glam::{EulerRot, Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::BTreeMap;

/// Half extent that encloses a unit cube at any rotation.
const SPIN_HALF_EXTENT: f32 = 0.866_025_4;

#[derive(Debug, Clone, Copy)]
struct Collectible {
    /// Creation order, used to break ties deterministically.
    index: usize,
    /// Euler XYZ angles accumulated by the spin.
    spin: Vec3,
}

/// The house model root and its uniform scale.
#[derive(Debug, Clone, Copy)]
pub struct House {
    pub root: EntityId,
    pub scale: f32,
}

#[derive(Debug)]
pub struct PropManager {
    collectibles: BTreeMap<EntityId, Collectible>,
    next_index: usize,
    broadphase: GridPartition,
    drop_zone: Option<EntityId>,
    house: Option<House>,
    house_target: f32,
    celebrated: bool,
    particles: Option<ParticleBurst>,
    popup: Popup,
    rng: Xoshiro256PlusPlus,
    mesh: MeshHandle,
    grid: GridConfig,
    drop_zone_config: DropZoneConfig,
    house_config: HouseConfig,
    particle_config: ParticleConfig,
}

impl PropManager {
    pub fn new(config: &GameConfig, mesh: MeshHandle) -> Self {
        Self {
            collectibles: BTreeMap::new(),
            next_index: 0,
            broadphase: GridPartition::new(config.grid.spacing),
            drop_zone: None,
            house: None,
            house_target: 0.0,
            celebrated: false,
            particles: None,
            popup: Popup::new(&config.popup),
            rng: Xoshiro256PlusPlus::seed_from_u64(config.seed),
            mesh,
            grid: config.grid.clone(),
            drop_zone_config: config.drop_zone.clone(),
            house_config: config.house.clone(),
            particle_config: config.particles.clone(),
        }
    }

    /// Lay out `rows` x `columns` unit cubes on the ground, each with its own
    /// random color. Returns the new ids in row-major order.
    #[allow(clippy::too_many_arguments)]
    pub fn create_cubes_in_grid(
        &mut self,
        scene: &mut Scene,
        components: &mut ComponentStore,
        assets: &mut AssetStore,
        rows: u32,
        columns: u32,
        start_x: f32,
        start_z: f32,
        spacing: f32,
    ) -> Vec<EntityId> {
        let mut ids = Vec::with_capacity((rows * columns) as usize);
        for i in 0..rows {
            for j in 0..columns {
                let position = Vec3::new(
                    start_x + j as f32 * spacing,
                    0.5,
                    start_z + i as f32 * spacing,
                );
                let rgb: [f32; 3] = self.rng.random();
                let material = assets.register_material(Material::opaque(
                    format!("collectible_{i}_{j}"),
                    rgb,
                ));

                let id = scene.spawn(Transform::from_position(position));
                components.set_name(id, "collectible");
                components.set_renderable(
                    id,
                    Renderable {
                        mesh: self.mesh,
                        material: MaterialHandle(material.0),
                    },
                );
                components.set_collider(id, BoxCollider::default());
                self.broadphase.insert(
                    id,
                    Aabb::from_center_half_extents(position, Vec3::splat(SPIN_HALF_EXTENT)),
                );
                self.collectibles.insert(
                    id,
                    Collectible {
                        index: self.next_index,
                        spin: Vec3::ZERO,
                    },
                );
                self.next_index += 1;
                ids.push(id);
            }
        }
        tracing::debug!(count = ids.len(), "collectible grid created");
        ids
    }

    /// Translucent pad where carried cubes are delivered.
    pub fn create_drop_zone(
        &mut self,
        scene: &mut Scene,
        components: &mut ComponentStore,
        assets: &mut AssetStore,
    ) -> EntityId {
        let c = &self.drop_zone_config;
        let material = assets.register_material(Material {
            name: "dropZone".into(),
            base_color: c.color,
        });
        let id = scene.spawn(Transform::from_position(c.center).with_scale(c.size));
        components.set_name(id, "dropZone");
        components.set_renderable(
            id,
            Renderable {
                mesh: self.mesh,
                material: MaterialHandle(material.0),
            },
        );
        components.set_collider(id, BoxCollider::default());
        self.drop_zone = Some(id);
        id
    }

    /// Instantiate the house prefab at zero scale. A configured prefab file
    /// that fails to load falls back to the built-in house.
    pub fn load_house_model(
        &mut self,
        scene: &mut Scene,
        components: &mut ComponentStore,
        assets: &mut AssetStore,
    ) -> Result<EntityId, GameError> {
        let prefab = match &self.house_config.prefab {
            Some(path) => Prefab::load_json(path).unwrap_or_else(|err| {
                tracing::warn!(
                    "failed to load house prefab {}: {err}; using the built-in house",
                    path.display()
                );
                Prefab::house()
            }),
            None => Prefab::house(),
        };

        let root = scene.spawn(
            Transform::from_position(self.house_config.position)
                .with_rotation(Quat::from_rotation_y(self.house_config.rotation_y))
                .with_scale(Vec3::ZERO),
        );
        components.set_name(root, "house");
        for part in &prefab.parts {
            let material = assets.register_material(Material {
                name: format!("{}:{}", prefab.name, part.name),
                base_color: part.color,
            });
            let child =
                scene.spawn_child(root, Transform::from_position(part.offset).with_scale(part.size))?;
            components.set_name(child, format!("house:{}", part.name));
            components.set_renderable(
                child,
                Renderable {
                    mesh: self.mesh,
                    material: MaterialHandle(material.0),
                },
            );
        }
        tracing::debug!(prefab = %prefab.name, parts = prefab.parts.len(), "house loaded");
        self.house = Some(House { root, scale: 0.0 });
        Ok(root)
    }

    /// Spin every remaining collectible by the configured angle on all axes.
    pub fn update_cubes_rotation(&mut self, scene: &mut Scene) {
        let step = self.grid.spin_per_tick;
        for (&id, collectible) in self.collectibles.iter_mut() {
            collectible.spin += Vec3::splat(step);
            let Some(mut t) = scene.transform(id) else {
                continue;
            };
            let a = collectible.spin;
            t.rotation = Quat::from_euler(EulerRot::XYZ, a.x, a.y, a.z);
            scene.set_transform(id, t);
        }
    }

    pub fn set_house_target(&mut self, target: f32) {
        self.house_target = target;
    }

    pub fn house_target(&self) -> f32 {
        self.house_target
    }

    pub fn house(&self) -> Option<House> {
        self.house
    }

    pub fn house_scale(&self) -> f32 {
        self.house.map(|h| h.scale).unwrap_or(0.0)
    }

    /// Grow the house toward its target. Returns true on the one tick the
    /// scale first reaches the celebration threshold.
    pub fn update_house_scale(&mut self, scene: &mut Scene, dt: f32) -> bool {
        let Some(house) = self.house.as_mut() else {
            return false;
        };
        if house.scale >= self.house_target {
            return false;
        }
        let c = &self.house_config;
        let mut scale = house.scale + (self.house_target - house.scale) * (dt * c.growth_rate);
        if self.house_target - scale <= c.snap_epsilon {
            scale = self.house_target;
        }
        house.scale = scale;
        if let Some(mut t) = scene.transform(house.root) {
            t.scale = Vec3::splat(scale);
            scene.set_transform(house.root, t);
        }

        if scale >= c.celebrate_at && !self.celebrated {
            self.celebrated = true;
            tracing::info!(scale, "house nearly built, celebrating");
            return true;
        }
        false
    }

    pub fn has_celebrated(&self) -> bool {
        self.celebrated
    }

    /// Start a particle burst around the house, replacing any running one.
    pub fn play_particle_effect(&mut self) {
        let origin = self.house_config.position;
        self.particles = Some(ParticleBurst::spawn(
            origin,
            &self.particle_config,
            &mut self.rng,
        ));
    }

    pub fn show_popup(&mut self) {
        self.popup.schedule();
    }

    /// Advance the particle burst and the popup delay. Returns true on the
    /// tick the popup appears.
    pub fn advance_effects(&mut self, dt: f32) -> bool {
        if let Some(burst) = self.particles.as_mut() {
            if !burst.advance(dt) {
                self.particles = None;
            }
        }
        self.popup.advance(dt)
    }

    pub fn particles(&self) -> Option<&ParticleBurst> {
        self.particles.as_ref()
    }

    pub fn popup(&self) -> &Popup {
        &self.popup
    }

    pub fn dismiss_popup(&mut self) {
        self.popup.dismiss();
    }

    pub fn drop_zone(&self) -> Option<EntityId> {
        self.drop_zone
    }

    pub fn drop_zone_center(&self) -> Vec3 {
        self.drop_zone_config.center
    }

    /// Forget a collectible that has been picked up.
    pub fn remove_collectible(&mut self, id: EntityId) -> bool {
        self.broadphase.remove(id);
        self.collectibles.remove(&id).is_some()
    }

    pub fn collectible_count(&self) -> usize {
        self.collectibles.len()
    }

    /// Remaining collectibles in creation order.
    pub fn collectibles(&self) -> Vec<EntityId> {
        self.ordered(self.collectibles.keys().copied())
    }

    /// Collectibles whose cells overlap `aabb`, in creation order.
    pub fn candidates(&self, aabb: &Aabb) -> Vec<EntityId> {
        self.ordered(self.broadphase.query(aabb).into_iter())
    }

    fn ordered(&self, ids: impl Iterator<Item = EntityId>) -> Vec<EntityId> {
        let mut hits: Vec<(usize, EntityId)> = ids
            .filter_map(|id| self.collectibles.get(&id).map(|c| (c.index, id)))
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|(_, id)| id).collect()
    }
}
