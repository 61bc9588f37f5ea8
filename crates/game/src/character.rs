use crate::config::CharacterConfig;
use crate::GameError;
use cubestack_assets::{AssetStore, Material};
use cubestack_common::{EntityId, Transform};
use cubestack_ecs::{BoxCollider, ComponentStore, MaterialHandle, MeshHandle, Renderable};
use cubestack_kernel::Scene;
use glam::{Quat, Vec3};

/// The walking character: a root at the feet that carries the stack, and a
/// body child that is drawn and collides.
#[derive(Debug, Clone)]
pub struct Character {
    root: EntityId,
    body: EntityId,
    speed: f32,
    turn_lerp: f32,
}

impl Character {
    pub fn spawn(
        scene: &mut Scene,
        components: &mut ComponentStore,
        assets: &mut AssetStore,
        mesh: MeshHandle,
        config: &CharacterConfig,
    ) -> Result<Self, GameError> {
        let root = scene.spawn(Transform::from_position(config.start));
        components.set_name(root, "character");

        let body = scene.spawn_child(
            root,
            Transform::from_position(Vec3::new(0.0, config.body_size.y * 0.5, 0.0))
                .with_scale(config.body_size),
        )?;
        let material = assets.register_material(Material {
            name: "character".into(),
            base_color: config.color,
        });
        components.set_name(body, "characterBody");
        components.set_renderable(
            body,
            Renderable {
                mesh,
                material: MaterialHandle(material.0),
            },
        );
        components.set_collider(body, BoxCollider::default());

        Ok(Self {
            root,
            body,
            speed: config.speed,
            turn_lerp: config.turn_lerp,
        })
    }

    /// Entity the stack cubes are parented to.
    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Entity whose collider is tested against props.
    pub fn body(&self) -> EntityId {
        self.body
    }

    pub fn position(&self, scene: &Scene) -> Vec3 {
        scene
            .transform(self.root)
            .map(|t| t.position)
            .unwrap_or(Vec3::ZERO)
    }

    pub fn rotation(&self, scene: &Scene) -> Quat {
        scene
            .transform(self.root)
            .map(|t| t.rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    /// Walk along `intent` (XZ, unit or zero) for `dt` seconds and turn toward
    /// it. Returns the new feet position.
    pub fn advance(&self, scene: &mut Scene, intent: Vec3, dt: f32) -> Result<Vec3, GameError> {
        let mut t = scene
            .transform(self.root)
            .ok_or(GameError::MissingEntity(self.root))?;
        let direction = Vec3::new(intent.x, 0.0, intent.z).normalize_or_zero();
        if direction != Vec3::ZERO {
            t.position += direction * self.speed * dt;
            let facing = Quat::from_rotation_y(direction.x.atan2(direction.z));
            t.rotation = t.rotation.slerp(facing, self.turn_lerp);
            scene.set_transform(self.root, t);
        }
        Ok(t.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::entity_aabb;

    fn spawn() -> (Scene, ComponentStore, Character) {
        let mut scene = Scene::new();
        let mut components = ComponentStore::new();
        let mut assets = AssetStore::new();
        let mesh = MeshHandle(assets.register_default_cube().0);
        let character = Character::spawn(
            &mut scene,
            &mut components,
            &mut assets,
            mesh,
            &CharacterConfig::default(),
        )
        .unwrap();
        (scene, components, character)
    }

    #[test]
    fn body_stands_on_the_ground() {
        let (scene, components, character) = spawn();
        let aabb = entity_aabb(&scene, &components, character.body()).unwrap();
        assert!(aabb.min.y.abs() < 1e-5);
        assert!((aabb.max.y - 2.0).abs() < 1e-5);
    }

    #[test]
    fn walks_at_configured_speed() {
        let (mut scene, _, character) = spawn();
        let start = character.position(&scene);
        let end = character.advance(&mut scene, Vec3::NEG_Z, 0.5).unwrap();
        assert!((end - (start + Vec3::new(0.0, 0.0, -4.5))).length() < 1e-5);
    }

    #[test]
    fn idle_leaves_transform_untouched() {
        let (mut scene, _, character) = spawn();
        let before = scene.transform(character.root()).unwrap();
        character.advance(&mut scene, Vec3::ZERO, 1.0).unwrap();
        assert_eq!(scene.transform(character.root()).unwrap(), before);
    }

    #[test]
    fn turns_to_face_walking_direction() {
        let (mut scene, _, character) = spawn();
        for _ in 0..200 {
            character.advance(&mut scene, Vec3::X, 1.0 / 60.0).unwrap();
        }
        let forward = character.rotation(&scene) * Vec3::Z;
        assert!((forward - Vec3::X).length() < 1e-3);
    }
}
