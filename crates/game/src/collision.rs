use cubestack_common::{Aabb, EntityId};
use cubestack_ecs::ComponentStore;
use cubestack_kernel::Scene;

/// World-space bounds of an entity's collider, or `None` if it has no
/// collider or is not in the scene.
pub fn entity_aabb(scene: &Scene, components: &ComponentStore, id: EntityId) -> Option<Aabb> {
    let collider = components.get_collider(id)?;
    let world = scene.world_matrix(id)?;
    Some(collider.world_aabb(&world))
}

/// Bounding-box intersection test between two entities.
pub fn check_collision(
    scene: &Scene,
    components: &ComponentStore,
    a: EntityId,
    b: EntityId,
) -> bool {
    match (
        entity_aabb(scene, components, a),
        entity_aabb(scene, components, b),
    ) {
        (Some(a), Some(b)) => a.intersects(&b),
        _ => false,
    }
}
