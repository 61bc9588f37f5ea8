use cubestack_common::EntityId;
use cubestack_ecs::ComponentStore;
use cubestack_kernel::Scene;
use glam::{EulerRot, Vec3};
use std::collections::BTreeMap;
use std::fmt;

/// Read-only queries against the scene for debugging and the dev UI.
pub struct SceneInspector;

impl SceneInspector {
    pub fn summary(scene: &Scene, components: &ComponentStore) -> SceneSummary {
        let mut by_name: BTreeMap<String, usize> = BTreeMap::new();
        for name in components.names().values() {
            *by_name.entry(name.0.clone()).or_default() += 1;
        }
        SceneSummary {
            tick: scene.tick(),
            seed: scene.seed(),
            entity_count: scene.entity_count(),
            pending_events: scene.events().len(),
            renderables: components.renderables().len(),
            by_name,
            layout_hash: scene.layout_hash(),
        }
    }

    pub fn inspect_entity(
        scene: &Scene,
        components: &ComponentStore,
        id: EntityId,
    ) -> Option<EntityInfo> {
        let data = scene.get(id)?;
        let t = data.transform;
        Some(EntityInfo {
            id,
            name: components.get_name(id).map(|n| n.0.clone()),
            parent: data.parent,
            children: scene.children(id).len(),
            local_position: t.position,
            world_position: scene.world_position(id).unwrap_or(t.position),
            euler_degrees: {
                let (x, y, z) = t.rotation.to_euler(EulerRot::XYZ);
                Vec3::new(x, y, z) * (180.0 / std::f32::consts::PI)
            },
            scale: t.scale,
            has_collider: components.get_collider(id).is_some(),
        })
    }

    /// Every entity id in stable order.
    pub fn list_entities(scene: &Scene) -> Vec<EntityId> {
        scene.entities().keys().copied().collect()
    }

    /// Entities without a parent, in stable order.
    pub fn roots(scene: &Scene) -> Vec<EntityId> {
        scene
            .entities()
            .iter()
            .filter(|(_, data)| data.parent.is_none())
            .map(|(id, _)| *id)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SceneSummary {
    pub tick: u64,
    pub seed: u64,
    pub entity_count: usize,
    pub pending_events: usize,
    pub renderables: usize,
    /// Entity count per `Name`.
    pub by_name: BTreeMap<String, usize>,
    pub layout_hash: u64,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scene: tick={} seed={} entities={} renderables={} pending_events={} layout={:016x}",
            self.tick,
            self.seed,
            self.entity_count,
            self.renderables,
            self.pending_events,
            self.layout_hash
        )?;
        for (name, count) in &self.by_name {
            write!(f, "\n  {name}: {count}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub id: EntityId,
    pub name: Option<String>,
    pub parent: Option<EntityId>,
    pub children: usize,
    pub local_position: Vec3,
    pub world_position: Vec3,
    pub euler_degrees: Vec3,
    pub scale: Vec3,
    pub has_collider: bool,
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.world_position;
        let s = self.scale;
        write!(
            f,
            "[{}] {} pos=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2})",
            self.id.short(),
            self.name.as_deref().unwrap_or("<unnamed>"),
            p.x,
            p.y,
            p.z,
            s.x,
            s.y,
            s.z,
        )?;
        if let Some(parent) = self.parent {
            write!(f, " parent={}", parent.short())?;
        }
        if self.children > 0 {
            write!(f, " children={}", self.children)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubestack_common::Transform;
    use cubestack_ecs::BoxCollider;

    #[test]
    fn summary_empty_scene() {
        let summary = SceneInspector::summary(&Scene::new(), &ComponentStore::new());
        assert_eq!(summary.tick, 0);
        assert_eq!(summary.entity_count, 0);
        assert!(summary.by_name.is_empty());
    }

    #[test]
    fn summary_counts_names_and_events() {
        let mut scene = Scene::new();
        let mut components = ComponentStore::new();
        for _ in 0..3 {
            let id = scene.spawn(Transform::default());
            components.set_name(id, "collectible");
        }
        let zone = scene.spawn(Transform::default());
        components.set_name(zone, "dropZone");
        scene.step();

        let summary = SceneInspector::summary(&scene, &components);
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.entity_count, 4);
        assert_eq!(summary.pending_events, 5);
        assert_eq!(summary.by_name["collectible"], 3);
        assert_eq!(summary.by_name["dropZone"], 1);
        let text = summary.to_string();
        assert!(text.contains("tick=1"));
        assert!(text.contains("collectible: 3"));
    }

    #[test]
    fn inspect_child_reports_world_position() {
        let mut scene = Scene::new();
        let mut components = ComponentStore::new();
        let root = scene.spawn(Transform::from_position(Vec3::new(0.0, 0.0, 24.0)));
        let cube = scene
            .spawn_child(root, Transform::from_position(Vec3::new(0.0, 1.5, -0.6)))
            .unwrap();
        components.set_name(cube, "stackCube");
        components.set_collider(cube, BoxCollider::default());

        let info = SceneInspector::inspect_entity(&scene, &components, cube).unwrap();
        assert_eq!(info.name.as_deref(), Some("stackCube"));
        assert_eq!(info.parent, Some(root));
        assert!((info.world_position - Vec3::new(0.0, 1.5, 23.4)).length() < 1e-5);
        assert!(info.has_collider);
        assert!(info.to_string().contains("stackCube"));

        let root_info = SceneInspector::inspect_entity(&scene, &components, root).unwrap();
        assert_eq!(root_info.children, 1);
        assert!(root_info.to_string().contains("<unnamed>"));
    }

    #[test]
    fn inspect_entity_not_found() {
        let scene = Scene::new();
        let components = ComponentStore::new();
        assert!(SceneInspector::inspect_entity(&scene, &components, EntityId::new()).is_none());
    }

    #[test]
    fn list_entities_and_roots() {
        let mut scene = Scene::new();
        let a = scene.spawn(Transform::default());
        let b = scene.spawn_child(a, Transform::default()).unwrap();

        let ids = SceneInspector::list_entities(&scene);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a) && ids.contains(&b));
        assert_eq!(SceneInspector::roots(&scene), vec![a]);
    }
}
