use cubestack_common::{EntityId, Transform, splitmix64};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event record produced by every mutation to the scene.
///
/// The event log is the foundation for replay and determinism checks.
/// Each event captures enough information to reconstruct or reverse the mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SceneEvent {
    /// Entity was spawned under `parent` (or at the root) with the given local transform.
    Spawned {
        id: EntityId,
        parent: Option<EntityId>,
        transform: Transform,
    },
    /// Entity was despawned. Carries the data it had so the removal can be reversed.
    Despawned {
        id: EntityId,
        parent: Option<EntityId>,
        transform: Transform,
    },
    /// Entity local transform was updated.
    TransformUpdated {
        id: EntityId,
        old: Transform,
        new: Transform,
    },
    /// Entity was attached to a different parent.
    Reparented {
        id: EntityId,
        old: Option<EntityId>,
        new: Option<EntityId>,
    },
    /// Simulation advanced one tick with the given seed.
    Stepped { tick: u64, seed: u64 },
}

/// Errors from scene graph operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("entity {0:?} not found")]
    EntityNotFound(EntityId),
    #[error("entity {0:?} already exists")]
    DuplicateEntity(EntityId),
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    ParentCycle { child: EntityId, parent: EntityId },
}

/// Per-entity data stored in the scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityData {
    /// Transform relative to `parent`, or to the world when `parent` is `None`.
    pub transform: Transform,
    pub parent: Option<EntityId>,
}

/// The authoritative scene graph.
///
/// Every prop, the character, and each carried cube lives here. Renderers and
/// gameplay code read from it; all writes go through the methods below so the
/// event log stays complete.
///
/// Uses BTreeMap for deterministic iteration order across all platforms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    entities: BTreeMap<EntityId, EntityData>,
    tick: u64,
    /// Seed for deterministic replay. Advanced each step.
    seed: u64,
    /// Append-only event log of all mutations.
    #[serde(skip)]
    event_log: Vec<SceneEvent>,
}

impl Scene {
    /// Create an empty scene at tick 0 with seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scene with a specific seed for deterministic replay.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[SceneEvent] {
        &self.event_log
    }

    /// Read-only access to all entities (BTreeMap for deterministic iteration).
    pub fn entities(&self) -> &BTreeMap<EntityId, EntityData> {
        &self.entities
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Spawn a root entity with the given transform. Returns its id.
    pub fn spawn(&mut self, transform: Transform) -> EntityId {
        let id = EntityId::new();
        self.insert(id, None, transform);
        id
    }

    /// Spawn an entity whose transform is relative to `parent`.
    pub fn spawn_child(
        &mut self,
        parent: EntityId,
        transform: Transform,
    ) -> Result<EntityId, SceneError> {
        if !self.entities.contains_key(&parent) {
            return Err(SceneError::EntityNotFound(parent));
        }
        let id = EntityId::new();
        self.insert(id, Some(parent), transform);
        Ok(id)
    }

    /// Spawn an entity with a caller-chosen id.
    pub fn spawn_with_id(
        &mut self,
        id: EntityId,
        parent: Option<EntityId>,
        transform: Transform,
    ) -> Result<(), SceneError> {
        if self.entities.contains_key(&id) {
            return Err(SceneError::DuplicateEntity(id));
        }
        if let Some(p) = parent {
            if !self.entities.contains_key(&p) {
                return Err(SceneError::EntityNotFound(p));
            }
        }
        self.insert(id, parent, transform);
        Ok(())
    }

    fn insert(&mut self, id: EntityId, parent: Option<EntityId>, transform: Transform) {
        self.entities.insert(id, EntityData { transform, parent });
        self.event_log.push(SceneEvent::Spawned {
            id,
            parent,
            transform,
        });
    }

    /// Remove an entity and all of its descendants, deepest first.
    /// Returns the data of `id` if it existed.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityData> {
        if !self.entities.contains_key(&id) {
            return None;
        }
        for child in self.children(id) {
            self.despawn(child);
        }
        let data = self.entities.remove(&id)?;
        self.event_log.push(SceneEvent::Despawned {
            id,
            parent: data.parent,
            transform: data.transform,
        });
        Some(data)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityData> {
        self.entities.get(&id)
    }

    /// Local transform of an entity.
    pub fn transform(&self, id: EntityId) -> Option<Transform> {
        self.entities.get(&id).map(|d| d.transform)
    }

    /// Update an entity's local transform and log the change.
    pub fn set_transform(&mut self, id: EntityId, new: Transform) -> bool {
        if let Some(data) = self.entities.get_mut(&id) {
            let old = data.transform;
            data.transform = new;
            self.event_log
                .push(SceneEvent::TransformUpdated { id, old, new });
            true
        } else {
            false
        }
    }

    /// Attach `id` under `parent` (or detach it to the root with `None`).
    /// The local transform is kept as-is.
    pub fn set_parent(
        &mut self,
        id: EntityId,
        parent: Option<EntityId>,
    ) -> Result<(), SceneError> {
        if !self.entities.contains_key(&id) {
            return Err(SceneError::EntityNotFound(id));
        }
        if let Some(p) = parent {
            if !self.entities.contains_key(&p) {
                return Err(SceneError::EntityNotFound(p));
            }
            if self.is_ancestor_or_self(id, p) {
                tracing::warn!(child = %id.short(), parent = %p.short(), "rejected reparent cycle");
                return Err(SceneError::ParentCycle { child: id, parent: p });
            }
        }
        let Some(data) = self.entities.get_mut(&id) else {
            return Err(SceneError::EntityNotFound(id));
        };
        let old = data.parent;
        data.parent = parent;
        self.event_log.push(SceneEvent::Reparented {
            id,
            old,
            new: parent,
        });
        Ok(())
    }

    /// True when `ancestor` is `node` or appears on its parent chain.
    fn is_ancestor_or_self(&self, ancestor: EntityId, node: EntityId) -> bool {
        let mut current = Some(node);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.entities.get(&c).and_then(|d| d.parent);
        }
        false
    }

    /// Direct children of `id`, in id order.
    pub fn children(&self, id: EntityId) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, d)| d.parent == Some(id))
            .map(|(child, _)| *child)
            .collect()
    }

    /// Local-to-world matrix: the product of every transform up the parent chain.
    pub fn world_matrix(&self, id: EntityId) -> Option<Mat4> {
        let mut data = self.entities.get(&id)?;
        let mut matrix = data.transform.matrix();
        while let Some(parent) = data.parent {
            data = self.entities.get(&parent)?;
            matrix = data.transform.matrix() * matrix;
        }
        Some(matrix)
    }

    pub fn world_position(&self, id: EntityId) -> Option<Vec3> {
        self.world_matrix(id).map(|m| m.w_axis.truncate())
    }

    /// Advance the simulation by one tick.
    ///
    /// The seed is mixed with splitmix64 each step, so the same starting seed
    /// and sequence of operations replays to identical states.
    pub fn step(&mut self) {
        self.tick += 1;
        self.seed = splitmix64(self.seed);
        self.event_log.push(SceneEvent::Stepped {
            tick: self.tick,
            seed: self.seed,
        });
    }

    /// Reconstruct scene state from a sequence of events.
    pub fn replay(events: &[SceneEvent]) -> Self {
        Self::replay_seeded(0, events)
    }

    /// Like [`Scene::replay`], starting from a scene built with
    /// [`Scene::with_seed`]. Needed when the log may not contain a step yet.
    pub fn replay_seeded(seed: u64, events: &[SceneEvent]) -> Self {
        tracing::debug!(events = events.len(), "replaying scene");
        let mut scene = Self::with_seed(seed);
        for event in events {
            match event {
                SceneEvent::Spawned {
                    id,
                    parent,
                    transform,
                } => {
                    scene.entities.insert(
                        *id,
                        EntityData {
                            transform: *transform,
                            parent: *parent,
                        },
                    );
                }
                SceneEvent::Despawned { id, .. } => {
                    scene.entities.remove(id);
                }
                SceneEvent::TransformUpdated { id, new, .. } => {
                    if let Some(data) = scene.entities.get_mut(id) {
                        data.transform = *new;
                    }
                }
                SceneEvent::Reparented { id, new, .. } => {
                    if let Some(data) = scene.entities.get_mut(id) {
                        data.parent = *new;
                    }
                }
                SceneEvent::Stepped { tick, seed } => {
                    scene.tick = *tick;
                    scene.seed = *seed;
                }
            }
        }
        scene
    }

    /// Compute a deterministic hash of the scene state for comparison.
    /// Uses canonical (BTreeMap) iteration order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        mix(&mut h, &self.seed.to_le_bytes());
        for (id, data) in &self.entities {
            mix(&mut h, id.0.as_bytes());
            if let Some(parent) = data.parent {
                mix(&mut h, parent.0.as_bytes());
            }
            let t = &data.transform;
            for f in t.position.to_array() {
                mix(&mut h, &f.to_le_bytes());
            }
            for f in t.rotation.to_array() {
                mix(&mut h, &f.to_le_bytes());
            }
            for f in t.scale.to_array() {
                mix(&mut h, &f.to_le_bytes());
            }
        }
        h
    }

    /// Hash of everything except entity ids, for comparing two independently
    /// built scenes (whose v4 ids necessarily differ).
    pub fn layout_hash(&self) -> u64 {
        let mut positions: Vec<[u32; 10]> = self
            .entities
            .values()
            .map(|d| {
                let t = &d.transform;
                let mut key = [0u32; 10];
                for (slot, f) in key.iter_mut().zip(
                    t.position
                        .to_array()
                        .into_iter()
                        .chain(t.rotation.to_array())
                        .chain(t.scale.to_array()),
                ) {
                    *slot = f.to_bits();
                }
                key
            })
            .collect();
        positions.sort_unstable();
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for word in self.tick.to_le_bytes().into_iter().chain(
            positions
                .iter()
                .flat_map(|k| k.iter().flat_map(|w| w.to_le_bytes())),
        ) {
            h ^= word as u64;
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn scene_starts_empty() {
        let s = Scene::new();
        assert_eq!(s.tick(), 0);
        assert_eq!(s.entity_count(), 0);
    }

    #[test]
    fn spawn_and_despawn() {
        let mut s = Scene::new();
        let id = s.spawn(Transform::default());
        assert_eq!(s.entity_count(), 1);
        assert!(s.get(id).is_some());

        let data = s.despawn(id);
        assert!(data.is_some());
        assert_eq!(s.entity_count(), 0);
        assert!(s.despawn(id).is_none());
    }

    #[test]
    fn spawn_child_requires_parent() {
        let mut s = Scene::new();
        let missing = EntityId::new();
        assert!(matches!(
            s.spawn_child(missing, Transform::default()),
            Err(SceneError::EntityNotFound(_))
        ));
    }

    #[test]
    fn despawn_removes_descendants() {
        let mut s = Scene::new();
        let root = s.spawn(Transform::default());
        let child = s.spawn_child(root, Transform::default()).unwrap();
        let grandchild = s.spawn_child(child, Transform::default()).unwrap();
        let other = s.spawn(Transform::default());

        s.despawn(root);
        assert!(!s.contains(root));
        assert!(!s.contains(child));
        assert!(!s.contains(grandchild));
        assert!(s.contains(other));

        // Deepest first: grandchild, child, root.
        let despawned: Vec<EntityId> = s
            .events()
            .iter()
            .filter_map(|e| match e {
                SceneEvent::Despawned { id, .. } => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(despawned, vec![grandchild, child, root]);
    }

    #[test]
    fn world_matrix_composes_parent_chain() {
        let mut s = Scene::new();
        let root = s.spawn(
            Transform::from_position(Vec3::new(10.0, 0.0, 0.0))
                .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
        );
        let child = s
            .spawn_child(root, Transform::from_position(Vec3::new(0.0, 1.0, 1.0)))
            .unwrap();

        let p = s.world_position(child).unwrap();
        // +Z rotated a quarter turn about Y points along +X.
        assert!((p - Vec3::new(11.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn child_scale_follows_parent() {
        let mut s = Scene::new();
        let root = s.spawn(Transform::default().with_scale(Vec3::ZERO));
        let child = s
            .spawn_child(root, Transform::from_position(Vec3::new(3.0, 3.0, 3.0)))
            .unwrap();
        assert_eq!(s.world_position(child).unwrap(), Vec3::ZERO);
    }

    #[test]
    fn set_parent_rejects_cycles() {
        let mut s = Scene::new();
        let a = s.spawn(Transform::default());
        let b = s.spawn_child(a, Transform::default()).unwrap();
        assert!(matches!(
            s.set_parent(a, Some(b)),
            Err(SceneError::ParentCycle { .. })
        ));
        assert!(matches!(
            s.set_parent(a, Some(a)),
            Err(SceneError::ParentCycle { .. })
        ));
        assert!(s.set_parent(b, None).is_ok());
        assert!(s.get(b).unwrap().parent.is_none());
    }

    #[test]
    fn children_lists_direct_children_only() {
        let mut s = Scene::new();
        let root = s.spawn(Transform::default());
        let c1 = s.spawn_child(root, Transform::default()).unwrap();
        let c2 = s.spawn_child(root, Transform::default()).unwrap();
        s.spawn_child(c1, Transform::default()).unwrap();

        let mut expected = vec![c1, c2];
        expected.sort();
        assert_eq!(s.children(root), expected);
    }

    #[test]
    fn step_increments_tick() {
        let mut s = Scene::new();
        s.step();
        s.step();
        s.step();
        assert_eq!(s.tick(), 3);
    }

    #[test]
    fn deterministic_seed_sequence() {
        let mut s1 = Scene::with_seed(42);
        let mut s2 = Scene::with_seed(42);
        for _ in 0..100 {
            s1.step();
            s2.step();
        }
        assert_eq!(s1.seed(), s2.seed());

        let mut s3 = Scene::with_seed(43);
        let mut s4 = Scene::with_seed(42);
        s3.step();
        s4.step();
        assert_ne!(s3.seed(), s4.seed());
    }

    #[test]
    fn events_are_recorded() {
        let mut s = Scene::new();
        let id = s.spawn(Transform::default());
        s.step();
        s.despawn(id);
        assert_eq!(s.events().len(), 3);
    }

    #[test]
    fn drain_events_clears_log() {
        let mut s = Scene::new();
        s.spawn(Transform::default());
        let events = s.drain_events();
        assert_eq!(events.len(), 1);
        assert!(s.events().is_empty());
    }

    #[test]
    fn set_transform_logs_event() {
        let mut s = Scene::new();
        let id = s.spawn(Transform::default());
        let moved = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        assert!(s.set_transform(id, moved));
        assert_eq!(s.transform(id).unwrap().position, moved.position);
        assert_eq!(s.events().len(), 2);
        assert!(!s.set_transform(EntityId::new(), moved));
    }

    #[test]
    fn replay_equivalence() {
        let mut scene = Scene::with_seed(42);
        let root = scene.spawn(Transform::default());
        let child = scene
            .spawn_child(root, Transform::from_position(Vec3::Y))
            .unwrap();
        let loose = scene.spawn(Transform::default());
        scene.set_transform(child, Transform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        scene.set_parent(loose, Some(root)).unwrap();
        scene.step();
        scene.step();

        let replayed = Scene::replay(scene.events());
        assert_eq!(scene.state_hash(), replayed.state_hash());
        assert_eq!(scene.tick(), replayed.tick());
        assert_eq!(scene.seed(), replayed.seed());
        assert_eq!(replayed.get(loose).unwrap().parent, Some(root));
    }

    #[test]
    fn replay_equivalence_with_despawns() {
        let mut scene = Scene::with_seed(99);
        let mut ids = Vec::new();
        for i in 0..20 {
            ids.push(scene.spawn(Transform::from_position(Vec3::new(i as f32, 0.0, 0.0))));
        }
        for i in (0..20).step_by(3) {
            scene.set_transform(ids[i], Transform::from_position(Vec3::splat(100.0)));
        }
        for i in (1..20).step_by(5) {
            scene.despawn(ids[i]);
        }
        for _ in 0..10 {
            scene.step();
        }
        let replayed = Scene::replay(scene.events());
        assert_eq!(scene.state_hash(), replayed.state_hash());
    }

    #[test]
    fn layout_hash_ignores_ids() {
        let mut a = Scene::new();
        let mut b = Scene::new();
        for i in 0..5 {
            let t = Transform::from_position(Vec3::new(i as f32, 0.0, 0.0));
            a.spawn(t);
            b.spawn(t);
        }
        assert_ne!(a.state_hash(), b.state_hash());
        assert_eq!(a.layout_hash(), b.layout_hash());
    }

    #[test]
    fn spawn_with_id_checks_ids_and_parent() {
        let mut s = Scene::new();
        let root = EntityId::new();
        s.spawn_with_id(root, None, Transform::default()).unwrap();
        assert!(matches!(
            s.spawn_with_id(root, None, Transform::default()),
            Err(SceneError::DuplicateEntity(_))
        ));

        let child = EntityId::new();
        assert!(matches!(
            s.spawn_with_id(child, Some(EntityId::new()), Transform::default()),
            Err(SceneError::EntityNotFound(_))
        ));
        s.spawn_with_id(child, Some(root), Transform::default())
            .unwrap();
        assert_eq!(s.children(root), vec![child]);
        assert_eq!(s.events().len(), 2);
    }

    #[test]
    fn seeded_replay_before_first_step() {
        let mut scene = Scene::with_seed(7);
        scene.spawn(Transform::from_position(Vec3::X));
        assert_ne!(Scene::replay(scene.events()).state_hash(), scene.state_hash());
        let replayed = Scene::replay_seeded(7, scene.events());
        assert_eq!(replayed.state_hash(), scene.state_hash());
    }
}
