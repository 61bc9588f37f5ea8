//! Components attached to scene entities: a name tag, what to draw and the
//! box used for pickup and drop-zone checks.
//!
//! # Invariants
//! - All component mutations produce events, and replaying them with
//!   [`ComponentStore::apply_event`] rebuilds the store.
//! - Iteration is in id order.

use cubestack_common::{Aabb, EntityId};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A handle referencing a mesh asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshHandle(pub u64);

/// A handle referencing a material asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialHandle(pub u64);

/// Human-readable name component. Gameplay code tags entities with it
/// (`collectible`, `dropZone`, `stackCube`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name(pub String);

/// Renderable component: references mesh and material assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Renderable {
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

/// Box collision volume in the entity's local space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxCollider {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Default for BoxCollider {
    /// Unit cube centered on the entity origin.
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            half_extents: Vec3::splat(0.5),
        }
    }
}

impl BoxCollider {
    pub fn local_aabb(&self) -> Aabb {
        Aabb::from_center_half_extents(self.center, self.half_extents)
    }

    /// World-space bounds given the entity's local-to-world matrix.
    pub fn world_aabb(&self, world: &Mat4) -> Aabb {
        self.local_aabb().transformed(world)
    }
}

/// Events produced by component mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ComponentEvent {
    NameAdded { entity: EntityId, name: String },
    NameRemoved { entity: EntityId, name: String },
    NameUpdated { entity: EntityId, old: String, new: String },
    RenderableAdded { entity: EntityId, renderable: Renderable },
    RenderableRemoved { entity: EntityId, renderable: Renderable },
    RenderableUpdated { entity: EntityId, old: Renderable, new: Renderable },
    ColliderAdded { entity: EntityId, collider: BoxCollider },
    ColliderRemoved { entity: EntityId, collider: BoxCollider },
    ColliderUpdated { entity: EntityId, old: BoxCollider, new: BoxCollider },
}

/// Deterministic component storage for all component types.
///
/// Uses BTreeMap for canonical iteration order. All mutations produce events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentStore {
    names: BTreeMap<EntityId, Name>,
    renderables: BTreeMap<EntityId, Renderable>,
    colliders: BTreeMap<EntityId, BoxCollider>,
    #[serde(skip)]
    events: Vec<ComponentEvent>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return all pending component events.
    pub fn drain_events(&mut self) -> Vec<ComponentEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only access to pending events.
    pub fn events(&self) -> &[ComponentEvent] {
        &self.events
    }

    // --- Name ---
    pub fn set_name(&mut self, entity: EntityId, name: impl Into<String>) {
        let name = name.into();
        if let Some(old) = self.names.get(&entity) {
            self.events.push(ComponentEvent::NameUpdated {
                entity,
                old: old.0.clone(),
                new: name.clone(),
            });
        } else {
            self.events.push(ComponentEvent::NameAdded {
                entity,
                name: name.clone(),
            });
        }
        self.names.insert(entity, Name(name));
    }

    pub fn remove_name(&mut self, entity: EntityId) -> Option<Name> {
        let removed = self.names.remove(&entity);
        if let Some(ref n) = removed {
            self.events.push(ComponentEvent::NameRemoved {
                entity,
                name: n.0.clone(),
            });
        }
        removed
    }

    pub fn get_name(&self, entity: EntityId) -> Option<&Name> {
        self.names.get(&entity)
    }

    pub fn names(&self) -> &BTreeMap<EntityId, Name> {
        &self.names
    }

    /// All entities carrying exactly this name, in id order.
    pub fn named(&self, name: &str) -> Vec<EntityId> {
        self.names
            .iter()
            .filter(|(_, n)| n.0 == name)
            .map(|(id, _)| *id)
            .collect()
    }

    // --- Renderable ---
    pub fn set_renderable(&mut self, entity: EntityId, renderable: Renderable) {
        if let Some(old) = self.renderables.get(&entity) {
            self.events.push(ComponentEvent::RenderableUpdated {
                entity,
                old: *old,
                new: renderable,
            });
        } else {
            self.events.push(ComponentEvent::RenderableAdded {
                entity,
                renderable,
            });
        }
        self.renderables.insert(entity, renderable);
    }

    pub fn remove_renderable(&mut self, entity: EntityId) -> Option<Renderable> {
        let removed = self.renderables.remove(&entity);
        if let Some(r) = removed {
            self.events.push(ComponentEvent::RenderableRemoved {
                entity,
                renderable: r,
            });
        }
        removed
    }

    pub fn get_renderable(&self, entity: EntityId) -> Option<&Renderable> {
        self.renderables.get(&entity)
    }

    pub fn renderables(&self) -> &BTreeMap<EntityId, Renderable> {
        &self.renderables
    }

    // --- Collider ---
    pub fn set_collider(&mut self, entity: EntityId, collider: BoxCollider) {
        let event = match self.colliders.insert(entity, collider) {
            Some(old) => ComponentEvent::ColliderUpdated {
                entity,
                old,
                new: collider,
            },
            None => ComponentEvent::ColliderAdded { entity, collider },
        };
        self.events.push(event);
    }

    pub fn remove_collider(&mut self, entity: EntityId) -> Option<BoxCollider> {
        let removed = self.colliders.remove(&entity);
        if let Some(collider) = removed {
            self.events
                .push(ComponentEvent::ColliderRemoved { entity, collider });
        }
        removed
    }

    pub fn get_collider(&self, entity: EntityId) -> Option<&BoxCollider> {
        self.colliders.get(&entity)
    }

    pub fn colliders(&self) -> &BTreeMap<EntityId, BoxCollider> {
        &self.colliders
    }

    /// True when both stores hold the same components, ignoring pending events.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.names == other.names
            && self.renderables == other.renderables
            && self.colliders == other.colliders
    }

    /// Remove all components for an entity.
    pub fn remove_entity(&mut self, entity: EntityId) {
        self.remove_name(entity);
        self.remove_renderable(entity);
        self.remove_collider(entity);
    }

    /// Replay a component event.
    pub fn apply_event(&mut self, event: &ComponentEvent) {
        match event {
            ComponentEvent::NameAdded { entity, name } => {
                self.names.insert(*entity, Name(name.clone()));
            }
            ComponentEvent::NameRemoved { entity, .. } => {
                self.names.remove(entity);
            }
            ComponentEvent::NameUpdated { entity, new, .. } => {
                self.names.insert(*entity, Name(new.clone()));
            }
            ComponentEvent::RenderableAdded { entity, renderable } => {
                self.renderables.insert(*entity, *renderable);
            }
            ComponentEvent::RenderableRemoved { entity, .. } => {
                self.renderables.remove(entity);
            }
            ComponentEvent::RenderableUpdated { entity, new, .. } => {
                self.renderables.insert(*entity, *new);
            }
            ComponentEvent::ColliderAdded { entity, collider }
            | ComponentEvent::ColliderUpdated {
                entity,
                new: collider,
                ..
            } => {
                self.colliders.insert(*entity, *collider);
            }
            ComponentEvent::ColliderRemoved { entity, .. } => {
                self.colliders.remove(entity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_add_remove() {
        let mut store = ComponentStore::new();
        let id = EntityId::new();
        store.set_name(id, "collectible");
        assert_eq!(store.get_name(id).unwrap().0, "collectible");

        store.remove_name(id);
        assert!(store.get_name(id).is_none());
        assert_eq!(store.events().len(), 2);
    }

    #[test]
    fn name_update_produces_event() {
        let mut store = ComponentStore::new();
        let id = EntityId::new();
        store.set_name(id, "First");
        store.set_name(id, "Second");
        assert_eq!(store.get_name(id).unwrap().0, "Second");
        assert!(matches!(
            store.events()[1],
            ComponentEvent::NameUpdated { .. }
        ));
    }

    #[test]
    fn named_filters_by_tag() {
        let mut store = ComponentStore::new();
        let a = EntityId::new();
        let b = EntityId::new();
        let c = EntityId::new();
        store.set_name(a, "collectible");
        store.set_name(b, "dropZone");
        store.set_name(c, "collectible");

        let found = store.named("collectible");
        assert_eq!(found.len(), 2);
        assert!(found.contains(&a) && found.contains(&c));
    }

    #[test]
    fn renderable_add_update_remove() {
        let mut store = ComponentStore::new();
        let id = EntityId::new();
        let r = Renderable {
            mesh: MeshHandle(1),
            material: MaterialHandle(2),
        };
        store.set_renderable(id, r);
        assert_eq!(store.get_renderable(id), Some(&r));

        let recolored = Renderable {
            material: MaterialHandle(3),
            ..r
        };
        store.set_renderable(id, recolored);
        assert_eq!(store.get_renderable(id).unwrap().material, MaterialHandle(3));

        store.remove_renderable(id);
        assert!(store.get_renderable(id).is_none());
    }

    #[test]
    fn collider_world_aabb_follows_matrix() {
        let collider = BoxCollider {
            center: Vec3::new(0.0, 1.0, 0.0),
            half_extents: Vec3::new(0.4, 1.0, 0.4),
        };
        let world = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        let aabb = collider.world_aabb(&world);
        assert_eq!(aabb.min, Vec3::new(4.6, 0.0, -0.4));
        assert_eq!(aabb.max, Vec3::new(5.4, 2.0, 0.4));
    }

    #[test]
    fn collider_resize_is_an_update() {
        let mut store = ComponentStore::new();
        let id = EntityId::new();
        store.set_collider(id, BoxCollider::default());
        let body = BoxCollider {
            center: Vec3::new(0.0, 1.0, 0.0),
            half_extents: Vec3::new(0.5, 1.0, 0.5),
        };
        store.set_collider(id, body);
        assert_eq!(store.get_collider(id), Some(&body));
        assert!(matches!(
            store.events()[1],
            ComponentEvent::ColliderUpdated { .. }
        ));
    }

    #[test]
    fn remove_entity_clears_all() {
        let mut store = ComponentStore::new();
        let id = EntityId::new();
        store.set_name(id, "Test");
        store.set_renderable(
            id,
            Renderable {
                mesh: MeshHandle(0),
                material: MaterialHandle(0),
            },
        );
        store.set_collider(id, BoxCollider::default());

        store.remove_entity(id);
        assert!(store.get_name(id).is_none());
        assert!(store.get_renderable(id).is_none());
        assert!(store.get_collider(id).is_none());
    }

    #[test]
    fn deterministic_iteration_order() {
        let mut store = ComponentStore::new();
        let mut ids: Vec<EntityId> = (0..50).map(|_| EntityId::new()).collect();
        for id in &ids {
            store.set_name(*id, format!("entity_{}", id.0));
        }
        ids.sort();
        let stored_keys: Vec<EntityId> = store.names().keys().copied().collect();
        assert_eq!(stored_keys, ids);
    }

    #[test]
    fn apply_event_replay() {
        let mut original = ComponentStore::new();
        let id = EntityId::new();
        original.set_name(id, "Replayed");
        original.set_collider(id, BoxCollider::default());
        original.remove_collider(id);

        let mut replayed = ComponentStore::new();
        for event in original.events() {
            replayed.apply_event(event);
        }
        assert_eq!(replayed.get_name(id).unwrap().0, "Replayed");
        assert!(replayed.get_collider(id).is_none());
        assert!(replayed.content_eq(&original));

        replayed.set_collider(id, BoxCollider::default());
        assert!(!replayed.content_eq(&original));
    }

    #[test]
    fn drain_events() {
        let mut store = ComponentStore::new();
        let id = EntityId::new();
        store.set_name(id, "Test");
        let events = store.drain_events();
        assert_eq!(events.len(), 1);
        assert!(store.events().is_empty());
    }
}
