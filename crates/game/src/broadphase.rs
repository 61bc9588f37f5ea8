use cubestack_common::{Aabb, EntityId};
use glam::Vec3;
use std::collections::{BTreeSet, HashMap};

/// A 2D cell coordinate on the ground plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

impl CellCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

/// Uniform XZ grid of entity bounds.
///
/// An entity is placed in every cell its bounds overlap, so a query only has
/// to visit the cells under the query box. Results are candidates; callers
/// confirm them with an exact box test.
#[derive(Debug, Clone)]
pub struct GridPartition {
    cell_size: f32,
    cells: HashMap<CellCoord, BTreeSet<EntityId>>,
    placed: HashMap<EntityId, Aabb>,
}

impl GridPartition {
    /// A non-positive `cell_size` falls back to 1.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        Self {
            cell_size,
            cells: HashMap::new(),
            placed: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn position_to_cell(&self, pos: Vec3) -> CellCoord {
        CellCoord {
            x: (pos.x / self.cell_size).floor() as i32,
            z: (pos.z / self.cell_size).floor() as i32,
        }
    }

    fn cells_covering(&self, aabb: &Aabb) -> Vec<CellCoord> {
        let lo = self.position_to_cell(aabb.min);
        let hi = self.position_to_cell(aabb.max);
        (lo.x..=hi.x)
            .flat_map(|x| (lo.z..=hi.z).map(move |z| CellCoord::new(x, z)))
            .collect()
    }

    /// Place `id` under `aabb`, replacing any earlier placement.
    pub fn insert(&mut self, id: EntityId, aabb: Aabb) {
        self.remove(id);
        for coord in self.cells_covering(&aabb) {
            self.cells.entry(coord).or_default().insert(id);
        }
        self.placed.insert(id, aabb);
    }

    /// Returns false if `id` was not placed.
    pub fn remove(&mut self, id: EntityId) -> bool {
        let Some(aabb) = self.placed.remove(&id) else {
            return false;
        };
        for coord in self.cells_covering(&aabb) {
            if let Some(set) = self.cells.get_mut(&coord) {
                set.remove(&id);
                if set.is_empty() {
                    self.cells.remove(&coord);
                }
            }
        }
        true
    }

    /// Ids placed in any cell overlapping `aabb`, in id order.
    pub fn query(&self, aabb: &Aabb) -> BTreeSet<EntityId> {
        let mut result = BTreeSet::new();
        for coord in self.cells_covering(aabb) {
            if let Some(set) = self.cells.get(&coord) {
                result.extend(set.iter().copied());
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_at(x: f32, z: f32) -> Aabb {
        Aabb::from_center_half_extents(Vec3::new(x, 0.5, z), Vec3::splat(0.5))
    }

    #[test]
    fn position_to_cell_basic() {
        let grid = GridPartition::new(16.0);
        assert_eq!(
            grid.position_to_cell(Vec3::new(10.0, 0.0, 10.0)),
            CellCoord::new(0, 0)
        );
        assert_eq!(
            grid.position_to_cell(Vec3::new(20.0, 0.0, -5.0)),
            CellCoord::new(1, -1)
        );
    }

    #[test]
    fn query_finds_nearby_only() {
        let mut grid = GridPartition::new(4.0);
        let near = EntityId::new();
        let far = EntityId::new();
        grid.insert(near, unit_at(1.0, 1.0));
        grid.insert(far, unit_at(30.0, 30.0));

        let hits = grid.query(&unit_at(1.5, 1.5));
        assert!(hits.contains(&near));
        assert!(!hits.contains(&far));
    }

    #[test]
    fn straddling_entity_is_in_every_cell() {
        let mut grid = GridPartition::new(2.0);
        let id = EntityId::new();
        grid.insert(id, unit_at(2.0, 2.0));
        assert_eq!(grid.cell_count(), 4);
        assert!(grid.query(&unit_at(0.8, 0.8)).contains(&id));
        assert!(grid.query(&unit_at(3.2, 3.2)).contains(&id));
    }

    #[test]
    fn remove_empties_cells() {
        let mut grid = GridPartition::new(2.0);
        let id = EntityId::new();
        grid.insert(id, unit_at(2.0, 2.0));
        assert!(grid.remove(id));
        assert!(!grid.remove(id));
        assert!(grid.is_empty());
        assert_eq!(grid.cell_count(), 0);
        assert!(grid.query(&unit_at(2.0, 2.0)).is_empty());
    }

    #[test]
    fn reinsert_moves_entity() {
        let mut grid = GridPartition::new(2.0);
        let id = EntityId::new();
        grid.insert(id, unit_at(0.5, 0.5));
        grid.insert(id, unit_at(20.5, 20.5));
        assert_eq!(grid.len(), 1);
        assert!(grid.query(&unit_at(0.5, 0.5)).is_empty());
        assert!(grid.query(&unit_at(20.5, 20.5)).contains(&id));
    }

    #[test]
    fn empty_grid_returns_empty_set() {
        let grid = GridPartition::new(16.0);
        assert!(grid.query(&unit_at(99.0, 99.0)).is_empty());
    }
}
