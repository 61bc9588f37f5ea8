use crate::AssetError;
use cubestack_common::Aabb;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One box of a prefab, placed relative to the prefab origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefabPart {
    pub name: String,
    /// Center of the box relative to the prefab origin.
    pub offset: Vec3,
    /// Full edge lengths.
    pub size: Vec3,
    pub color: [f32; 4],
}

/// A model made of colored boxes. Instantiated as a root entity with one
/// child per part, so scaling the root scales the whole model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefab {
    pub name: String,
    pub parts: Vec<PrefabPart>,
}

impl Prefab {
    /// Built-in house: walls, door, windows, a stepped roof and a chimney.
    /// Origin sits at ground level under the middle of the walls.
    pub fn house() -> Self {
        let wall = [0.93, 0.87, 0.74, 1.0];
        let roof = [0.62, 0.18, 0.12, 1.0];
        let wood = [0.42, 0.26, 0.13, 1.0];
        let glass = [0.55, 0.78, 0.92, 1.0];
        let brick = [0.45, 0.2, 0.15, 1.0];
        let part = |name: &str, offset: [f32; 3], size: [f32; 3], color: [f32; 4]| PrefabPart {
            name: name.into(),
            offset: Vec3::from_array(offset),
            size: Vec3::from_array(size),
            color,
        };
        Self {
            name: "house".into(),
            parts: vec![
                part("walls", [0.0, 2.5, 0.0], [8.0, 5.0, 8.0], wall),
                part("door", [0.0, 1.5, 4.05], [1.6, 3.0, 0.2], wood),
                part("window_left", [-2.5, 3.0, 4.05], [1.4, 1.2, 0.2], glass),
                part("window_right", [2.5, 3.0, 4.05], [1.4, 1.2, 0.2], glass),
                part("roof_0", [0.0, 5.5, 0.0], [9.0, 1.0, 9.0], roof),
                part("roof_1", [0.0, 6.5, 0.0], [7.0, 1.0, 7.0], roof),
                part("roof_2", [0.0, 7.5, 0.0], [5.0, 1.0, 5.0], roof),
                part("roof_3", [0.0, 8.5, 0.0], [3.0, 1.0, 3.0], roof),
                part("chimney", [2.5, 7.5, -2.0], [1.0, 3.0, 1.0], brick),
            ],
        }
    }

    /// Load a prefab from a JSON file and validate it.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path.as_ref())?;
        let prefab: Self = serde_json::from_reader(file)?;
        prefab.validate()?;
        tracing::debug!(
            name = %prefab.name,
            parts = prefab.parts.len(),
            "loaded prefab from {}",
            path.as_ref().display()
        );
        Ok(prefab)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AssetError> {
        if self.parts.is_empty() {
            return Err(AssetError::InvalidPrefab {
                name: self.name.clone(),
                reason: "no parts".into(),
            });
        }
        if let Some(bad) = self.parts.iter().find(|p| p.size.cmple(Vec3::ZERO).any()) {
            return Err(AssetError::InvalidPrefab {
                name: self.name.clone(),
                reason: format!("part {} has a non-positive size", bad.name),
            });
        }
        Ok(())
    }

    /// Bounds of all parts in prefab space. `None` for an empty prefab.
    pub fn bounds(&self) -> Option<Aabb> {
        self.parts
            .iter()
            .map(|p| Aabb::from_center_half_extents(p.offset, p.size * 0.5))
            .reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_house_is_valid() {
        let house = Prefab::house();
        assert!(house.validate().is_ok());
        let bounds = house.bounds().unwrap();
        assert_eq!(bounds.min.y, 0.0);
        assert!(bounds.max.y >= 9.0);
    }

    #[test]
    fn house_fits_on_drop_zone() {
        let bounds = Prefab::house().bounds().unwrap();
        assert!(bounds.size().x <= 20.0);
        assert!(bounds.size().z <= 20.0);
    }

    #[test]
    fn empty_prefab_is_rejected() {
        let empty = Prefab {
            name: "empty".into(),
            parts: vec![],
        };
        assert!(matches!(
            empty.validate(),
            Err(AssetError::InvalidPrefab { .. })
        ));
        assert!(empty.bounds().is_none());
    }

    #[test]
    fn flat_part_is_rejected() {
        let mut prefab = Prefab::house();
        prefab.parts[0].size.y = 0.0;
        assert!(prefab.validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let house = Prefab::house();
        house.save_json(tmp.path()).unwrap();
        let loaded = Prefab::load_json(tmp.path()).unwrap();
        assert_eq!(loaded, house);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Prefab::load_json(dir.path().join("nope.json"));
        assert!(matches!(result, Err(AssetError::Io(_))));
    }
}
