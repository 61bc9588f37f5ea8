use crate::AssetError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Content-addressed asset ID: the first 8 bytes of the SHA-256 of the
/// asset's kind and contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

/// Mesh description. Every box in the game shares one cube mesh; the GPU
/// backend owns the actual vertex data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub vertex_count: u32,
    pub index_count: u32,
}

/// Flat-colored material. Alpha below 1 renders blended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
}

impl Material {
    pub fn opaque(name: impl Into<String>, rgb: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            base_color: [rgb[0], rgb[1], rgb[2], 1.0],
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.base_color[3] < 1.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Asset {
    Mesh(Mesh),
    Material(Material),
}

fn content_id(kind: &str, name: &str, payload: &[u8]) -> AssetId {
    let digest = Sha256::new()
        .chain_update(kind.as_bytes())
        .chain_update(name.as_bytes())
        .chain_update(payload)
        .finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    AssetId(u64::from_le_bytes(bytes))
}

/// Registry of meshes and materials keyed by content hash, so the hundred or
/// so cubes sharing a color share one material entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetStore {
    assets: BTreeMap<AssetId, Asset>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_mesh(&mut self, mesh: Mesh) -> AssetId {
        let mut payload = mesh.vertex_count.to_le_bytes().to_vec();
        payload.extend_from_slice(&mesh.index_count.to_le_bytes());
        let id = content_id("mesh", &mesh.name, &payload);
        self.assets.insert(id, Asset::Mesh(mesh));
        id
    }

    pub fn register_material(&mut self, material: Material) -> AssetId {
        let payload: Vec<u8> = material
            .base_color
            .iter()
            .flat_map(|c| c.to_le_bytes())
            .collect();
        let id = content_id("material", &material.name, &payload);
        self.assets.insert(id, Asset::Material(material));
        id
    }

    pub fn get_mesh(&self, id: AssetId) -> Option<&Mesh> {
        match self.assets.get(&id) {
            Some(Asset::Mesh(m)) => Some(m),
            _ => None,
        }
    }

    pub fn get_material(&self, id: AssetId) -> Option<&Material> {
        match self.assets.get(&id) {
            Some(Asset::Material(m)) => Some(m),
            _ => None,
        }
    }

    /// Like [`get_material`](Self::get_material) but reports a missing id as an error.
    pub fn material(&self, id: AssetId) -> Result<&Material, AssetError> {
        self.get_material(id).ok_or(AssetError::NotFound(id))
    }

    /// Materials in id order.
    pub fn materials(&self) -> impl Iterator<Item = (AssetId, &Material)> {
        self.assets.iter().filter_map(|(id, asset)| match asset {
            Asset::Material(m) => Some((*id, m)),
            Asset::Mesh(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Register the unit cube every box in the game is drawn with.
    pub fn register_default_cube(&mut self) -> AssetId {
        self.register_mesh(Mesh {
            name: "unit_cube".into(),
            vertex_count: 24,
            index_count: 36,
        })
    }

    /// Write the registry as pretty JSON, for inspecting a round's palette.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AssetError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let file = std::fs::File::open(path)?;
        let store: Self = serde_json::from_reader(file)?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_mesh() {
        let mut store = AssetStore::new();
        let id = store.register_default_cube();
        assert_eq!(store.get_mesh(id).unwrap().index_count, 36);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn register_material() {
        let mut store = AssetStore::new();
        let id = store.register_material(Material::opaque("collectible", [0.1, 0.2, 0.3]));
        let m = store.get_material(id).unwrap();
        assert_eq!(m.base_color, [0.1, 0.2, 0.3, 1.0]);
        assert!(!m.is_transparent());
    }

    #[test]
    fn content_addressed_dedup() {
        let mut store = AssetStore::new();
        let a = store.register_material(Material::opaque("collectible", [1.0, 0.0, 0.0]));
        let b = store.register_material(Material::opaque("collectible", [1.0, 0.0, 0.0]));
        let c = store.register_material(Material::opaque("collectible", [0.0, 1.0, 0.0]));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn mesh_and_material_ids_do_not_alias() {
        let mut store = AssetStore::new();
        let cube = store.register_default_cube();
        assert!(store.get_material(cube).is_none());
        assert!(matches!(store.material(cube), Err(AssetError::NotFound(_))));
    }

    #[test]
    fn materials_skips_meshes() {
        let mut store = AssetStore::new();
        store.register_default_cube();
        let a = store.register_material(Material::opaque("collectible", [0.2, 0.4, 0.6]));
        let listed: Vec<AssetId> = store.materials().map(|(id, _)| id).collect();
        assert_eq!(listed, vec![a]);
    }

    #[test]
    fn transparency_follows_alpha() {
        let zone = Material {
            name: "dropZone".into(),
            base_color: [1.0, 0.0, 0.0, 0.5],
        };
        assert!(zone.is_transparent());
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut store = AssetStore::new();
        store.register_default_cube();
        let red = store.register_material(Material::opaque("collectible", [1.0, 0.0, 0.0]));
        store.save(tmp.path()).unwrap();

        let loaded = AssetStore::load(tmp.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.material(red).unwrap().base_color, [1.0, 0.0, 0.0, 1.0]);
    }
}
