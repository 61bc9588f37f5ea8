use cubestack_assets::{AssetId, AssetStore};
use cubestack_ecs::ComponentStore;
use cubestack_kernel::Scene;
use glam::{Mat4, Vec3};

/// World matrices with a smaller determinant than this are treated as
/// collapsed (the house before it starts growing).
const MIN_DETERMINANT: f32 = 1e-9;

/// One unit cube to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub model: Mat4,
    pub color: [f32; 4],
}

/// Everything visible in one frame. Opaque items are drawn first with depth
/// writes; transparent items are blended on top.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub opaque: Vec<DrawItem>,
    pub transparent: Vec<DrawItem>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every renderable entity with a known material.
    pub fn build(scene: &Scene, components: &ComponentStore, assets: &AssetStore) -> Self {
        let mut list = Self::new();
        for (&id, renderable) in components.renderables() {
            let Some(model) = scene.world_matrix(id) else {
                continue;
            };
            if model.determinant().abs() < MIN_DETERMINANT {
                continue;
            }
            let Some(material) = assets.get_material(AssetId(renderable.material.0)) else {
                tracing::trace!(entity = %id.short(), "renderable without material skipped");
                continue;
            };
            list.push(DrawItem {
                model,
                color: material.base_color,
            });
        }
        list
    }

    /// Route by alpha.
    pub fn push(&mut self, item: DrawItem) {
        if item.color[3] < 1.0 {
            self.transparent.push(item);
        } else {
            self.opaque.push(item);
        }
    }

    /// A small axis-aligned cube, used for particles.
    pub fn push_point(&mut self, position: Vec3, size: f32, rgb: [f32; 3], alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        self.push(DrawItem {
            model: Mat4::from_scale_rotation_translation(
                Vec3::splat(size),
                glam::Quat::IDENTITY,
                position,
            ),
            color: [rgb[0], rgb[1], rgb[2], alpha],
        });
    }

    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.transparent.is_empty()
    }

    /// Order transparent items back to front from `eye` so blending composes
    /// correctly.
    pub fn sort_transparent(&mut self, eye: Vec3) {
        self.transparent.sort_by(|a, b| {
            let da = a.model.w_axis.truncate().distance_squared(eye);
            let db = b.model.w_axis.truncate().distance_squared(eye);
            db.total_cmp(&da)
        });
    }
}
