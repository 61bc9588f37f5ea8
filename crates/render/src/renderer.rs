use cubestack_kernel::Scene;
use glam::Vec3;

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 5.0, 32.0),
            target: Vec3::new(0.0, 0.0, 24.0),
            fov_degrees: 75.0,
        }
    }
}

/// Renderer-agnostic interface.
///
/// A renderer reads the scene and a view and produces output. It never
/// mutates the scene.
pub trait Renderer {
    type Output;

    fn render(&self, scene: &Scene, view: &RenderView) -> Self::Output;
}

/// Text dump of the scene: tick, seed, camera and every entity's world
/// position. Used by the CLI and in tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    /// Stop listing entities after this many; `None` lists all.
    pub limit: Option<usize>,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit) }
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, scene: &Scene, view: &RenderView) -> String {
        let mut out = format!(
            "=== Scene (tick={}, seed={}) ===\nEntities: {}\n",
            scene.tick(),
            scene.seed(),
            scene.entity_count()
        );
        out.push_str(&format!(
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1}) fov={:.0}\n",
            view.eye.x,
            view.eye.y,
            view.eye.z,
            view.target.x,
            view.target.y,
            view.target.z,
            view.fov_degrees
        ));

        let limit = self.limit.unwrap_or(usize::MAX);
        for id in scene.entities().keys().take(limit) {
            let p = scene.world_position(*id).unwrap_or(Vec3::ZERO);
            out.push_str(&format!(
                "  [{}] pos=({:.2}, {:.2}, {:.2})\n",
                id.short(),
                p.x,
                p.y,
                p.z
            ));
        }
        if scene.entity_count() > limit {
            out.push_str(&format!("  ... {} more\n", scene.entity_count() - limit));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubestack_common::Transform;

    #[test]
    fn debug_renderer_empty_scene() {
        let scene = Scene::new();
        let output = DebugTextRenderer::new().render(&scene, &RenderView::default());
        assert!(output.contains("tick=0"));
        assert!(output.contains("Entities: 0"));
    }

    #[test]
    fn debug_renderer_reports_world_positions() {
        let mut scene = Scene::new();
        let root = scene.spawn(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        scene
            .spawn_child(root, Transform::from_position(Vec3::new(0.0, 2.0, 3.0)))
            .unwrap();

        let output = DebugTextRenderer::new().render(&scene, &RenderView::default());
        assert!(output.contains("Entities: 2"));
        assert!(output.contains("pos=(1.00, 2.00, 3.00)"));
    }

    #[test]
    fn limit_truncates_listing() {
        let mut scene = Scene::new();
        for _ in 0..5 {
            scene.spawn(Transform::default());
        }
        let output = DebugTextRenderer::with_limit(2).render(&scene, &RenderView::default());
        assert_eq!(output.matches("pos=").count(), 2);
        assert!(output.contains("... 3 more"));
    }
}
