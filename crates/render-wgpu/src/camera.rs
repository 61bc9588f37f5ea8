use cubestack_render::RenderView;
use glam::{Mat4, Vec3};

/// Third-person camera that trails the character from a fixed offset and
/// eases toward it. Camera motion lives outside the deterministic simulation.
#[derive(Debug, Clone)]
pub struct ChaseCamera {
    pub position: Vec3,
    pub look_at: Vec3,
    /// Eye position relative to the followed point.
    pub offset: Vec3,
    /// Approach rate per second; higher snaps faster.
    pub stiffness: f32,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ChaseCamera {
    fn default() -> Self {
        let offset = Vec3::new(0.0, 5.0, 8.0);
        let start = Vec3::new(0.0, 0.0, 24.0);
        Self {
            position: start + offset,
            look_at: start,
            offset,
            stiffness: 6.0,
            fov: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl ChaseCamera {
    /// Jump straight to the follow pose for `target`.
    pub fn snap_to(&mut self, target: Vec3) {
        self.look_at = target;
        self.position = target + self.offset;
    }

    /// Ease toward the follow pose for `target` over `dt` seconds.
    pub fn follow(&mut self, target: Vec3, dt: f32) {
        let t = 1.0 - (-self.stiffness * dt.max(0.0)).exp();
        self.look_at = self.look_at.lerp(target, t);
        self.position = self.position.lerp(target + self.offset, t);
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_at, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn render_view(&self) -> RenderView {
        RenderView {
            eye: self.position,
            target: self.look_at,
            fov_degrees: self.fov.to_degrees(),
        }
    }
}
