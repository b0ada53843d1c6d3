//! Camera and view management.

use glam::{Mat4, Vec3};
use plaster_core::CameraUniforms;

/// Pitch limit in degrees, keeps the view away from the poles.
const MAX_PITCH: f32 = 89.0;

/// Perspective camera described by a position and yaw/pitch angles.
///
/// Angles are in degrees. A yaw of -90 looks down -Z.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pitch: f32,
    yaw: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            pitch: 0.0,
            yaw: -90.0,
            fov: 60.0,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Create a camera with the given projection parameters.
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov,
            aspect,
            near,
            far,
            ..Self::default()
        }
    }

    /// Pitch in degrees.
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Yaw in degrees.
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Set the camera position.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Set absolute rotation. Pitch is clamped to +/-89 degrees.
    pub fn set_rotation(&mut self, pitch: f32, yaw: f32) {
        self.pitch = pitch.clamp(-MAX_PITCH, MAX_PITCH);
        self.yaw = yaw;
    }

    /// Rotate by the given deltas in degrees.
    pub fn rotate(&mut self, pitch_delta: f32, yaw_delta: f32) {
        self.set_rotation(self.pitch + pitch_delta, self.yaw + yaw_delta);
    }

    /// Translate the camera.
    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    /// Point the camera at `target`.
    ///
    /// Does nothing if `target` coincides with the camera position.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(direction) = (target - self.position).try_normalize() else {
            return;
        };
        let pitch = direction.y.clamp(-1.0, 1.0).asin().to_degrees();
        let yaw = direction.z.atan2(direction.x).to_degrees();
        self.set_rotation(pitch, yaw);
    }

    /// Set the aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        let (pitch, yaw) = (self.pitch.to_radians(), self.yaw.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    /// Unit vector to the camera's right.
    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Unit vector above the camera.
    pub fn up(&self) -> Vec3 {
        self.right().cross(self.forward()).normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    /// Projection into Vulkan clip space (depth 0..1, Y down).
    pub fn projection_matrix(&self) -> Mat4 {
        let mut projection =
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far);
        projection.y_axis.y *= -1.0;
        projection
    }

    /// Get camera uniforms for GPU.
    pub fn uniforms(&self) -> CameraUniforms {
        CameraUniforms::new(self.view_matrix(), self.projection_matrix(), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_looks_down_negative_z() {
        let camera = Camera::default();
        let forward = camera.forward();
        assert_relative_eq!(forward.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(forward.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(forward.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = Camera::default();
        camera.set_rotation(120.0, 0.0);
        assert_relative_eq!(camera.pitch(), 89.0);
        camera.rotate(-300.0, 10.0);
        assert_relative_eq!(camera.pitch(), -89.0);
        assert_relative_eq!(camera.yaw(), 10.0);
    }

    #[test]
    fn look_at_points_forward() {
        let mut camera = Camera::default();
        camera.set_position(Vec3::new(0.0, 2.0, 5.0));
        camera.look_at(Vec3::ZERO);

        let expected = (Vec3::ZERO - camera.position).normalize();
        let forward = camera.forward();
        assert_relative_eq!(forward.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(forward.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(forward.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn look_at_self_is_ignored() {
        let mut camera = Camera::default();
        camera.look_at(camera.position);
        assert_relative_eq!(camera.yaw(), -90.0);
    }

    #[test]
    fn target_projects_to_center() {
        let mut camera = Camera::default();
        camera.set_position(Vec3::new(0.0, 2.0, 5.0));
        camera.look_at(Vec3::ZERO);

        let clip = camera.projection_matrix() * camera.view_matrix() * Vec3::ZERO.extend(1.0);
        let ndc = clip / clip.w;
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn projection_flips_y() {
        let camera = Camera::default();
        // A point above the view axis lands in the top half (negative Y in Vulkan).
        let clip = camera.projection_matrix() * Vec3::new(0.0, 1.0, -5.0).extend(1.0);
        assert!(clip.y / clip.w < 0.0);
    }
}
