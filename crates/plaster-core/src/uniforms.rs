//! GPU uniform buffer layouts.
//!
//! Every struct here is `#[repr(C)]` and laid out to match std140 blocks in
//! the clay shaders: vec3 members are widened to vec4 and scalar tails are
//! padded to 16 bytes.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::constants::MAX_LIGHTS;
use crate::math::normal_matrix;

/// Camera uniform buffer data (set 0, binding 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// World position in xyz, w unused.
    pub position: [f32; 4],
}

impl CameraUniforms {
    /// Build camera uniforms from matrices and a world position.
    pub fn new(view: Mat4, projection: Mat4, position: Vec3) -> Self {
        Self {
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
            position: position.extend(1.0).to_array(),
        }
    }
}

impl Default for CameraUniforms {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::ZERO)
    }
}

/// Point light uniform buffer data (set 0, binding 1).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct LightUniforms {
    /// Light positions in xyz, intensity in w.
    pub positions: [[f32; 4]; MAX_LIGHTS],
    /// Light colors in rgb, a unused.
    pub colors: [[f32; 4]; MAX_LIGHTS],
    pub count: i32,
    pub _pad: [i32; 3],
}

impl LightUniforms {
    /// Pack up to [`MAX_LIGHTS`] lights given as `(position, intensity, color)`.
    ///
    /// Extra lights are ignored.
    pub fn from_lights(lights: impl IntoIterator<Item = (Vec3, f32, Vec3)>) -> Self {
        let mut uniforms = Self::default();
        let mut count = 0;
        for (position, intensity, color) in lights.into_iter().take(MAX_LIGHTS) {
            uniforms.positions[count] = position.extend(intensity).to_array();
            uniforms.colors[count] = color.extend(1.0).to_array();
            count += 1;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        {
            uniforms.count = count as i32;
        }
        uniforms
    }
}

/// Per-object uniform buffer data (set 1, dynamic offset).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl ObjectUniforms {
    /// Build object uniforms from a model matrix.
    pub fn from_model(model: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal: normal_matrix(model).to_cols_array_2d(),
        }
    }
}

impl Default for ObjectUniforms {
    fn default() -> Self {
        Self::from_model(Mat4::IDENTITY)
    }
}

/// Clay material uniform buffer data (set 2, binding 0).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub base_color: [f32; 4],
    pub clay_roughness: f32,
    pub dither_strength: f32,
    pub warmth_bias: f32,
    pub palette_index: i32,
    pub use_dithering: i32,
    pub use_affine_mapping: i32,
    pub _pad: [i32; 2],
}

impl MaterialUniforms {
    /// Base color as a vector.
    pub fn base_color(&self) -> Vec4 {
        Vec4::from_array(self.base_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn std140_sizes() {
        assert_eq!(size_of::<CameraUniforms>(), 144);
        assert_eq!(size_of::<LightUniforms>(), 144);
        assert_eq!(size_of::<ObjectUniforms>(), 128);
        assert_eq!(size_of::<MaterialUniforms>(), 48);
    }

    #[test]
    fn lights_are_capped() {
        let lights = (0..6).map(|i| (Vec3::splat(i as f32), 1.0, Vec3::ONE));
        let uniforms = LightUniforms::from_lights(lights);
        assert_eq!(uniforms.count, MAX_LIGHTS as i32);
        assert_eq!(uniforms.positions[3], [3.0, 3.0, 3.0, 1.0]);
    }

    #[test]
    fn light_intensity_in_w() {
        let uniforms =
            LightUniforms::from_lights([(Vec3::new(3.0, 4.0, 3.0), 1.5, Vec3::new(1.0, 0.65, 0.3))]);
        assert_eq!(uniforms.count, 1);
        assert_eq!(uniforms.positions[0], [3.0, 4.0, 3.0, 1.5]);
        assert_eq!(uniforms.colors[0], [1.0, 0.65, 0.3, 1.0]);
        assert_eq!(uniforms.positions[1], [0.0; 4]);
    }

    #[test]
    fn camera_position_is_widened() {
        let uniforms = CameraUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::new(0.0, 2.0, 5.0));
        assert_eq!(uniforms.position, [0.0, 2.0, 5.0, 1.0]);
    }

    #[test]
    fn object_identity_normal() {
        let uniforms = ObjectUniforms::default();
        assert_eq!(uniforms.model, Mat4::IDENTITY.to_cols_array_2d());
        assert_eq!(uniforms.normal, Mat4::IDENTITY.to_cols_array_2d());
    }
}
