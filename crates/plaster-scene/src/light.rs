//! Point lights.

use glam::Vec3;
use plaster_core::constants::MAX_LIGHTS;
use plaster_core::LightUniforms;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};

/// A point light.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub position: Vec3,
    pub intensity: f32,
    pub color: Vec3,
}

impl PointLight {
    pub const fn new(position: Vec3, intensity: f32, color: Vec3) -> Self {
        Self {
            position,
            intensity,
            color,
        }
    }
}

/// Up to [`MAX_LIGHTS`] point lights.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LightSet {
    lights: Vec<PointLight>,
}

impl LightSet {
    /// Create an empty light set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Warm key light plus a dim cool fill light.
    pub fn default_rig() -> Self {
        Self {
            lights: vec![
                PointLight::new(Vec3::new(3.0, 4.0, 3.0), 1.5, Vec3::new(1.0, 0.65, 0.3)),
                PointLight::new(Vec3::new(-2.0, 2.0, -2.0), 0.4, Vec3::new(0.5, 0.55, 0.6)),
            ],
        }
    }

    /// Add a light. Fails once [`MAX_LIGHTS`] lights are present.
    pub fn push(&mut self, light: PointLight) -> Result<usize> {
        if self.lights.len() >= MAX_LIGHTS {
            return Err(SceneError::LightsFull(MAX_LIGHTS));
        }
        self.lights.push(light);
        Ok(self.lights.len() - 1)
    }

    /// Remove the light at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<PointLight> {
        (index < self.lights.len()).then(|| self.lights.remove(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PointLight> {
        self.lights.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointLight> {
        self.lights.iter()
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    /// Get light uniforms for GPU.
    pub fn uniforms(&self) -> LightUniforms {
        LightUniforms::from_lights(self.lights.iter().map(|l| (l.position, l.intensity, l.color)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rig_has_key_and_fill() {
        let rig = LightSet::default_rig();
        assert_eq!(rig.len(), 2);
        let uniforms = rig.uniforms();
        assert_eq!(uniforms.count, 2);
        assert_eq!(uniforms.positions[0], [3.0, 4.0, 3.0, 1.5]);
        assert_eq!(uniforms.positions[1], [-2.0, 2.0, -2.0, 0.4]);
    }

    #[test]
    fn push_until_full() {
        let mut lights = LightSet::new();
        for i in 0..MAX_LIGHTS {
            assert_eq!(lights.push(PointLight::new(Vec3::ZERO, 1.0, Vec3::ONE)), Ok(i));
        }
        assert_eq!(
            lights.push(PointLight::new(Vec3::ZERO, 1.0, Vec3::ONE)),
            Err(SceneError::LightsFull(MAX_LIGHTS))
        );
    }

    #[test]
    fn remove_out_of_range() {
        let mut lights = LightSet::default_rig();
        assert!(lights.remove(5).is_none());
        assert!(lights.remove(0).is_some());
        assert_eq!(lights.len(), 1);
    }
}
