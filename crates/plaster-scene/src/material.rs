//! Clay material parameters and presets.

use glam::Vec4;
use plaster_core::MaterialUniforms;
use serde::{Deserialize, Serialize};

/// Color palette the fragment shader quantizes towards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Palette {
    #[default]
    MedievalDungeon = 0,
    AncientForest = 1,
    CursedMonastery = 2,
    PlagueVillage = 3,
    BloodRitual = 4,
}

impl Palette {
    /// Index of the palette in the shader's palette table.
    pub const fn index(self) -> i32 {
        self as i32
    }
}

/// Parameters of the PS1-style clay shading model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialParams {
    pub base_color: Vec4,
    pub clay_roughness: f32,
    pub dither_strength: f32,
    pub warmth_bias: f32,
    pub palette: Palette,
    pub use_dithering: bool,
    /// Affine (non perspective-correct) texture coordinates.
    pub use_affine_mapping: bool,
}

impl Default for MaterialParams {
    /// Clay tan.
    fn default() -> Self {
        Self {
            base_color: Vec4::new(0.8, 0.7, 0.6, 1.0),
            clay_roughness: 0.75,
            dither_strength: 0.8,
            warmth_bias: 0.3,
            palette: Palette::MedievalDungeon,
            use_dithering: true,
            use_affine_mapping: true,
        }
    }
}

impl MaterialParams {
    /// Dark brown stone.
    pub fn medieval_dungeon() -> Self {
        Self {
            base_color: Vec4::new(0.45, 0.38, 0.32, 1.0),
            clay_roughness: 0.85,
            dither_strength: 0.9,
            warmth_bias: 0.25,
            palette: Palette::MedievalDungeon,
            ..Self::default()
        }
    }

    /// Dark red.
    pub fn blood_ritual() -> Self {
        Self {
            base_color: Vec4::new(0.6, 0.15, 0.12, 1.0),
            clay_roughness: 0.8,
            dither_strength: 1.0,
            warmth_bias: 0.4,
            palette: Palette::BloodRitual,
            ..Self::default()
        }
    }

    /// Sickly yellow-green.
    pub fn plague_village() -> Self {
        Self {
            base_color: Vec4::new(0.55, 0.52, 0.35, 1.0),
            clay_roughness: 0.75,
            dither_strength: 0.85,
            warmth_bias: 0.2,
            palette: Palette::PlagueVillage,
            ..Self::default()
        }
    }

    /// Forest green.
    pub fn ancient_forest() -> Self {
        Self {
            base_color: Vec4::new(0.25, 0.4, 0.28, 1.0),
            clay_roughness: 0.8,
            dither_strength: 0.75,
            warmth_bias: 0.15,
            palette: Palette::AncientForest,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_base_color(mut self, base_color: Vec4) -> Self {
        self.base_color = base_color;
        self
    }

    /// Get material uniforms for GPU.
    pub fn uniforms(&self) -> MaterialUniforms {
        MaterialUniforms {
            base_color: self.base_color.to_array(),
            clay_roughness: self.clay_roughness,
            dither_strength: self.dither_strength,
            warmth_bias: self.warmth_bias,
            palette_index: self.palette.index(),
            use_dithering: i32::from(self.use_dithering),
            use_affine_mapping: i32::from(self.use_affine_mapping),
            _pad: [0; 2],
        }
    }
}
