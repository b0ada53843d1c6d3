//! Core value types for the Plaster engine.
//!
//! This crate provides the foundational types shared by every other crate:
//! - Surface and image extents
//! - GPU uniform buffer layouts (camera, lights, objects, materials)
//! - Alignment and matrix helpers
//! - Engine-wide constants

pub mod extent;
pub mod math;
pub mod uniforms;

pub use extent::Extent2d;
pub use uniforms::{CameraUniforms, LightUniforms, MaterialUniforms, ObjectUniforms};

/// Engine-wide constants
pub mod constants {
    /// Number of frames the CPU may record ahead of the GPU
    pub const FRAMES_IN_FLIGHT: usize = 2;
    /// Maximum number of point lights in a light uniform block
    pub const MAX_LIGHTS: usize = 4;
    /// Default capacity of the per-frame object uniform buffer
    pub const DEFAULT_MAX_OBJECTS: usize = 256;
}
