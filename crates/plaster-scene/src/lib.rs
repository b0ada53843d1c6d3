//! Scene description for the Plaster engine.
//!
//! This crate provides the data the frame core consumes while recording:
//! - [`Camera`] and [`Transform`] math
//! - Point lights and the default lighting rig
//! - Clay material parameters and presets
//! - Mesh primitive generation (cube, sphere, plane)
//! - [`Scene`], an arena of meshes and materials referenced by handle
//!
//! The scene is generic over the mesh and material types so that GPU crates
//! can store their own uploaded resources in it.

pub mod camera;
pub mod error;
pub mod light;
pub mod material;
pub mod primitives;
pub mod scene;
pub mod transform;

pub use camera::Camera;
pub use error::{Result, SceneError};
pub use light::{LightSet, PointLight};
pub use material::{MaterialParams, Palette};
pub use primitives::{MeshData, Vertex};
pub use scene::{MaterialId, MeshId, ObjectId, RenderObject, Scene};
pub use transform::Transform;
