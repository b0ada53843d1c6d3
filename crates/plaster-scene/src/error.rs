//! Scene error types.

use thiserror::Error;

/// Scene-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Mesh handle does not refer to a live mesh.
    #[error("Unknown mesh handle")]
    UnknownMesh,

    /// Material handle does not refer to a live material.
    #[error("Unknown material handle")]
    UnknownMaterial,

    /// Mesh is still referenced by a render object.
    #[error("Mesh is still used by {0} object(s)")]
    MeshInUse(usize),

    /// Material is still referenced by a render object.
    #[error("Material is still used by {0} object(s)")]
    MaterialInUse(usize),

    /// No room for another light.
    #[error("Light set is full ({0} lights)")]
    LightsFull(usize),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, SceneError>;
