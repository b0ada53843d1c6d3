//! Scene arena.
//!
//! Meshes and materials live in slot maps and are referenced by handle, so a
//! render object never owns or aliases GPU resources.

use slotmap::{new_key_type, SlotMap};

use crate::camera::Camera;
use crate::error::{Result, SceneError};
use crate::light::LightSet;
use crate::transform::Transform;

new_key_type! { pub struct MeshId; }
new_key_type! { pub struct MaterialId; }
new_key_type! { pub struct ObjectId; }

/// A drawable instance of a mesh with a material.
#[derive(Clone, Debug)]
pub struct RenderObject {
    pub name: String,
    pub mesh: MeshId,
    pub material: MaterialId,
    pub transform: Transform,
    pub visible: bool,
}

impl RenderObject {
    pub fn new(name: impl Into<String>, mesh: MeshId, material: MaterialId) -> Self {
        Self {
            name: name.into(),
            mesh,
            material,
            transform: Transform::default(),
            visible: true,
        }
    }

    #[must_use]
    pub const fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

/// Scene of render objects over mesh type `M` and material type `T`.
pub struct Scene<M, T> {
    meshes: SlotMap<MeshId, M>,
    materials: SlotMap<MaterialId, T>,
    objects: SlotMap<ObjectId, RenderObject>,
    /// Insertion order of `objects`, which is the draw order.
    order: Vec<ObjectId>,
    pub camera: Camera,
    pub lights: LightSet,
}

impl<M, T> Default for Scene<M, T> {
    fn default() -> Self {
        Self {
            meshes: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            objects: SlotMap::with_key(),
            order: Vec::new(),
            camera: Camera::default(),
            lights: LightSet::default_rig(),
        }
    }
}

impl<M, T> Scene<M, T> {
    /// Create an empty scene with the default camera and lighting rig.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: M) -> MeshId {
        self.meshes.insert(mesh)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&M> {
        self.meshes.get(id)
    }

    /// Remove a mesh that no object references.
    pub fn remove_mesh(&mut self, id: MeshId) -> Result<M> {
        let users = self.objects.values().filter(|o| o.mesh == id).count();
        if users > 0 {
            return Err(SceneError::MeshInUse(users));
        }
        self.meshes.remove(id).ok_or(SceneError::UnknownMesh)
    }

    pub fn add_material(&mut self, material: T) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn material(&self, id: MaterialId) -> Option<&T> {
        self.materials.get(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut T> {
        self.materials.get_mut(id)
    }

    /// Remove a material that no object references.
    pub fn remove_material(&mut self, id: MaterialId) -> Result<T> {
        let users = self.objects.values().filter(|o| o.material == id).count();
        if users > 0 {
            return Err(SceneError::MaterialInUse(users));
        }
        self.materials.remove(id).ok_or(SceneError::UnknownMaterial)
    }

    /// Add an object. Its mesh and material handles must be live.
    pub fn add_object(&mut self, object: RenderObject) -> Result<ObjectId> {
        if !self.meshes.contains_key(object.mesh) {
            return Err(SceneError::UnknownMesh);
        }
        if !self.materials.contains_key(object.material) {
            return Err(SceneError::UnknownMaterial);
        }
        let id = self.objects.insert(object);
        self.order.push(id);
        Ok(id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<RenderObject> {
        let object = self.objects.remove(id)?;
        self.order.retain(|&o| o != id);
        Some(object)
    }

    pub fn object(&self, id: ObjectId) -> Option<&RenderObject> {
        self.objects.get(id)
    }

    /// Mutable access to an object's transform. Handles stay fixed after insertion.
    pub fn transform_mut(&mut self, id: ObjectId) -> Option<&mut Transform> {
        self.objects.get_mut(id).map(|o| &mut o.transform)
    }

    /// Point an object at another live material.
    pub fn set_material(&mut self, id: ObjectId, material: MaterialId) -> Result<()> {
        if !self.materials.contains_key(material) {
            return Err(SceneError::UnknownMaterial);
        }
        if let Some(object) = self.objects.get_mut(id) {
            object.material = material;
        }
        Ok(())
    }

    pub fn set_visible(&mut self, id: ObjectId, visible: bool) {
        if let Some(object) = self.objects.get_mut(id) {
            object.visible = visible;
        }
    }

    /// Objects in insertion order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &RenderObject)> {
        self.order.iter().filter_map(|&id| self.objects.get(id).map(|o| (id, o)))
    }

    /// Visible objects with their resolved mesh and material, in draw order.
    pub fn draw_list(&self) -> impl Iterator<Item = (&RenderObject, &M, &T)> {
        self.order.iter().filter_map(|&id| {
            let object = self.objects.get(id).filter(|o| o.visible)?;
            Some((object, self.meshes.get(object.mesh)?, self.materials.get(object.material)?))
        })
    }

    pub fn object_count(&self) -> usize {
        self.order.len()
    }

    /// Remove every object and hand back all meshes and materials.
    ///
    /// Used at shutdown so GPU resources can be released explicitly.
    pub fn drain(&mut self) -> (Vec<M>, Vec<T>) {
        self.objects.clear();
        self.order.clear();
        let meshes = self.meshes.drain().map(|(_, m)| m).collect();
        let materials = self.materials.drain().map(|(_, t)| t).collect();
        (meshes, materials)
    }
}
