//! What the orchestrator reads from a scene while recording.

use glam::Mat4;
use plaster_core::{CameraUniforms, LightUniforms};
use plaster_scene::Scene;

use crate::backend::GpuBackend;

/// A mesh that can record its own bind and draw commands.
pub trait DrawMesh<B: GpuBackend> {
    /// Bind vertex and index buffers.
    fn bind(&self, backend: &B, cmd: B::CommandBuffer);
    /// Record an indexed draw of the whole mesh.
    fn draw(&self, backend: &B, cmd: B::CommandBuffer);
}

/// A material that can bind its descriptor set.
pub trait BindMaterial<B: GpuBackend> {
    fn bind(&self, backend: &B, cmd: B::CommandBuffer, pipeline: &B::Pipeline);
}

/// One object to draw this frame.
pub struct RenderObjectView<'a, B: GpuBackend> {
    pub model: Mat4,
    pub mesh: &'a dyn DrawMesh<B>,
    pub material: &'a dyn BindMaterial<B>,
}

/// Read-only view of the scene consumed by `render_frame`.
pub trait SceneView<B: GpuBackend> {
    fn camera(&self) -> CameraUniforms;
    fn lights(&self) -> LightUniforms;
    /// Visible objects in draw order.
    fn objects(&self) -> Vec<RenderObjectView<'_, B>>;
}

impl<B, M, T> SceneView<B> for Scene<M, T>
where
    B: GpuBackend,
    M: DrawMesh<B>,
    T: BindMaterial<B>,
{
    fn camera(&self) -> CameraUniforms {
        self.camera.uniforms()
    }

    fn lights(&self) -> LightUniforms {
        self.lights.uniforms()
    }

    fn objects(&self) -> Vec<RenderObjectView<'_, B>> {
        self.draw_list()
            .map(|(object, mesh, material)| RenderObjectView {
                model: object.transform.model_matrix(),
                mesh: mesh as &dyn DrawMesh<B>,
                material: material as &dyn BindMaterial<B>,
            })
            .collect()
    }
}
