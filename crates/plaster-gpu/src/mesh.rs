//! GPU-resident meshes and materials.

use crate::backend::VulkanBackend;
use crate::memory::GpuBuffer;
use ash::vk;
use plaster_frame::{BindMaterial, DrawMesh};

/// Descriptor set index of material uniforms.
pub const MATERIAL_SET: u32 = 2;

/// Vertex and index buffers of one mesh.
pub struct GpuMesh {
    pub vertex_buffer: GpuBuffer,
    pub index_buffer: GpuBuffer,
    pub index_count: u32,
}

impl DrawMesh<VulkanBackend> for GpuMesh {
    fn bind(&self, backend: &VulkanBackend, cmd: vk::CommandBuffer) {
        let device = backend.context().device();
        unsafe {
            device.cmd_bind_vertex_buffers(cmd, 0, &[self.vertex_buffer.buffer], &[0]);
            device.cmd_bind_index_buffer(cmd, self.index_buffer.buffer, 0, vk::IndexType::UINT32);
        }
    }

    fn draw(&self, backend: &VulkanBackend, cmd: vk::CommandBuffer) {
        unsafe {
            backend
                .context()
                .device()
                .cmd_draw_indexed(cmd, self.index_count, 1, 0, 0, 0);
        }
    }
}

/// Material uniform buffer and the descriptor set pointing at it.
pub struct GpuMaterial {
    pub uniforms: GpuBuffer,
    pub descriptor_set: vk::DescriptorSet,
}

impl BindMaterial<VulkanBackend> for GpuMaterial {
    fn bind(
        &self,
        backend: &VulkanBackend,
        cmd: vk::CommandBuffer,
        pipeline: &crate::pipeline::GraphicsPipeline,
    ) {
        unsafe {
            backend.context().device().cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout,
                MATERIAL_SET,
                &[self.descriptor_set],
                &[],
            );
        }
    }
}
