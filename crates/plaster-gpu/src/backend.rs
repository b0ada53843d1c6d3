//! [`GpuBackend`] implementation on Vulkan.

use crate::command::{self, CommandPool};
use crate::context::DeviceContext;
use crate::descriptors::{write_uniform_buffer, DescriptorPool, DescriptorSetLayoutBuilder};
use crate::error::{GpuError, Result as GpuResult};
use crate::memory::GpuBuffer;
use crate::mesh::{GpuMaterial, GpuMesh};
use crate::pipeline::{GraphicsPipeline, GraphicsPipelineConfig};
use crate::render_pass;
use crate::surface::{extent_to_vk, pixel_format_to_vk};
use crate::swapchain::VulkanSwapchain;
use crate::sync;
use ash::vk;
use gpu_allocator::MemoryLocation;
use plaster_core::{CameraUniforms, Extent2d, LightUniforms, MaterialUniforms, ObjectUniforms};
use plaster_frame::{
    AcquireOutcome, FenceStatus, FrameError, GpuBackend, PresentOutcome, Result, Submission,
    SurfaceFormat, SurfaceSupport, SwapchainDesc, WaitStage,
};
use plaster_scene::{MaterialParams, MeshData};
use std::mem::size_of;
use std::time::Duration;
use tracing::{debug, warn};

/// Descriptor set of per-frame camera and light uniforms.
pub const FRAME_SET: u32 = 0;
/// Descriptor set of the per-object dynamic uniform buffer.
pub const OBJECT_SET: u32 = 1;

/// Upper bound on frame slots served by the descriptor pool.
pub const MAX_FRAME_SLOTS: u32 = 8;
/// Upper bound on live materials served by the descriptor pool.
pub const MAX_MATERIALS: u32 = 128;

/// SPIR-V for the clay pipeline.
#[derive(Clone, Debug, Default)]
pub struct ShaderCode {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

/// Uniform buffers and descriptor sets owned by one frame slot.
pub struct VulkanFrameResources {
    pub camera: GpuBuffer,
    pub lights: GpuBuffer,
    pub objects: GpuBuffer,
    pub frame_set: vk::DescriptorSet,
    pub object_set: vk::DescriptorSet,
    pub object_capacity: usize,
    pub object_stride: u64,
}

/// Descriptor set layouts, in set order.
#[derive(Clone, Copy)]
struct SetLayouts {
    frame: vk::DescriptorSetLayout,
    object: vk::DescriptorSetLayout,
    material: vk::DescriptorSetLayout,
}

impl SetLayouts {
    unsafe fn new(device: &ash::Device) -> GpuResult<Self> {
        let stages = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
        let frame = DescriptorSetLayoutBuilder::new()
            .uniform_buffer(0, stages)
            .uniform_buffer(1, stages)
            .build(device)?;
        let object = match DescriptorSetLayoutBuilder::new()
            .uniform_buffer_dynamic(0, stages)
            .build(device)
        {
            Ok(layout) => layout,
            Err(e) => {
                device.destroy_descriptor_set_layout(frame, None);
                return Err(e);
            }
        };
        let material = match DescriptorSetLayoutBuilder::new()
            .uniform_buffer(0, vk::ShaderStageFlags::FRAGMENT)
            .build(device)
        {
            Ok(layout) => layout,
            Err(e) => {
                device.destroy_descriptor_set_layout(object, None);
                device.destroy_descriptor_set_layout(frame, None);
                return Err(e);
            }
        };
        Ok(Self {
            frame,
            object,
            material,
        })
    }

    const fn as_array(self) -> [vk::DescriptorSetLayout; 3] {
        [self.frame, self.object, self.material]
    }

    unsafe fn destroy(self, device: &ash::Device) {
        for layout in self.as_array().into_iter().rev() {
            device.destroy_descriptor_set_layout(layout, None);
        }
    }
}

/// Vulkan device driven by the frame core.
///
/// Owns the device context plus the objects that live as long as the device:
/// command pool, descriptor pool, set layouts and the pipeline layout.
pub struct VulkanBackend {
    command_pool: CommandPool,
    descriptor_pool: DescriptorPool,
    set_layouts: SetLayouts,
    pipeline_layout: vk::PipelineLayout,
    shaders: ShaderCode,
    // Dropped last.
    context: DeviceContext,
}

impl VulkanBackend {
    /// Create the device-lifetime objects on `context`.
    pub fn new(context: DeviceContext, shaders: ShaderCode) -> GpuResult<Self> {
        let device = context.device();

        let command_pool = unsafe { CommandPool::new(device, context.queue_family()) }?;

        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: MAX_FRAME_SLOTS * 2 + MAX_MATERIALS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                descriptor_count: MAX_FRAME_SLOTS,
            },
        ];
        let descriptor_pool =
            match unsafe { DescriptorPool::new(device, MAX_FRAME_SLOTS * 2 + MAX_MATERIALS, &pool_sizes) } {
                Ok(pool) => pool,
                Err(e) => {
                    unsafe { command_pool.destroy(device) };
                    return Err(e);
                }
            };

        let set_layouts = match unsafe { SetLayouts::new(device) } {
            Ok(layouts) => layouts,
            Err(e) => {
                unsafe {
                    descriptor_pool.destroy(device);
                    command_pool.destroy(device);
                }
                return Err(e);
            }
        };

        let layouts = set_layouts.as_array();
        let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&layouts);
        let pipeline_layout = match unsafe { device.create_pipeline_layout(&layout_info, None) } {
            Ok(layout) => layout,
            Err(e) => {
                unsafe {
                    set_layouts.destroy(device);
                    descriptor_pool.destroy(device);
                    command_pool.destroy(device);
                }
                return Err(GpuError::PipelineCreation(e.to_string()));
            }
        };

        Ok(Self {
            command_pool,
            descriptor_pool,
            set_layouts,
            pipeline_layout,
            shaders,
            context,
        })
    }

    pub const fn context(&self) -> &DeviceContext {
        &self.context
    }

    fn device(&self) -> &ash::Device {
        self.context.device()
    }

    fn create_host_buffer(
        &self,
        size: u64,
        usage: vk::BufferUsageFlags,
        name: &str,
    ) -> GpuResult<GpuBuffer> {
        self.context
            .allocator()
            .lock()
            .create_buffer(size, usage, MemoryLocation::CpuToGpu, name)
    }

    fn free_buffer(&self, buffer: &mut GpuBuffer) {
        if let Err(e) = self.context.allocator().lock().free_buffer(buffer) {
            warn!("Failed to free GPU buffer: {e}");
        }
    }

    fn free_sets(&self, sets: &[vk::DescriptorSet]) {
        if let Err(e) = unsafe { self.descriptor_pool.free(self.device(), sets) } {
            warn!("Failed to free descriptor sets: {e}");
        }
    }

    /// Upload mesh data into host-visible vertex and index buffers.
    pub fn create_mesh(&self, mesh: &MeshData) -> GpuResult<GpuMesh> {
        let vertex_bytes = std::mem::size_of_val(mesh.vertices.as_slice()) as u64;
        let index_bytes = std::mem::size_of_val(mesh.indices.as_slice()) as u64;
        if vertex_bytes == 0 || index_bytes == 0 {
            return Err(GpuError::InvalidState("Mesh has no geometry".to_string()));
        }

        let mut vertex_buffer =
            self.create_host_buffer(vertex_bytes, vk::BufferUsageFlags::VERTEX_BUFFER, "mesh vertices")?;
        let mut index_buffer = match self.create_host_buffer(
            index_bytes,
            vk::BufferUsageFlags::INDEX_BUFFER,
            "mesh indices",
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.free_buffer(&mut vertex_buffer);
                return Err(e);
            }
        };

        let written = vertex_buffer
            .write_pod(0, &mesh.vertices)
            .and_then(|()| index_buffer.write_pod(0, &mesh.indices));
        if let Err(e) = written {
            self.free_buffer(&mut index_buffer);
            self.free_buffer(&mut vertex_buffer);
            return Err(e);
        }

        Ok(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
        })
    }

    /// Destroy a mesh. It must not be referenced by pending GPU work.
    pub fn destroy_mesh(&self, mut mesh: GpuMesh) {
        self.free_buffer(&mut mesh.index_buffer);
        self.free_buffer(&mut mesh.vertex_buffer);
    }

    /// Create a material uniform buffer and its descriptor set.
    pub fn create_material(&self, params: &MaterialParams) -> GpuResult<GpuMaterial> {
        let size = size_of::<MaterialUniforms>() as u64;
        let mut uniforms =
            self.create_host_buffer(size, vk::BufferUsageFlags::UNIFORM_BUFFER, "material")?;
        if let Err(e) = uniforms.write_pod(0, &[params.uniforms()]) {
            self.free_buffer(&mut uniforms);
            return Err(e);
        }

        let descriptor_set = match unsafe {
            self.descriptor_pool
                .allocate(self.device(), &[self.set_layouts.material])
        }
        .and_then(|sets| {
            sets.first()
                .copied()
                .ok_or_else(|| GpuError::InvalidState("No descriptor set allocated".to_string()))
        }) {
            Ok(set) => set,
            Err(e) => {
                self.free_buffer(&mut uniforms);
                return Err(e);
            }
        };

        unsafe {
            write_uniform_buffer(
                self.device(),
                descriptor_set,
                0,
                vk::DescriptorType::UNIFORM_BUFFER,
                uniforms.buffer,
                size,
            );
        }

        Ok(GpuMaterial {
            uniforms,
            descriptor_set,
        })
    }

    /// Destroy a material. It must not be referenced by pending GPU work.
    pub fn destroy_material(&self, mut material: GpuMaterial) {
        self.free_sets(&[material.descriptor_set]);
        self.free_buffer(&mut material.uniforms);
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        let device = self.context.device();
        unsafe {
            let _ = device.device_wait_idle();
            device.destroy_pipeline_layout(self.pipeline_layout, None);
            self.set_layouts.destroy(device);
            self.descriptor_pool.destroy(device);
            self.command_pool.destroy(device);
        }
    }
}

const fn stage_to_vk(stage: WaitStage) -> vk::PipelineStageFlags {
    match stage {
        WaitStage::ColorAttachmentOutput => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
    }
}

impl GpuBackend for VulkanBackend {
    type Fence = vk::Fence;
    type Semaphore = vk::Semaphore;
    type CommandBuffer = vk::CommandBuffer;
    type Swapchain = VulkanSwapchain;
    type ImageView = vk::ImageView;
    type Framebuffer = vk::Framebuffer;
    type RenderPass = vk::RenderPass;
    type Pipeline = GraphicsPipeline;
    type FrameResources = VulkanFrameResources;

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        Ok(unsafe { sync::create_fence(self.device(), signaled) }?)
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout: Duration) -> Result<FenceStatus> {
        Ok(unsafe { sync::wait_for_fence(self.device(), fence, timeout) }?)
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        Ok(unsafe { sync::reset_fence(self.device(), fence) }?)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.device().destroy_fence(fence, None) };
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        Ok(unsafe { sync::create_semaphore(self.device()) }?)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.device().destroy_semaphore(semaphore, None) };
    }

    fn wait_idle(&self) -> Result<()> {
        Ok(self.context.wait_idle()?)
    }

    fn allocate_command_buffer(&self) -> Result<vk::CommandBuffer> {
        Ok(unsafe { self.command_pool.allocate(self.device()) }?)
    }

    fn free_command_buffer(&self, cmd: vk::CommandBuffer) {
        unsafe { self.command_pool.free(self.device(), cmd) };
    }

    fn reset_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        unsafe {
            self.device()
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(GpuError::from)?;
        }
        Ok(())
    }

    fn begin_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        Ok(unsafe { command::begin_command_buffer(self.device(), cmd) }?)
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        Ok(unsafe { command::end_command_buffer(self.device(), cmd) }?)
    }

    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: Extent2d,
        clear_color: [f32; 4],
    ) {
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        }];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: extent_to_vk(extent),
            })
            .clear_values(&clear_values);

        unsafe {
            self.device()
                .cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);
        }
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        unsafe { self.device().cmd_end_render_pass(cmd) };
    }

    #[allow(clippy::cast_precision_loss)]
    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: &GraphicsPipeline, extent: Extent2d) {
        let device = self.device();
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent: extent_to_vk(extent),
        };

        unsafe {
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline.pipeline);
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(cmd, 0, &[scissor]);
        }
    }

    fn cmd_bind_frame_resources(
        &self,
        cmd: vk::CommandBuffer,
        pipeline: &GraphicsPipeline,
        resources: &VulkanFrameResources,
    ) {
        unsafe {
            self.device().cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout,
                FRAME_SET,
                &[resources.frame_set],
                &[],
            );
        }
    }

    fn cmd_bind_object(
        &self,
        cmd: vk::CommandBuffer,
        pipeline: &GraphicsPipeline,
        resources: &VulkanFrameResources,
        dynamic_offset: u32,
    ) {
        unsafe {
            self.device().cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                pipeline.layout,
                OBJECT_SET,
                &[resources.object_set],
                &[dynamic_offset],
            );
        }
    }

    fn min_uniform_alignment(&self) -> u64 {
        self.context
            .capabilities()
            .min_uniform_buffer_offset_alignment
            .max(1)
    }

    fn create_frame_resources(
        &self,
        object_capacity: usize,
        object_stride: u64,
    ) -> Result<VulkanFrameResources> {
        let usage = vk::BufferUsageFlags::UNIFORM_BUFFER;
        let object_bytes = object_stride
            .checked_mul(object_capacity as u64)
            .ok_or_else(|| FrameError::InvalidState("object buffer size overflows".to_string()))?;

        let mut camera =
            self.create_host_buffer(size_of::<CameraUniforms>() as u64, usage, "frame camera")?;
        let mut lights =
            match self.create_host_buffer(size_of::<LightUniforms>() as u64, usage, "frame lights") {
                Ok(buffer) => buffer,
                Err(e) => {
                    self.free_buffer(&mut camera);
                    return Err(e.into());
                }
            };
        let mut objects = match self.create_host_buffer(object_bytes, usage, "frame objects") {
            Ok(buffer) => buffer,
            Err(e) => {
                self.free_buffer(&mut lights);
                self.free_buffer(&mut camera);
                return Err(e.into());
            }
        };

        let sets = unsafe {
            self.descriptor_pool
                .allocate(self.device(), &[self.set_layouts.frame, self.set_layouts.object])
        }
        .and_then(|sets| match sets.as_slice() {
            [frame, object] => Ok((*frame, *object)),
            _ => Err(GpuError::InvalidState(
                "Descriptor set allocation returned wrong count".to_string(),
            )),
        });
        let (frame_set, object_set) = match sets {
            Ok(pair) => pair,
            Err(e) => {
                self.free_buffer(&mut objects);
                self.free_buffer(&mut lights);
                self.free_buffer(&mut camera);
                return Err(e.into());
            }
        };

        unsafe {
            let device = self.device();
            let ubo = vk::DescriptorType::UNIFORM_BUFFER;
            write_uniform_buffer(device, frame_set, 0, ubo, camera.buffer, camera.size);
            write_uniform_buffer(device, frame_set, 1, ubo, lights.buffer, lights.size);
            write_uniform_buffer(
                device,
                object_set,
                0,
                vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                objects.buffer,
                size_of::<ObjectUniforms>() as u64,
            );
        }

        debug!("Frame resources: {object_capacity} objects with stride {object_stride}");
        Ok(VulkanFrameResources {
            camera,
            lights,
            objects,
            frame_set,
            object_set,
            object_capacity,
            object_stride,
        })
    }

    fn write_frame_uniforms(
        &self,
        resources: &mut VulkanFrameResources,
        camera: &CameraUniforms,
        lights: &LightUniforms,
    ) -> Result<()> {
        resources.camera.write_pod(0, std::slice::from_ref(camera))?;
        resources.lights.write_pod(0, std::slice::from_ref(lights))?;
        Ok(())
    }

    fn write_object_uniforms(
        &self,
        resources: &mut VulkanFrameResources,
        offset: u64,
        object: &ObjectUniforms,
    ) -> Result<()> {
        Ok(resources.objects.write_pod(offset, std::slice::from_ref(object))?)
    }

    fn destroy_frame_resources(&self, mut resources: VulkanFrameResources) {
        self.free_sets(&[resources.frame_set, resources.object_set]);
        self.free_buffer(&mut resources.objects);
        self.free_buffer(&mut resources.lights);
        self.free_buffer(&mut resources.camera);
    }

    fn create_render_pass(&self, format: SurfaceFormat) -> Result<vk::RenderPass> {
        Ok(unsafe { render_pass::create_render_pass(self.device(), pixel_format_to_vk(format.format)) }?)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.device().destroy_render_pass(render_pass, None) };
    }

    fn create_pipeline(&self, render_pass: vk::RenderPass) -> Result<GraphicsPipeline> {
        let config = GraphicsPipelineConfig::new(&self.shaders.vertex, &self.shaders.fragment);
        Ok(unsafe { GraphicsPipeline::new(self.device(), &config, render_pass, self.pipeline_layout) }?)
    }

    fn destroy_pipeline(&self, pipeline: GraphicsPipeline) {
        unsafe { pipeline.destroy(self.device()) };
    }

    fn submit(&self, submission: &Submission<Self>) -> Result<()> {
        Ok(unsafe {
            command::submit_command_buffer(
                self.device(),
                self.context.queue(),
                submission.command_buffer,
                submission.wait_semaphore,
                stage_to_vk(submission.wait_stage),
                submission.signal_semaphore,
                submission.fence,
            )
        }?)
    }

    fn surface_support(&self) -> Result<SurfaceSupport> {
        Ok(unsafe { self.context.surface().support(self.context.physical_device()) }?)
    }

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: Option<&VulkanSwapchain>,
    ) -> Result<VulkanSwapchain> {
        let surface = self.context.surface();
        let caps = unsafe { surface.raw_capabilities(self.context.physical_device()) }?;
        Ok(unsafe {
            VulkanSwapchain::new(
                surface.swapchain_loader()?,
                surface.surface,
                caps.current_transform,
                desc,
                old.map(|sc| sc.swapchain),
            )
        }?)
    }

    fn swapchain_image_count(&self, swapchain: &VulkanSwapchain) -> usize {
        swapchain.images.len()
    }

    fn create_image_view(&self, swapchain: &VulkanSwapchain, index: usize) -> Result<vk::ImageView> {
        Ok(unsafe { swapchain.create_image_view(self.device(), index) }?)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.device().destroy_image_view(view, None) };
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: Extent2d,
    ) -> Result<vk::Framebuffer> {
        Ok(unsafe {
            render_pass::create_framebuffer(self.device(), render_pass, view, extent_to_vk(extent))
        }?)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.device().destroy_framebuffer(framebuffer, None) };
    }

    fn destroy_swapchain(&self, swapchain: VulkanSwapchain) {
        match self.context.surface().swapchain_loader() {
            Ok(loader) => unsafe { swapchain.destroy(loader) },
            Err(e) => warn!("Cannot destroy swapchain: {e}"),
        }
    }

    fn acquire_next_image(
        &self,
        swapchain: &VulkanSwapchain,
        signal: vk::Semaphore,
        timeout: Option<Duration>,
    ) -> Result<AcquireOutcome> {
        let loader = self.context.surface().swapchain_loader()?;
        match unsafe { swapchain.acquire_next_image(loader, signal, sync::timeout_ns(timeout)) } {
            Ok(outcome) => Ok(outcome),
            Err(GpuError::Vulkan(vk::Result::TIMEOUT | vk::Result::NOT_READY)) => {
                Err(FrameError::AcquireTimeout(timeout.unwrap_or_default()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn present(
        &self,
        swapchain: &VulkanSwapchain,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> Result<PresentOutcome> {
        let loader = self.context.surface().swapchain_loader()?;
        Ok(unsafe { swapchain.present(loader, self.context.queue(), image_index, wait) }?)
    }
}
