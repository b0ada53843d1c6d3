//! The device seam the frame core drives.
//!
//! Everything the orchestrator asks of the GPU goes through [`GpuBackend`].
//! The Vulkan implementation lives in `plaster-gpu`; a scripted fake lives in
//! [`crate::headless`].

use std::fmt::Debug;
use std::time::Duration;

use plaster_core::{CameraUniforms, Extent2d, LightUniforms, ObjectUniforms};

use crate::error::Result;
use crate::surface::{PresentMode, SurfaceFormat, SurfaceSupport};

/// Result of a bounded fence wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FenceStatus {
    Signaled,
    TimedOut,
}

/// Result of acquiring a swapchain image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired. `suboptimal` still allows rendering this frame.
    Acquired { image_index: u32, suboptimal: bool },
    /// The swapchain no longer matches the surface. No image was acquired and
    /// the semaphore was not signaled.
    OutOfDate,
}

/// Result of presenting an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    Suboptimal,
    OutOfDate,
}

impl PresentOutcome {
    /// Whether the swapchain should be rebuilt before the next frame.
    pub const fn needs_recreate(self) -> bool {
        !matches!(self, Self::Presented)
    }
}

/// Pipeline stage a submission waits at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStage {
    ColorAttachmentOutput,
}

/// Parameters of a swapchain build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub format: SurfaceFormat,
    pub present_mode: PresentMode,
    pub extent: Extent2d,
    pub min_image_count: u32,
}

/// One queue submission: wait, execute, signal.
pub struct Submission<B: GpuBackend + ?Sized> {
    pub command_buffer: B::CommandBuffer,
    pub wait_semaphore: B::Semaphore,
    pub wait_stage: WaitStage,
    pub signal_semaphore: B::Semaphore,
    /// Signaled by the device when the command buffer has finished executing.
    pub fence: B::Fence,
}

/// GPU device operations used by the frame core.
///
/// Handles are plain values; ownership and destruction order are tracked by
/// the frame core, not by the handle types. Destroy functions accept handles
/// that are no longer referenced by pending GPU work.
pub trait GpuBackend {
    type Fence: Copy + PartialEq + Debug;
    type Semaphore: Copy + Debug;
    type CommandBuffer: Copy + Debug;
    type Swapchain;
    type ImageView: Copy + Debug;
    type Framebuffer: Copy + Debug;
    type RenderPass: Copy + Debug;
    type Pipeline;
    /// Per-slot uniform buffers and the descriptor sets that point at them.
    type FrameResources;

    // Synchronization
    fn create_fence(&self, signaled: bool) -> Result<Self::Fence>;
    fn wait_for_fence(&self, fence: Self::Fence, timeout: Duration) -> Result<FenceStatus>;
    fn reset_fence(&self, fence: Self::Fence) -> Result<()>;
    fn destroy_fence(&self, fence: Self::Fence);
    fn create_semaphore(&self) -> Result<Self::Semaphore>;
    fn destroy_semaphore(&self, semaphore: Self::Semaphore);
    /// Block until the device has finished all submitted work.
    fn wait_idle(&self) -> Result<()>;

    // Command buffers
    fn allocate_command_buffer(&self) -> Result<Self::CommandBuffer>;
    fn free_command_buffer(&self, cmd: Self::CommandBuffer);
    fn reset_command_buffer(&self, cmd: Self::CommandBuffer) -> Result<()>;
    fn begin_command_buffer(&self, cmd: Self::CommandBuffer) -> Result<()>;
    fn end_command_buffer(&self, cmd: Self::CommandBuffer) -> Result<()>;

    // Recording
    fn cmd_begin_render_pass(
        &self,
        cmd: Self::CommandBuffer,
        render_pass: Self::RenderPass,
        framebuffer: Self::Framebuffer,
        extent: Extent2d,
        clear_color: [f32; 4],
    );
    fn cmd_end_render_pass(&self, cmd: Self::CommandBuffer);
    /// Bind the pipeline and set the dynamic viewport and scissor to `extent`.
    fn cmd_bind_pipeline(&self, cmd: Self::CommandBuffer, pipeline: &Self::Pipeline, extent: Extent2d);
    /// Bind the camera and light descriptors of a frame slot.
    fn cmd_bind_frame_resources(
        &self,
        cmd: Self::CommandBuffer,
        pipeline: &Self::Pipeline,
        resources: &Self::FrameResources,
    );
    /// Bind the object descriptor of a frame slot at `dynamic_offset`.
    fn cmd_bind_object(
        &self,
        cmd: Self::CommandBuffer,
        pipeline: &Self::Pipeline,
        resources: &Self::FrameResources,
        dynamic_offset: u32,
    );

    // Per-slot uniforms
    /// Alignment required between dynamic uniform buffer offsets.
    fn min_uniform_alignment(&self) -> u64;
    fn create_frame_resources(
        &self,
        object_capacity: usize,
        object_stride: u64,
    ) -> Result<Self::FrameResources>;
    fn write_frame_uniforms(
        &self,
        resources: &mut Self::FrameResources,
        camera: &CameraUniforms,
        lights: &LightUniforms,
    ) -> Result<()>;
    fn write_object_uniforms(
        &self,
        resources: &mut Self::FrameResources,
        offset: u64,
        object: &ObjectUniforms,
    ) -> Result<()>;
    fn destroy_frame_resources(&self, resources: Self::FrameResources);

    // Render pass and pipeline
    fn create_render_pass(&self, format: SurfaceFormat) -> Result<Self::RenderPass>;
    fn destroy_render_pass(&self, render_pass: Self::RenderPass);
    fn create_pipeline(&self, render_pass: Self::RenderPass) -> Result<Self::Pipeline>;
    fn destroy_pipeline(&self, pipeline: Self::Pipeline);

    // Queue
    fn submit(&self, submission: &Submission<Self>) -> Result<()>;

    // Swapchain
    fn surface_support(&self) -> Result<SurfaceSupport>;
    /// Create a swapchain. `old` is retired by the call but must still be
    /// destroyed by the caller.
    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: Option<&Self::Swapchain>,
    ) -> Result<Self::Swapchain>;
    fn swapchain_image_count(&self, swapchain: &Self::Swapchain) -> usize;
    fn create_image_view(&self, swapchain: &Self::Swapchain, index: usize) -> Result<Self::ImageView>;
    fn destroy_image_view(&self, view: Self::ImageView);
    fn create_framebuffer(
        &self,
        render_pass: Self::RenderPass,
        view: Self::ImageView,
        extent: Extent2d,
    ) -> Result<Self::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: Self::Framebuffer);
    fn destroy_swapchain(&self, swapchain: Self::Swapchain);
    /// Acquire the next image, signaling `signal` when it is ready.
    ///
    /// `None` waits indefinitely. An expired bound is
    /// [`FrameError::AcquireTimeout`](crate::FrameError::AcquireTimeout).
    fn acquire_next_image(
        &self,
        swapchain: &Self::Swapchain,
        signal: Self::Semaphore,
        timeout: Option<Duration>,
    ) -> Result<AcquireOutcome>;
    /// Queue `image_index` for presentation once `wait` is signaled.
    fn present(
        &self,
        swapchain: &Self::Swapchain,
        image_index: u32,
        wait: Self::Semaphore,
    ) -> Result<PresentOutcome>;
}
