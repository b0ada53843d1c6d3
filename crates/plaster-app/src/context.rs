//! Application context.

use std::time::Instant;

use plaster_core::Extent2d;
use plaster_frame::FrameOrchestrator;
use plaster_gpu::VulkanBackend;
use plaster_platform::{KeyboardState, WindowSurface};

/// Application context shared across all app methods.
pub struct AppContext {
    /// Frame core driving the Vulkan backend.
    // Declared before `surface`: the Vulkan surface must go before the window.
    pub renderer: FrameOrchestrator<VulkanBackend>,
    /// The window and its event state.
    pub surface: WindowSurface,
    /// Frames presented so far.
    pub frame_count: u64,
    started: Instant,
    last_frame_time: Instant,
}

impl AppContext {
    pub(crate) fn new(renderer: FrameOrchestrator<VulkanBackend>, surface: WindowSurface) -> Self {
        let now = Instant::now();
        Self {
            renderer,
            surface,
            frame_count: 0,
            started: now,
            last_frame_time: now,
        }
    }

    /// The Vulkan backend, for creating meshes and materials.
    pub const fn backend(&self) -> &VulkanBackend {
        self.renderer.backend()
    }

    pub const fn keyboard(&self) -> &KeyboardState {
        self.surface.keyboard()
    }

    /// Current swapchain extent.
    pub fn extent(&self) -> Extent2d {
        self.renderer.extent()
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.extent().aspect_ratio()
    }

    /// Seconds since the context was created.
    pub fn elapsed(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Leave the run loop after the current frame.
    pub fn request_exit(&mut self) {
        self.surface.request_close();
    }

    /// Seconds since the previous call.
    pub(crate) fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        dt
    }
}
