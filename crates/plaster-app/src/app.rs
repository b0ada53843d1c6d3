//! `PlasterApp` trait definition.

use plaster_core::Extent2d;
use plaster_frame::SceneView;
use plaster_gpu::VulkanBackend;
use plaster_platform::WindowEvent;

use crate::context::AppContext;

/// Trait for Plaster applications.
///
/// The framework owns the window, the device and the frame loop. An
/// application supplies a scene each frame and reacts to input.
pub trait PlasterApp: Sized {
    /// Initialize the application.
    ///
    /// Called once after the window and renderer exist, so GPU meshes and
    /// materials can be created through [`AppContext::backend`].
    fn init(ctx: &mut AppContext) -> anyhow::Result<Self>;

    /// Update application state.
    ///
    /// Called every frame before rendering with the time in seconds since the
    /// previous frame.
    fn update(&mut self, ctx: &AppContext, dt: f32);

    /// The scene to draw this frame.
    fn scene(&self) -> &dyn SceneView<VulkanBackend>;

    /// Handle a change of the drawable extent.
    ///
    /// Called after the swapchain has been rebuilt. Default implementation
    /// does nothing.
    #[allow(unused_variables)]
    fn on_resize(&mut self, ctx: &mut AppContext, extent: Extent2d) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handle a window event.
    ///
    /// Return `true` if the event was handled and the framework should not
    /// act on it (Escape closes the window otherwise).
    #[allow(unused_variables)]
    fn on_event(&mut self, event: &WindowEvent) -> bool {
        false
    }

    /// Release resources before shutdown.
    ///
    /// The GPU is idle when this is called. Default implementation does
    /// nothing.
    #[allow(unused_variables)]
    fn cleanup(&mut self, ctx: &mut AppContext) {}
}
