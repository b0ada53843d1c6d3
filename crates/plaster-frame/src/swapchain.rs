//! Swapchain management.

use std::time::Duration;

use plaster_core::Extent2d;
use tracing::{debug, info};

use crate::backend::{AcquireOutcome, GpuBackend, PresentOutcome, SwapchainDesc};
use crate::error::{FrameError, Result};
use crate::surface::{
    select_extent, select_image_count, select_present_mode, select_surface_format, PresentMode,
    SurfaceFormat, SurfaceSupport,
};

/// A built swapchain with one image view and framebuffer per image.
pub struct SwapchainState<B: GpuBackend> {
    swapchain: B::Swapchain,
    image_views: Vec<B::ImageView>,
    framebuffers: Vec<B::Framebuffer>,
    extent: Extent2d,
    format: SurfaceFormat,
    present_mode: PresentMode,
}

impl<B: GpuBackend> SwapchainState<B> {
    /// Build a swapchain and its per-image objects.
    ///
    /// On failure every object created by this call is destroyed. `old` is
    /// never destroyed here.
    fn build(
        backend: &B,
        desc: &SwapchainDesc,
        render_pass: B::RenderPass,
        old: Option<&B::Swapchain>,
    ) -> Result<Self> {
        let swapchain = backend.create_swapchain(desc, old)?;
        let image_count = backend.swapchain_image_count(&swapchain);

        let mut image_views = Vec::with_capacity(image_count);
        let mut framebuffers = Vec::with_capacity(image_count);
        let created = (0..image_count).try_for_each(|index| {
            let view = backend.create_image_view(&swapchain, index)?;
            image_views.push(view);
            framebuffers.push(backend.create_framebuffer(render_pass, view, desc.extent)?);
            Ok::<_, FrameError>(())
        });

        if let Err(e) = created {
            for framebuffer in framebuffers {
                backend.destroy_framebuffer(framebuffer);
            }
            for view in image_views {
                backend.destroy_image_view(view);
            }
            backend.destroy_swapchain(swapchain);
            return Err(e);
        }

        Ok(Self {
            swapchain,
            image_views,
            framebuffers,
            extent: desc.extent,
            format: desc.format,
            present_mode: desc.present_mode,
        })
    }

    fn destroy(self, backend: &B) {
        for framebuffer in self.framebuffers {
            backend.destroy_framebuffer(framebuffer);
        }
        for view in self.image_views {
            backend.destroy_image_view(view);
        }
        backend.destroy_swapchain(self.swapchain);
    }

    pub fn handle(&self) -> &B::Swapchain {
        &self.swapchain
    }

    pub fn image_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn framebuffer(&self, image_index: u32) -> Option<B::Framebuffer> {
        self.framebuffers.get(image_index as usize).copied()
    }

    pub const fn extent(&self) -> Extent2d {
        self.extent
    }

    pub const fn format(&self) -> SurfaceFormat {
        self.format
    }

    pub const fn present_mode(&self) -> PresentMode {
        self.present_mode
    }
}

/// Owns the current swapchain and rebuilds it atomically.
///
/// The surface format is chosen once and kept for every rebuild, since the
/// render pass and pipeline are built against it.
pub struct SwapchainManager<B: GpuBackend> {
    state: Option<SwapchainState<B>>,
    format: Option<SurfaceFormat>,
    vsync: bool,
}

impl<B: GpuBackend> SwapchainManager<B> {
    pub const fn new(vsync: bool) -> Self {
        Self {
            state: None,
            format: None,
            vsync,
        }
    }

    /// Choose the surface format on first use, then check the pinned format
    /// is still offered.
    pub fn choose_format(&mut self, support: &SurfaceSupport) -> Result<SurfaceFormat> {
        if !support.is_usable() {
            return Err(FrameError::SurfaceUnsupported);
        }
        match self.format {
            Some(pinned) if support.formats.contains(&pinned) => Ok(pinned),
            Some(_) => Err(FrameError::SurfaceUnsupported),
            None => {
                let format =
                    select_surface_format(&support.formats).ok_or(FrameError::SurfaceUnsupported)?;
                self.format = Some(format);
                Ok(format)
            }
        }
    }

    /// The pinned surface format, once chosen.
    pub const fn format(&self) -> Option<SurfaceFormat> {
        self.format
    }

    /// Build (or rebuild) the swapchain for `drawable`.
    ///
    /// A rebuild hands the current swapchain to the backend as the predecessor
    /// and destroys it only once the replacement is complete. On failure the
    /// current state is left untouched. The device must be idle when a
    /// swapchain already exists.
    pub fn build(
        &mut self,
        backend: &B,
        support: &SurfaceSupport,
        drawable: Extent2d,
        render_pass: B::RenderPass,
    ) -> Result<()> {
        let format = self.choose_format(support)?;
        let extent = select_extent(support, drawable);
        if extent.is_zero() {
            return Err(FrameError::InvalidState(format!(
                "cannot build a swapchain with extent {extent}"
            )));
        }
        let desc = SwapchainDesc {
            format,
            present_mode: select_present_mode(&support.present_modes, self.vsync),
            extent,
            min_image_count: select_image_count(support),
        };
        debug!("Building swapchain: {:?}", desc);

        let old = self.state.as_ref().map(SwapchainState::handle);
        let new_state = SwapchainState::build(backend, &desc, render_pass, old)?;
        info!(
            "Swapchain ready: {} with {} images ({:?})",
            new_state.extent,
            new_state.image_count(),
            new_state.present_mode
        );

        if let Some(old_state) = self.state.replace(new_state) {
            old_state.destroy(backend);
        }
        Ok(())
    }

    pub const fn state(&self) -> Option<&SwapchainState<B>> {
        self.state.as_ref()
    }

    pub fn extent(&self) -> Extent2d {
        self.state.as_ref().map_or(Extent2d::ZERO, SwapchainState::extent)
    }

    pub fn image_count(&self) -> usize {
        self.state.as_ref().map_or(0, SwapchainState::image_count)
    }

    fn current(&self) -> Result<&SwapchainState<B>> {
        self.state
            .as_ref()
            .ok_or_else(|| FrameError::InvalidState("swapchain has not been built".to_string()))
    }

    /// Acquire the next image, signaling `semaphore` when it is ready.
    pub fn acquire_next_image(
        &self,
        backend: &B,
        semaphore: B::Semaphore,
        timeout: Option<Duration>,
    ) -> Result<AcquireOutcome> {
        backend.acquire_next_image(self.current()?.handle(), semaphore, timeout)
    }

    /// Present `image_index` once `wait` is signaled.
    pub fn present(
        &self,
        backend: &B,
        image_index: u32,
        wait: B::Semaphore,
    ) -> Result<PresentOutcome> {
        backend.present(self.current()?.handle(), image_index, wait)
    }

    /// Destroy the swapchain and its per-image objects. The device must be idle.
    pub fn destroy(&mut self, backend: &B) {
        if let Some(state) = self.state.take() {
            state.destroy(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{FaultPoint, HeadlessConfig, HeadlessDevice};
    use crate::surface::{ColorSpace, PixelFormat};

    fn setup(config: HeadlessConfig) -> (HeadlessDevice, <HeadlessDevice as GpuBackend>::RenderPass) {
        let device = HeadlessDevice::new(config);
        let render_pass = device.create_render_pass(SurfaceFormat::BGRA8_SRGB).unwrap();
        (device, render_pass)
    }

    #[test]
    fn build_creates_per_image_objects() {
        let (device, rp) = setup(HeadlessConfig::default().with_image_count(3));
        let mut manager = SwapchainManager::new(false);
        let support = device.surface_support().unwrap();
        manager.build(&device, &support, Extent2d::new(640, 480), rp).unwrap();

        assert_eq!(manager.image_count(), 3);
        assert_eq!(manager.extent(), Extent2d::new(640, 480));
        let live = device.live_objects();
        assert_eq!((live.swapchains, live.image_views, live.framebuffers), (1, 3, 3));

        manager.destroy(&device);
        device.destroy_render_pass(rp);
        assert!(device.live_objects().is_empty());
    }

    #[test]
    fn rebuild_retires_old_swapchain() {
        let (device, rp) = setup(HeadlessConfig::default());
        let mut manager = SwapchainManager::new(false);
        let support = device.surface_support().unwrap();
        manager.build(&device, &support, Extent2d::new(640, 480), rp).unwrap();
        manager.build(&device, &support, Extent2d::new(1024, 768), rp).unwrap();

        assert_eq!(manager.extent(), Extent2d::new(1024, 768));
        assert_eq!(device.live_objects().swapchains, 1);
        assert!(device.swapchain_creations().last().unwrap().retired.is_some());
        manager.destroy(&device);
        device.destroy_render_pass(rp);
    }

    #[test]
    fn failed_rebuild_keeps_previous_state() {
        let (device, rp) = setup(HeadlessConfig::default().with_image_count(3));
        let mut manager = SwapchainManager::new(false);
        let support = device.surface_support().unwrap();
        manager.build(&device, &support, Extent2d::new(640, 480), rp).unwrap();
        let before = device.live_objects();

        // Third framebuffer of the replacement fails.
        device.inject_fault(FaultPoint::Framebuffer, 2);
        assert!(manager.build(&device, &support, Extent2d::new(800, 600), rp).is_err());

        assert_eq!(device.live_objects(), before);
        assert_eq!(manager.extent(), Extent2d::new(640, 480));
        assert_eq!(manager.image_count(), 3);
        manager.destroy(&device);
        device.destroy_render_pass(rp);
    }

    #[test]
    fn format_is_pinned_across_rebuilds() {
        let unorm = SurfaceFormat::new(PixelFormat::Bgra8Unorm, ColorSpace::SrgbNonlinear);
        let (device, rp) = setup(HeadlessConfig::default().with_formats(vec![unorm]));
        let mut manager: SwapchainManager<HeadlessDevice> = SwapchainManager::new(false);
        let support = device.surface_support().unwrap();
        assert_eq!(manager.choose_format(&support).unwrap(), unorm);

        // A preferred format appearing later does not change the pinned one.
        let mut later = support.clone();
        later.formats.insert(0, SurfaceFormat::BGRA8_SRGB);
        assert_eq!(manager.choose_format(&later).unwrap(), unorm);

        // The pinned format disappearing is unsupported.
        later.formats.retain(|f| *f != unorm);
        assert_eq!(manager.choose_format(&later), Err(FrameError::SurfaceUnsupported));
        device.destroy_render_pass(rp);
    }

    #[test]
    fn empty_support_is_unsupported() {
        let (device, rp) = setup(HeadlessConfig::default().with_present_modes(vec![]));
        let mut manager = SwapchainManager::new(false);
        let support = device.surface_support().unwrap();
        assert_eq!(
            manager.build(&device, &support, Extent2d::new(640, 480), rp),
            Err(FrameError::SurfaceUnsupported)
        );
        assert_eq!(device.live_objects().swapchains, 0);
        device.destroy_render_pass(rp);
    }

    #[test]
    fn zero_current_extent_is_rejected_without_touching_state() {
        let (device, rp) = setup(HeadlessConfig::default());
        let mut manager = SwapchainManager::new(false);
        let support = device.surface_support().unwrap();
        manager.build(&device, &support, Extent2d::new(640, 480), rp).unwrap();
        let before = device.live_objects();

        let minimized = SurfaceSupport {
            current_extent: Some(Extent2d::ZERO),
            ..support
        };
        assert!(select_extent(&minimized, Extent2d::new(640, 480)).is_zero());
        assert!(matches!(
            manager.build(&device, &minimized, Extent2d::new(640, 480), rp),
            Err(FrameError::InvalidState(_))
        ));
        assert_eq!(device.live_objects(), before);
        assert_eq!(manager.extent(), Extent2d::new(640, 480));
        manager.destroy(&device);
        device.destroy_render_pass(rp);
    }

    #[test]
    fn vsync_selects_fifo() {
        let (device, rp) = setup(HeadlessConfig::default());
        let support = device.surface_support().unwrap();
        let mut vsync = SwapchainManager::new(true);
        vsync.build(&device, &support, Extent2d::new(64, 64), rp).unwrap();
        assert_eq!(vsync.state().unwrap().present_mode(), PresentMode::Fifo);
        vsync.destroy(&device);

        let mut unlocked = SwapchainManager::new(false);
        unlocked.build(&device, &support, Extent2d::new(64, 64), rp).unwrap();
        assert_eq!(unlocked.state().unwrap().present_mode(), PresentMode::Mailbox);
        unlocked.destroy(&device);
        device.destroy_render_pass(rp);
    }

    #[test]
    fn acquire_before_build_is_invalid() {
        let (device, rp) = setup(HeadlessConfig::default());
        let manager: SwapchainManager<HeadlessDevice> = SwapchainManager::new(false);
        let semaphore = device.create_semaphore().unwrap();
        assert!(matches!(
            manager.acquire_next_image(&device, semaphore, None),
            Err(FrameError::InvalidState(_))
        ));
        device.destroy_semaphore(semaphore);
        device.destroy_render_pass(rp);
    }
}
