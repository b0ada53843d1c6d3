//! Frame orchestration.
//!
//! One `render_frame` call walks a single frame slot through
//! wait, acquire, record, submit and present:
//!
//! ```text
//! [rebuild?] -> wait slot fence -> acquire --OutOfDate--> rebuild -> (retry)
//!                                     |
//!                                     v
//!              wait image fence -> record -> reset slot fence -> submit -> present -> advance
//! ```
//!
//! A slot's fence is only reset right before the submission that signals it,
//! so a retry or a failed recording never leaves the slot waiting on a fence
//! nothing will signal.

use plaster_core::math::align_up;
use plaster_core::{Extent2d, ObjectUniforms};
use tracing::{debug, info, trace_span, warn};

use crate::backend::{AcquireOutcome, FenceStatus, GpuBackend, Submission, WaitStage};
use crate::config::RendererConfig;
use crate::draw::{RenderObjectView, SceneView};
use crate::error::{FrameError, Result};
use crate::ring::{FrameRing, FrameSlot};
use crate::surface::{select_extent, Surface};
use crate::swapchain::SwapchainManager;
use crate::tracker::ImageFenceTracker;

/// Result of one `render_frame` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A frame was submitted and presentation was requested.
    Presented { image_index: u32, slot: usize },
    /// Nothing was submitted: the surface has no area, or the swapchain kept
    /// coming back stale. The frame counter did not advance.
    Deferred,
}

/// Counters for diagnostics and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_rendered: u64,
    pub frames_deferred: u64,
    pub swapchain_rebuilds: u64,
    /// Waits on another slot's fence through the image tracker.
    pub tracker_waits: u64,
    /// Acquisitions that came back out of date.
    pub acquire_retries: u64,
}

/// Drives the frame ring, swapchain and image tracker for one surface.
pub struct FrameOrchestrator<B: GpuBackend> {
    backend: B,
    config: RendererConfig,
    swapchain: SwapchainManager<B>,
    ring: FrameRing<B>,
    tracker: ImageFenceTracker<B::Fence>,
    render_pass: Option<B::RenderPass>,
    pipeline: Option<B::Pipeline>,
    /// Byte stride between objects in the dynamic uniform buffer.
    object_stride: u64,
    recreate_pending: bool,
    shut_down: bool,
    stats: FrameStats,
}

impl<B: GpuBackend> FrameOrchestrator<B> {
    /// Create the swapchain, render pass, pipeline and frame ring.
    ///
    /// Blocks until the surface has a non-zero extent. On failure everything
    /// created so far is released.
    pub fn initialize(
        backend: B,
        surface: &mut impl Surface,
        config: RendererConfig,
    ) -> Result<Self> {
        config.validate()?;
        let object_stride = align_up(
            std::mem::size_of::<ObjectUniforms>() as u64,
            backend.min_uniform_alignment(),
        );

        let mut orchestrator = Self {
            swapchain: SwapchainManager::new(config.vsync),
            ring: FrameRing::empty(),
            tracker: ImageFenceTracker::new(0),
            render_pass: None,
            pipeline: None,
            object_stride,
            recreate_pending: false,
            shut_down: false,
            stats: FrameStats::default(),
            backend,
            config,
        };

        if let Err(e) = orchestrator.create_resources(surface) {
            warn!("Renderer initialization failed: {}", e);
            orchestrator.shutdown();
            return Err(e);
        }

        info!(
            "Renderer initialized: {} frames in flight, {} swapchain images, {} extent",
            orchestrator.ring.len(),
            orchestrator.swapchain.image_count(),
            orchestrator.swapchain.extent()
        );
        Ok(orchestrator)
    }

    fn create_resources(&mut self, surface: &mut impl Surface) -> Result<()> {
        let support = self.backend.surface_support()?;
        let format = self.swapchain.choose_format(&support)?;

        let extent = surface.wait_for_non_zero_extent();
        if extent.is_zero() {
            return Err(FrameError::InvalidState(
                "surface closed before it had a drawable area".to_string(),
            ));
        }
        surface.reset_resize_flag();

        let render_pass = self.backend.create_render_pass(format)?;
        self.render_pass = Some(render_pass);
        self.pipeline = Some(self.backend.create_pipeline(render_pass)?);

        self.swapchain.build(&self.backend, &support, extent, render_pass)?;
        self.tracker.reset(self.swapchain.image_count());

        self.ring = FrameRing::new(
            &self.backend,
            self.config.frames_in_flight,
            self.config.max_objects,
            self.object_stride,
        )?;
        Ok(())
    }

    /// Render and present one frame of `scene`.
    pub fn render_frame<S>(&mut self, surface: &mut impl Surface, scene: &S) -> Result<FrameOutcome>
    where
        S: SceneView<B> + ?Sized,
    {
        if self.shut_down {
            return Err(FrameError::InvalidState("renderer has been shut down".to_string()));
        }

        if surface.was_resized() {
            surface.reset_resize_flag();
            self.recreate_pending = true;
        }

        // Checked before any fence is touched so a failure leaves the slot as it was.
        let objects = scene.objects();
        if objects.len() > self.config.max_objects {
            return Err(FrameError::ObjectCapacity {
                requested: objects.len(),
                capacity: self.config.max_objects,
            });
        }

        let slot_index = self.ring.current_index();
        let (in_flight, image_available, render_finished, command_buffer) = {
            let slot = self.current_slot()?;
            (slot.in_flight, slot.image_available, slot.render_finished, slot.command_buffer)
        };

        let mut retries = 0;
        let (image_index, suboptimal) = loop {
            if self.recreate_pending && !self.recreate_swapchain(surface)? {
                self.stats.frames_deferred += 1;
                return Ok(FrameOutcome::Deferred);
            }

            self.wait_slot_fence(slot_index, in_flight)?;

            let outcome = {
                let _span = trace_span!("frame.acquire").entered();
                self.swapchain.acquire_next_image(
                    &self.backend,
                    image_available,
                    self.config.acquire_timeout,
                )?
            };
            match outcome {
                AcquireOutcome::Acquired {
                    image_index,
                    suboptimal,
                } => break (image_index, suboptimal),
                AcquireOutcome::OutOfDate => {
                    self.stats.acquire_retries += 1;
                    self.recreate_pending = true;
                    retries += 1;
                    if retries > self.config.max_acquire_retries {
                        warn!(
                            "Swapchain still out of date after {} rebuilds, deferring frame",
                            self.config.max_acquire_retries
                        );
                        self.stats.frames_deferred += 1;
                        return Ok(FrameOutcome::Deferred);
                    }
                    debug!("Swapchain out of date on acquire, rebuilding");
                }
            }
        };
        if suboptimal {
            debug!("Swapchain suboptimal on acquire, rebuilding after this frame");
            self.recreate_pending = true;
        }

        if self
            .tracker
            .wait_if_busy(&self.backend, image_index, in_flight, self.config.fence_timeout)?
        {
            self.stats.tracker_waits += 1;
        }

        {
            let _span = trace_span!("frame.record", slot = slot_index, image = image_index).entered();
            self.record(scene, &objects, image_index)?;
        }

        {
            let _span = trace_span!("frame.submit").entered();
            self.backend.reset_fence(in_flight)?;
            self.backend.submit(&Submission {
                command_buffer,
                wait_semaphore: image_available,
                wait_stage: WaitStage::ColorAttachmentOutput,
                signal_semaphore: render_finished,
                fence: in_flight,
            })?;
        }
        self.tracker.mark_in_use(image_index, in_flight)?;

        let present = {
            let _span = trace_span!("frame.present").entered();
            self.swapchain.present(&self.backend, image_index, render_finished)?
        };
        if present.needs_recreate() || surface.was_resized() {
            debug!("Swapchain needs rebuild after present ({:?})", present);
            surface.reset_resize_flag();
            self.recreate_pending = true;
        }

        self.ring.advance();
        self.stats.frames_rendered += 1;
        Ok(FrameOutcome::Presented {
            image_index,
            slot: slot_index,
        })
    }

    fn wait_slot_fence(&self, slot_index: usize, fence: B::Fence) -> Result<()> {
        let _span = trace_span!("frame.wait_fence", slot = slot_index).entered();
        match self.backend.wait_for_fence(fence, self.config.fence_timeout)? {
            FenceStatus::Signaled => Ok(()),
            FenceStatus::TimedOut => Err(FrameError::DeviceLost(format!(
                "frame slot {slot_index} fence not signaled within {:?}",
                self.config.fence_timeout
            ))),
        }
    }

    fn record<S>(
        &mut self,
        scene: &S,
        objects: &[RenderObjectView<'_, B>],
        image_index: u32,
    ) -> Result<()>
    where
        S: SceneView<B> + ?Sized,
    {
        let (Some(render_pass), Some(pipeline)) = (self.render_pass, self.pipeline.as_ref()) else {
            return Err(FrameError::InvalidState("render state missing".to_string()));
        };
        let state = self
            .swapchain
            .state()
            .ok_or_else(|| FrameError::InvalidState("swapchain has not been built".to_string()))?;
        let framebuffer = state.framebuffer(image_index).ok_or_else(|| {
            FrameError::InvalidState(format!("no framebuffer for image {image_index}"))
        })?;
        let extent = state.extent();

        let slot_index = self.ring.current_index();
        let slot = self
            .ring
            .current_mut()
            .ok_or_else(|| FrameError::InvalidState(format!("frame slot {slot_index} missing")))?;
        let backend = &self.backend;
        let cmd = slot.command_buffer;

        backend.reset_command_buffer(cmd)?;
        backend.begin_command_buffer(cmd)?;

        backend.write_frame_uniforms(&mut slot.resources, &scene.camera(), &scene.lights())?;

        backend.cmd_begin_render_pass(cmd, render_pass, framebuffer, extent, self.config.clear_color);
        backend.cmd_bind_pipeline(cmd, pipeline, extent);
        backend.cmd_bind_frame_resources(cmd, pipeline, &slot.resources);

        for (i, object) in objects.iter().enumerate() {
            let offset = i as u64 * self.object_stride;
            let dynamic_offset = u32::try_from(offset).map_err(|_| {
                FrameError::InvalidState(format!("object offset {offset} exceeds u32"))
            })?;
            backend.write_object_uniforms(
                &mut slot.resources,
                offset,
                &ObjectUniforms::from_model(object.model),
            )?;
            backend.cmd_bind_object(cmd, pipeline, &slot.resources, dynamic_offset);
            object.material.bind(backend, cmd, pipeline);
            object.mesh.bind(backend, cmd);
            object.mesh.draw(backend, cmd);
        }

        backend.cmd_end_render_pass(cmd);
        backend.end_command_buffer(cmd)
    }

    /// Rebuild the swapchain against the surface's current extent.
    ///
    /// Returns false, keeping the rebuild pending, when the surface still has
    /// no area after waiting, either by its own report or by the extent the
    /// device would give the new swapchain.
    fn recreate_swapchain(&mut self, surface: &mut impl Surface) -> Result<bool> {
        let extent = surface.wait_for_non_zero_extent();
        if extent.is_zero() {
            debug!("Surface has no area, deferring swapchain rebuild");
            return Ok(false);
        }
        let render_pass = self
            .render_pass
            .ok_or_else(|| FrameError::InvalidState("render pass missing".to_string()))?;

        let support = self.backend.surface_support()?;
        if select_extent(&support, extent).is_zero() {
            debug!("Surface reports a zero extent, deferring swapchain rebuild");
            return Ok(false);
        }

        self.backend.wait_idle()?;
        self.swapchain.build(&self.backend, &support, extent, render_pass)?;
        self.tracker.reset(self.swapchain.image_count());

        // The rebuild used the latest extent, so resizes seen while waiting are covered.
        surface.reset_resize_flag();
        self.recreate_pending = false;
        self.stats.swapchain_rebuilds += 1;
        info!(
            "Swapchain rebuilt: {} with {} images",
            self.swapchain.extent(),
            self.swapchain.image_count()
        );
        Ok(true)
    }

    fn current_slot(&self) -> Result<&FrameSlot<B>> {
        self.ring.current().ok_or_else(|| {
            FrameError::InvalidState(format!("frame slot {} missing", self.ring.current_index()))
        })
    }

    /// Request a swapchain rebuild at the start of the next frame.
    pub fn request_recreate(&mut self) {
        self.recreate_pending = true;
    }

    pub const fn is_recreate_pending(&self) -> bool {
        self.recreate_pending
    }

    /// Block until the device has finished all submitted work.
    pub fn wait_idle(&self) -> Result<()> {
        self.backend.wait_idle()
    }

    /// Wait for the device to go idle, then destroy every owned object in
    /// reverse creation order. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Err(e) = self.backend.wait_idle() {
            warn!("Device wait idle failed during shutdown: {}", e);
        }
        self.ring.destroy(&self.backend);
        self.swapchain.destroy(&self.backend);
        if let Some(pipeline) = self.pipeline.take() {
            self.backend.destroy_pipeline(pipeline);
        }
        if let Some(render_pass) = self.render_pass.take() {
            self.backend.destroy_render_pass(render_pass);
        }
        self.tracker.reset(0);
        info!("Renderer shut down after {} frames", self.stats.frames_rendered);
    }

    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub const fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Frames submitted since initialization.
    pub const fn frame_counter(&self) -> u64 {
        self.ring.frame_counter()
    }

    /// Slot the next frame will use.
    pub fn current_slot_index(&self) -> usize {
        self.ring.current_index()
    }

    pub fn extent(&self) -> Extent2d {
        self.swapchain.extent()
    }

    pub fn image_count(&self) -> usize {
        self.swapchain.image_count()
    }

    pub const fn frames_in_flight(&self) -> usize {
        self.config.frames_in_flight
    }

    pub const fn object_stride(&self) -> u64 {
        self.object_stride
    }

    pub const fn pipeline(&self) -> Option<&B::Pipeline> {
        self.pipeline.as_ref()
    }
}

impl<B: GpuBackend> Drop for FrameOrchestrator<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{
        DeviceEvent, FaultPoint, HeadlessConfig, HeadlessDevice, HeadlessMaterial, HeadlessMesh,
        HeadlessSurface,
    };
    use plaster_scene::{RenderObject, Scene};
    use std::time::Duration;

    type TestScene = Scene<HeadlessMesh, HeadlessMaterial>;

    fn scene_with(objects: usize) -> TestScene {
        let mut scene = Scene::new();
        let mesh = scene.add_mesh(HeadlessMesh::new(1, 36));
        let material = scene.add_material(HeadlessMaterial::new(1));
        for i in 0..objects {
            scene
                .add_object(RenderObject::new(format!("obj{i}"), mesh, material))
                .unwrap();
        }
        scene
    }

    fn orchestrator(
        config: HeadlessConfig,
    ) -> (FrameOrchestrator<HeadlessDevice>, HeadlessDevice, HeadlessSurface) {
        let device = HeadlessDevice::new(config);
        let mut surface = HeadlessSurface::new(Extent2d::new(800, 600));
        let renderer =
            FrameOrchestrator::initialize(device.clone(), &mut surface, RendererConfig::default())
                .unwrap();
        (renderer, device, surface)
    }

    #[test]
    fn initialize_builds_everything() {
        let (renderer, device, _surface) = orchestrator(HeadlessConfig::default().with_image_count(3));
        assert_eq!(renderer.image_count(), 3);
        assert_eq!(renderer.extent(), Extent2d::new(800, 600));
        assert_eq!(renderer.frames_in_flight(), 2);
        let live = device.live_objects();
        assert_eq!(live.fences, 2);
        assert_eq!(live.semaphores, 4);
        assert_eq!(live.command_buffers, 2);
        assert_eq!(live.frame_resources, 2);
        assert_eq!((live.render_passes, live.pipelines), (1, 1));
    }

    #[test]
    fn object_stride_honors_alignment() {
        let (renderer, _, _) = orchestrator(HeadlessConfig::default().with_uniform_alignment(256));
        assert_eq!(renderer.object_stride(), 256);
        let (renderer, _, _) = orchestrator(HeadlessConfig::default().with_uniform_alignment(64));
        assert_eq!(renderer.object_stride(), 128);
    }

    #[test]
    fn frames_alternate_slots() {
        let (mut renderer, _device, mut surface) = orchestrator(HeadlessConfig::default());
        let scene = scene_with(1);
        let slots: Vec<_> = (0..4)
            .map(|_| match renderer.render_frame(&mut surface, &scene).unwrap() {
                FrameOutcome::Presented { slot, .. } => slot,
                FrameOutcome::Deferred => panic!("unexpected deferral"),
            })
            .collect();
        assert_eq!(slots, [0, 1, 0, 1]);
        assert_eq!(renderer.frame_counter(), 4);
    }

    #[test]
    fn objects_use_strided_dynamic_offsets() {
        let (mut renderer, device, mut surface) =
            orchestrator(HeadlessConfig::default().with_uniform_alignment(256));
        let scene = scene_with(3);
        renderer.render_frame(&mut surface, &scene).unwrap();

        let offsets: Vec<_> = device
            .events()
            .into_iter()
            .filter_map(|e| match e {
                DeviceEvent::ObjectBound { dynamic_offset } => Some(dynamic_offset),
                _ => None,
            })
            .collect();
        assert_eq!(offsets, [0, 256, 512]);
        assert_eq!(device.draw_count(), 3);
    }

    #[test]
    fn too_many_objects_fails_before_touching_fences() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut surface = HeadlessSurface::new(Extent2d::new(800, 600));
        let config = RendererConfig::default().with_max_objects(2);
        let mut renderer = FrameOrchestrator::initialize(device.clone(), &mut surface, config).unwrap();
        device.clear_events();

        let err = renderer.render_frame(&mut surface, &scene_with(3)).unwrap_err();
        assert_eq!(err, FrameError::ObjectCapacity { requested: 3, capacity: 2 });
        assert!(device.events().is_empty());
        assert_eq!(renderer.frame_counter(), 0);
    }

    #[test]
    fn suboptimal_acquire_renders_then_rebuilds() {
        let (mut renderer, device, mut surface) = orchestrator(HeadlessConfig::default());
        device.script_acquire_suboptimal(1);
        let scene = scene_with(1);

        assert!(matches!(
            renderer.render_frame(&mut surface, &scene).unwrap(),
            FrameOutcome::Presented { .. }
        ));
        assert!(renderer.is_recreate_pending());
        assert_eq!(renderer.stats().swapchain_rebuilds, 0);

        renderer.render_frame(&mut surface, &scene).unwrap();
        assert_eq!(renderer.stats().swapchain_rebuilds, 1);
    }

    #[test]
    fn persistent_out_of_date_defers() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut surface = HeadlessSurface::new(Extent2d::new(800, 600));
        let config = RendererConfig::default().with_max_acquire_retries(3);
        let mut renderer = FrameOrchestrator::initialize(device.clone(), &mut surface, config).unwrap();
        device.script_acquire_out_of_date(10);

        let outcome = renderer.render_frame(&mut surface, &scene_with(1)).unwrap();
        assert_eq!(outcome, FrameOutcome::Deferred);
        assert_eq!(renderer.frame_counter(), 0);
        assert_eq!(renderer.stats().acquire_retries, 4);
        assert_eq!(device.submission_count(), 0);
        assert!(device.violations().is_empty());
    }

    #[test]
    fn acquire_timeout_is_reported() {
        let (mut renderer, device, mut surface) = orchestrator(HeadlessConfig::default());
        device.script_acquire_timeout(1);
        assert!(matches!(
            renderer.render_frame(&mut surface, &scene_with(1)),
            Err(FrameError::AcquireTimeout(_))
        ));
    }

    #[test]
    fn failed_rebuild_keeps_old_swapchain_and_propagates() {
        let (mut renderer, device, mut surface) = orchestrator(HeadlessConfig::default());
        let scene = scene_with(1);
        renderer.render_frame(&mut surface, &scene).unwrap();

        surface.resize(Extent2d::new(1024, 768));
        device.inject_fault(FaultPoint::Swapchain, 0);
        assert!(matches!(
            renderer.render_frame(&mut surface, &scene),
            Err(FrameError::Device(_))
        ));
        assert_eq!(renderer.extent(), Extent2d::new(800, 600));
        assert!(renderer.is_recreate_pending());

        // The next frame retries the rebuild and succeeds.
        renderer.render_frame(&mut surface, &scene).unwrap();
        assert_eq!(renderer.extent(), Extent2d::new(1024, 768));
    }

    #[test]
    fn minimized_surface_defers_until_restored() {
        let (mut renderer, device, mut surface) = orchestrator(HeadlessConfig::default());
        let scene = scene_with(1);
        renderer.render_frame(&mut surface, &scene).unwrap();

        surface.resize(Extent2d::ZERO);
        let submitted = device.submission_count();
        assert_eq!(renderer.render_frame(&mut surface, &scene).unwrap(), FrameOutcome::Deferred);
        assert_eq!(device.submission_count(), submitted);
        assert!(renderer.is_recreate_pending());

        surface.resize(Extent2d::new(640, 480));
        assert!(matches!(
            renderer.render_frame(&mut surface, &scene).unwrap(),
            FrameOutcome::Presented { .. }
        ));
        assert_eq!(renderer.extent(), Extent2d::new(640, 480));
    }

    #[test]
    fn zero_surface_extent_defers_stale_rebuild() {
        let (mut renderer, device, mut surface) = orchestrator(HeadlessConfig::default());
        let scene = scene_with(1);
        renderer.render_frame(&mut surface, &scene).unwrap();
        let rebuilds = renderer.stats().swapchain_rebuilds;

        // The window still reports a size but the surface already has none.
        device.set_current_extent(Some(Extent2d::ZERO));
        device.script_acquire_out_of_date(1);
        assert_eq!(renderer.render_frame(&mut surface, &scene), Ok(FrameOutcome::Deferred));
        assert!(renderer.is_recreate_pending());
        assert_eq!(renderer.stats().swapchain_rebuilds, rebuilds);
        assert_eq!(renderer.extent(), Extent2d::new(800, 600));
        assert_eq!(renderer.frame_counter(), 1);

        device.set_current_extent(None);
        assert!(matches!(
            renderer.render_frame(&mut surface, &scene).unwrap(),
            FrameOutcome::Presented { .. }
        ));
        assert_eq!(renderer.stats().swapchain_rebuilds, rebuilds + 1);
        assert!(!renderer.is_recreate_pending());
    }

    #[test]
    fn failed_recording_leaves_slot_fence_signaled() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut surface = HeadlessSurface::new(Extent2d::new(800, 600));
        let config = RendererConfig::default().with_fence_timeout(Duration::from_millis(50));
        let mut renderer = FrameOrchestrator::initialize(device.clone(), &mut surface, config).unwrap();
        let scene = scene_with(1);
        renderer.render_frame(&mut surface, &scene).unwrap();

        device.clear_events();
        device.inject_fault(FaultPoint::Record, 0);
        assert!(matches!(
            renderer.render_frame(&mut surface, &scene),
            Err(FrameError::Device(_))
        ));
        assert!(!device
            .events()
            .iter()
            .any(|e| matches!(e, DeviceEvent::FenceReset(_))));
        assert_eq!(renderer.current_slot_index(), 1);

        // The same slot runs again without waiting out the fence timeout.
        device.clear_events();
        let outcome = renderer.render_frame(&mut surface, &scene).unwrap();
        assert!(matches!(outcome, FrameOutcome::Presented { slot: 1, .. }));
        assert!(!device
            .events()
            .iter()
            .any(|e| matches!(e, DeviceEvent::FenceWaited { signaled: false, .. })));
    }

    #[test]
    fn shutdown_releases_everything_once() {
        let (mut renderer, device, mut surface) = orchestrator(HeadlessConfig::default());
        renderer.render_frame(&mut surface, &scene_with(2)).unwrap();
        renderer.shutdown();
        assert!(device.live_objects().is_empty());
        renderer.shutdown();
        drop(renderer);
        assert!(device.violations().is_empty());
        assert_eq!(
            device.events().iter().filter(|e| **e == DeviceEvent::WaitIdle).count(),
            1
        );
    }

    #[test]
    fn render_after_shutdown_is_invalid() {
        let (mut renderer, _device, mut surface) = orchestrator(HeadlessConfig::default());
        renderer.shutdown();
        assert!(matches!(
            renderer.render_frame(&mut surface, &scene_with(0)),
            Err(FrameError::InvalidState(_))
        ));
    }

    #[test]
    fn unsupported_surface_fails_initialization_cleanly() {
        let device = HeadlessDevice::new(HeadlessConfig::default().with_formats(vec![]));
        let mut surface = HeadlessSurface::new(Extent2d::new(800, 600));
        let result = FrameOrchestrator::initialize(device.clone(), &mut surface, RendererConfig::default());
        assert_eq!(result.err(), Some(FrameError::SurfaceUnsupported));
        assert!(device.live_objects().is_empty());
    }

    #[test]
    fn failed_ring_creation_releases_swapchain() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        device.inject_fault(FaultPoint::FrameResources, 1);
        let mut surface = HeadlessSurface::new(Extent2d::new(800, 600));
        assert!(FrameOrchestrator::initialize(device.clone(), &mut surface, RendererConfig::default()).is_err());
        assert!(device.live_objects().is_empty());
    }
}
