//! Headless frame harness.

use glam::Vec3;
use plaster_core::Extent2d;
use plaster_frame::headless::{
    DeviceEvent, HeadlessConfig, HeadlessDevice, HeadlessMaterial, HeadlessMesh, HeadlessSurface,
};
use plaster_frame::{FrameOrchestrator, FrameOutcome, RendererConfig, Result};
use plaster_scene::{RenderObject, Scene, Transform};
use tracing::debug;

/// Scene type drawn by the harness.
pub type HeadlessScene = Scene<HeadlessMesh, HeadlessMaterial>;

/// Harness configuration.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub device: HeadlessConfig,
    pub renderer: RendererConfig,
    /// Initial drawable extent of the fake surface.
    pub extent: Extent2d,
    /// Objects placed in the scene.
    pub objects: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            device: HeadlessConfig::default(),
            renderer: RendererConfig::default(),
            extent: Extent2d::new(800, 600),
            objects: 1,
        }
    }
}

impl HarnessConfig {
    #[must_use]
    pub fn with_device(mut self, device: HeadlessConfig) -> Self {
        self.device = device;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    #[must_use]
    pub const fn with_extent(mut self, extent: Extent2d) -> Self {
        self.extent = extent;
        self
    }

    #[must_use]
    pub const fn with_objects(mut self, objects: usize) -> Self {
        self.objects = objects;
        self
    }
}

/// An initialized renderer over a fake device, surface and scene.
///
/// The harness keeps its own handle to the device so tests can script
/// outcomes and inspect the event log while the renderer owns the backend.
pub struct FrameHarness {
    pub renderer: FrameOrchestrator<HeadlessDevice>,
    pub device: HeadlessDevice,
    pub surface: HeadlessSurface,
    pub scene: HeadlessScene,
}

impl FrameHarness {
    /// Initialize the renderer and clear the initialization events from the log.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let device = HeadlessDevice::new(config.device);
        let mut surface = HeadlessSurface::new(config.extent);
        let renderer = FrameOrchestrator::initialize(device.clone(), &mut surface, config.renderer)?;
        device.clear_events();

        Ok(Self {
            renderer,
            device,
            surface,
            scene: test_scene(config.objects),
        })
    }

    /// Harness with default settings.
    pub fn with_defaults() -> Result<Self> {
        Self::new(HarnessConfig::default())
    }

    /// Render one frame of the harness scene.
    pub fn render(&mut self) -> Result<FrameOutcome> {
        let outcome = self.renderer.render_frame(&mut self.surface, &self.scene)?;
        debug!("Harness frame {}: {:?}", self.renderer.frame_counter(), outcome);
        Ok(outcome)
    }

    /// Render `count` frames, stopping at the first error.
    pub fn render_frames(&mut self, count: usize) -> Result<Vec<FrameOutcome>> {
        (0..count).map(|_| self.render()).collect()
    }

    /// Change the fake surface's drawable extent and raise its resize flag.
    pub fn resize(&mut self, extent: Extent2d) {
        self.surface.resize(extent);
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.device.events()
    }

    /// Protocol violations the fake device has recorded.
    pub fn violations(&self) -> Vec<String> {
        self.device.violations()
    }
}

/// A scene with `objects` cubes spaced along the X axis.
pub fn test_scene(objects: usize) -> HeadlessScene {
    let mut scene = Scene::new();
    let mesh = scene.add_mesh(HeadlessMesh::new(1, 36));
    let material = scene.add_material(HeadlessMaterial::new(1));
    for i in 0..objects {
        #[allow(clippy::cast_precision_loss)]
        let transform = Transform::from_position(Vec3::new(i as f32 * 1.5, 0.0, 0.0));
        // Handles come from this scene, so insertion cannot fail.
        if scene
            .add_object(RenderObject::new(format!("cube{i}"), mesh, material).with_transform(transform))
            .is_err()
        {
            break;
        }
    }
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_harness_starts_with_empty_log() {
        let harness = FrameHarness::with_defaults().unwrap();
        assert!(harness.events().is_empty());
        assert_eq!(harness.renderer.frame_counter(), 0);
        assert_eq!(harness.renderer.extent(), Extent2d::new(800, 600));
    }

    #[test]
    fn scene_holds_requested_objects() {
        let harness = FrameHarness::new(HarnessConfig::default().with_objects(4)).unwrap();
        assert_eq!(harness.scene.object_count(), 4);
    }

    #[test]
    fn render_frames_draws_every_object() {
        let mut harness = FrameHarness::new(HarnessConfig::default().with_objects(3)).unwrap();
        let outcomes = harness.render_frames(2).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(harness.device.draw_count(), 6);
        assert!(harness.violations().is_empty());
    }
}
