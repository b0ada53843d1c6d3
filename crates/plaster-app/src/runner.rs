//! Application runner and frame loop.

use std::thread;
use std::time::{Duration, Instant};

use plaster_frame::{FrameOrchestrator, FrameOutcome, RendererConfig};
use plaster_gpu::{DeviceContextBuilder, ShaderCode, VulkanBackend};
use plaster_platform::{WindowConfig, WindowEvent, WindowSurface};
use plaster_shaders::{clay_fragment_shader, clay_vertex_shader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::app::PlasterApp;
use crate::context::AppContext;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Target frames per second (None for unlimited).
    pub target_fps: Option<u32>,
    /// Enable vsync.
    pub vsync: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Frame core settings. `vsync` above overrides the field of the same name.
    pub renderer: RendererConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Plaster".to_string(),
            width: 1280,
            height: 720,
            target_fps: None,
            vsync: false,
            validation: cfg!(debug_assertions),
            renderer: RendererConfig::default(),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the target FPS. Zero means unlimited.
    #[must_use]
    pub const fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = if fps == 0 { None } else { Some(fps) };
        self
    }

    /// Enable or disable vsync.
    #[must_use]
    pub const fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub const fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Replace the frame core settings.
    #[must_use]
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    fn window_config(&self) -> WindowConfig {
        WindowConfig {
            title: self.title.clone(),
            width: self.width,
            height: self.height,
            resizable: true,
        }
    }

    fn renderer_config(&self) -> RendererConfig {
        self.renderer.clone().with_vsync(self.vsync)
    }

    /// Minimum wall time per frame, if pacing is enabled.
    fn target_frame_time(&self) -> Option<Duration> {
        self.target_fps
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_nanos(1_000_000_000 / u64::from(fps)))
    }
}

/// Run a `PlasterApp` with the given configuration.
///
/// Initializes logging, creates the window, device and renderer, and runs the
/// frame loop until the window closes or a frame fails.
pub fn run_app<A: PlasterApp>(config: AppConfig) -> anyhow::Result<()> {
    // A subscriber may already be installed by an embedding program.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    info!("{} starting...", config.title);

    let mut surface = WindowSurface::new(config.window_config())?;

    let device = DeviceContextBuilder::new()
        .app_name(&config.title)
        .validation(config.validation)
        .build(surface.window().as_ref())?;
    info!("GPU: {}", device.capabilities().summary());

    let shaders = ShaderCode {
        vertex: clay_vertex_shader().to_vec(),
        fragment: clay_fragment_shader().to_vec(),
    };
    let backend = VulkanBackend::new(device, shaders)?;
    let renderer = FrameOrchestrator::initialize(backend, &mut surface, config.renderer_config())?;

    let mut ctx = AppContext::new(renderer, surface);
    let mut app = A::init(&mut ctx)?;
    info!("Application ready!");

    let result = run_loop(&mut ctx, &mut app, config.target_frame_time());
    cleanup(&mut ctx, &mut app);
    result
}

fn run_loop<A: PlasterApp>(
    ctx: &mut AppContext,
    app: &mut A,
    target_frame_time: Option<Duration>,
) -> anyhow::Result<()> {
    let mut fps = FpsStats::default();

    loop {
        let frame_start = Instant::now();

        ctx.surface.poll_events();
        let mut exit = false;
        for event in ctx.surface.take_events() {
            if !app.on_event(&event) && is_exit_key(&event) {
                exit = true;
            }
        }
        if exit {
            ctx.surface.request_close();
        }
        if ctx.surface.close_requested() {
            break;
        }

        let dt = ctx.tick();
        fps.record(dt);
        app.update(ctx, dt);

        let extent_before = ctx.renderer.extent();
        match ctx.renderer.render_frame(&mut ctx.surface, app.scene()) {
            Ok(FrameOutcome::Presented { .. }) => ctx.frame_count += 1,
            Ok(FrameOutcome::Deferred) => debug!("Frame {} deferred", ctx.frame_count),
            Err(e) => {
                error!("Render error: {e}");
                fps.log(ctx.frame_count);
                return Err(e.into());
            }
        }

        let extent = ctx.renderer.extent();
        if extent != extent_before && !extent.is_zero() {
            info!("Resized to {extent}");
            app.on_resize(ctx, extent)?;
        }

        // Frame pacing
        if let Some(target) = target_frame_time {
            let elapsed = frame_start.elapsed();
            if elapsed < target {
                thread::sleep(target - elapsed);
            }
        }
    }

    fps.log(ctx.frame_count);
    Ok(())
}

fn cleanup<A: PlasterApp>(ctx: &mut AppContext, app: &mut A) {
    info!("Starting cleanup...");
    if let Err(e) = ctx.renderer.wait_idle() {
        error!("Failed to wait idle: {e}");
    }

    // Let the app release its meshes and materials first
    app.cleanup(ctx);
    ctx.renderer.shutdown();

    let stats = ctx.renderer.stats();
    info!(
        "Frames: {} rendered, {} deferred, {} swapchain rebuilds, {} tracker waits, {} acquire retries",
        stats.frames_rendered,
        stats.frames_deferred,
        stats.swapchain_rebuilds,
        stats.tracker_waits,
        stats.acquire_retries
    );
    info!("Cleanup complete");
}

fn is_exit_key(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::KeyboardInput {
            event: KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::Escape),
                state: ElementState::Pressed,
                repeat: false,
                ..
            },
            ..
        }
    )
}

/// Running FPS statistics.
#[derive(Debug, Clone, Copy)]
struct FpsStats {
    min: f64,
    max: f64,
    sum: f64,
    samples: u64,
}

impl Default for FpsStats {
    fn default() -> Self {
        Self {
            min: f64::MAX,
            max: 0.0,
            sum: 0.0,
            samples: 0,
        }
    }
}

impl FpsStats {
    fn record(&mut self, dt: f32) {
        if dt > 0.0 {
            let fps = 1.0 / f64::from(dt);
            self.min = self.min.min(fps);
            self.max = self.max.max(fps);
            self.sum += fps;
            self.samples += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn average(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum / self.samples as f64)
    }

    fn log(&self, frame_count: u64) {
        if let Some(avg) = self.average() {
            info!("FPS Statistics:");
            info!("  Min: {:.1}", self.min);
            info!("  Max: {:.1}", self.max);
            info!("  Avg: {:.1}", avg);
            info!("  Total frames: {}", frame_count);
        }
    }
}
