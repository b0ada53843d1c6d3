//! Frame lifecycle and GPU synchronization for the Plaster engine.
//!
//! This crate owns the parts of rendering that decide *when* things happen:
//! - Swapchain building, atomic rebuilds and parameter selection
//! - A ring of frame slots so the CPU records frame N+1 while the GPU runs frame N
//! - Per-image fence tracking so two slots never render into the same image
//! - The per-frame state machine: wait, acquire, record, submit, present
//!
//! The GPU itself sits behind [`GpuBackend`]. `plaster-gpu` provides the Vulkan
//! implementation; the `headless` feature provides a scripted fake.

pub mod backend;
pub mod config;
pub mod draw;
pub mod error;
pub mod orchestrator;
pub mod ring;
pub mod surface;
pub mod swapchain;
pub mod tracker;

#[cfg(any(test, feature = "headless"))]
pub mod headless;

pub use backend::{
    AcquireOutcome, FenceStatus, GpuBackend, PresentOutcome, Submission, SwapchainDesc, WaitStage,
};
pub use config::RendererConfig;
pub use draw::{BindMaterial, DrawMesh, RenderObjectView, SceneView};
pub use error::{FrameError, Result};
pub use orchestrator::{FrameOrchestrator, FrameOutcome, FrameStats};
pub use ring::{FrameRing, FrameSlot};
pub use surface::{
    select_extent, select_image_count, select_present_mode, select_surface_format, ColorSpace,
    PixelFormat, PresentMode, Surface, SurfaceFormat, SurfaceSupport,
};
pub use swapchain::{SwapchainManager, SwapchainState};
pub use tracker::ImageFenceTracker;
