//! Application framework for the Plaster engine.
//!
//! This crate handles the boilerplate around the frame core:
//! - Logging setup
//! - Window, device and renderer initialization
//! - The poll, update, render loop and frame pacing
//! - Orderly shutdown
//!
//! # Example
//!
//! ```no_run
//! use plaster_app::{run_app, AppConfig, AppContext, PlasterApp};
//! use plaster_app::{GpuMaterial, GpuMesh, SceneView, VulkanBackend};
//! use plaster_scene::Scene;
//!
//! struct MyApp {
//!     scene: Scene<GpuMesh, GpuMaterial>,
//! }
//!
//! impl PlasterApp for MyApp {
//!     fn init(_ctx: &mut AppContext) -> anyhow::Result<Self> {
//!         Ok(MyApp { scene: Scene::new() })
//!     }
//!
//!     fn update(&mut self, _ctx: &AppContext, _dt: f32) {}
//!
//!     fn scene(&self) -> &dyn SceneView<VulkanBackend> {
//!         &self.scene
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app::<MyApp>(AppConfig::default())
//! }
//! ```

mod app;
mod context;
mod runner;

pub use app::PlasterApp;
pub use context::AppContext;
pub use runner::{run_app, AppConfig};

// Re-export commonly used types for convenience
pub use plaster_frame::{FrameOutcome, FrameStats, RendererConfig, SceneView};
pub use plaster_gpu::{GpuMaterial, GpuMesh, VulkanBackend};
pub use plaster_platform::{KeyCode, KeyboardState, WindowEvent};
