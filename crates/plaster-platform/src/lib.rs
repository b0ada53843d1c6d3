//! Platform layer for the Plaster engine.
//!
//! Provides the winit window the renderer presents into. Events are pumped
//! explicitly with [`WindowSurface::poll_events`]; nothing calls back into
//! application code.

pub mod keyboard;
pub mod window;

use thiserror::Error;

pub use keyboard::{ButtonState, KeyboardState};
pub use window::{WindowConfig, WindowSurface};
pub use winit::event::WindowEvent;
pub use winit::keyboard::KeyCode;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;
