//! Window surface with an explicitly pumped event loop.

use std::sync::Arc;
use std::time::Duration;

use plaster_core::Extent2d;
use plaster_frame::Surface;
use tracing::{debug, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowId};

use crate::keyboard::KeyboardState;
use crate::{PlatformError, Result};

/// How long one pump waits while blocked on a minimized window.
const MINIMIZED_POLL: Duration = Duration::from_millis(16);
/// Pumps allowed for the platform to hand out the initial window.
const CREATION_ATTEMPTS: u32 = 100;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Plaster".to_string(),
            width: 1280,
            height: 720,
            resizable: true,
        }
    }
}

/// State the event handler writes into while events are pumped.
struct WindowState {
    config: WindowConfig,
    window: Option<Arc<Window>>,
    creation_error: Option<String>,
    extent: Extent2d,
    resized: bool,
    close_requested: bool,
    keyboard: KeyboardState,
    events: Vec<WindowEvent>,
}

impl WindowState {
    fn new(config: WindowConfig) -> Self {
        Self {
            config,
            window: None,
            creation_error: None,
            extent: Extent2d::ZERO,
            resized: false,
            close_requested: false,
            keyboard: KeyboardState::new(),
            events: Vec::new(),
        }
    }

    fn record_event(&mut self, event: WindowEvent) {
        match &event {
            WindowEvent::Resized(size) => {
                self.extent = Extent2d::new(size.width, size.height);
                self.resized = true;
                debug!("Window resized to {}", self.extent);
            }
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.close_requested = true;
            }
            WindowEvent::KeyboardInput { event, .. } => self.keyboard.process_key_event(event),
            WindowEvent::Focused(false) => self.keyboard.clear(),
            _ => {}
        }
        self.events.push(event);
    }

    fn take_events(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut self.events)
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height))
            .with_resizable(self.config.resizable);

        match event_loop.create_window(attributes) {
            Ok(window) => {
                let size = window.inner_size();
                self.extent = Extent2d::new(size.width, size.height);
                self.window = Some(Arc::new(window));
            }
            Err(e) => self.creation_error = Some(e.to_string()),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.record_event(event);
    }
}

/// A winit window driven by [`poll_events`](Self::poll_events).
///
/// Records resizes, close requests and keyboard state for the application to
/// read between polls.
pub struct WindowSurface {
    event_loop: EventLoop<()>,
    state: WindowState,
    window: Arc<Window>,
}

impl WindowSurface {
    /// Create the event loop and open the window.
    pub fn new(config: WindowConfig) -> Result<Self> {
        let mut event_loop =
            EventLoop::new().map_err(|e| PlatformError::EventLoop(e.to_string()))?;

        let mut state = WindowState::new(config);

        // Windows can only be created from inside the loop.
        for _ in 0..CREATION_ATTEMPTS {
            let status = event_loop.pump_app_events(Some(Duration::ZERO), &mut state);
            if let Some(error) = state.creation_error.take() {
                return Err(PlatformError::WindowCreation(error));
            }
            if let Some(window) = state.window.clone() {
                info!("Window created: {}", state.extent);
                return Ok(Self {
                    event_loop,
                    state,
                    window,
                });
            }
            if let PumpStatus::Exit(code) = status {
                return Err(PlatformError::EventLoop(format!(
                    "event loop exited with code {code} before the window was created"
                )));
            }
        }

        Err(PlatformError::WindowCreation(
            "platform never resumed the event loop".to_string(),
        ))
    }

    /// Process pending window events without blocking.
    ///
    /// Settles keyboard transitions first. Received events queue up until
    /// [`take_events`](Self::take_events) drains them, including those pumped
    /// while waiting out a minimized window.
    pub fn poll_events(&mut self) {
        self.state.keyboard.end_frame();
        self.pump(Some(Duration::ZERO));
    }

    fn pump(&mut self, timeout: Option<Duration>) {
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(timeout, &mut self.state) {
            debug!("Event loop exited with code {code}");
            self.state.close_requested = true;
        }
    }

    /// Events received since the last drain.
    pub fn events(&self) -> &[WindowEvent] {
        &self.state.events
    }

    /// Drain the queued events in arrival order.
    pub fn take_events(&mut self) -> Vec<WindowEvent> {
        self.state.take_events()
    }

    pub const fn keyboard(&self) -> &KeyboardState {
        &self.state.keyboard
    }

    pub const fn close_requested(&self) -> bool {
        self.state.close_requested
    }

    /// Mark the window for closing, as if the user had closed it.
    pub fn request_close(&mut self) {
        self.state.close_requested = true;
    }

    pub const fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

impl Surface for WindowSurface {
    fn drawable_extent(&self) -> Extent2d {
        let size = self.window.inner_size();
        Extent2d::new(size.width, size.height)
    }

    fn was_resized(&self) -> bool {
        self.state.resized
    }

    fn reset_resize_flag(&mut self) {
        self.state.resized = false;
    }

    fn wait_for_non_zero_extent(&mut self) -> Extent2d {
        let mut extent = self.drawable_extent();
        if extent.is_zero() {
            warn!("Window is minimized, waiting for it to be restored");
        }
        while extent.is_zero() {
            if self.state.close_requested {
                return Extent2d::ZERO;
            }
            self.pump(Some(MINIMIZED_POLL));
            extent = self.drawable_extent();
        }
        extent
    }
}
