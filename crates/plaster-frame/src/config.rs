//! Renderer configuration.

use std::time::Duration;

use plaster_core::constants::{DEFAULT_MAX_OBJECTS, FRAMES_IN_FLIGHT};
use serde::{Deserialize, Serialize};

use crate::error::{FrameError, Result};

/// Frame core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Number of frame slots the CPU may record ahead of the GPU.
    pub frames_in_flight: usize,
    /// Force FIFO presentation.
    pub vsync: bool,
    /// Upper bound on any fence wait. Expiry is treated as device loss.
    pub fence_timeout: Duration,
    /// Bound on image acquisition, `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
    /// Objects each frame slot's uniform buffer can hold.
    pub max_objects: usize,
    /// Stale acquisitions absorbed by one `render_frame` call before it defers.
    pub max_acquire_retries: u32,
    /// Render pass clear color (RGBA).
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: FRAMES_IN_FLIGHT,
            vsync: false,
            fence_timeout: Duration::from_secs(5),
            acquire_timeout: None,
            max_objects: DEFAULT_MAX_OBJECTS,
            max_acquire_retries: 16,
            clear_color: [0.05, 0.05, 0.08, 1.0],
        }
    }
}

impl RendererConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of frames in flight.
    #[must_use]
    pub const fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Enable or disable vsync.
    #[must_use]
    pub const fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Set the fence wait timeout.
    #[must_use]
    pub const fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout = timeout;
        self
    }

    /// Set the image acquisition timeout.
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the per-frame object capacity.
    #[must_use]
    pub const fn with_max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = max_objects;
        self
    }

    /// Set how many stale acquisitions one frame absorbs.
    #[must_use]
    pub const fn with_max_acquire_retries(mut self, retries: u32) -> Self {
        self.max_acquire_retries = retries;
        self
    }

    /// Set the clear color.
    #[must_use]
    pub const fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Check that the configuration can drive a renderer.
    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 {
            return Err(FrameError::InvalidState(
                "frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.max_objects == 0 {
            return Err(FrameError::InvalidState(
                "max_objects must be at least 1".to_string(),
            ));
        }
        if self.fence_timeout.is_zero() {
            return Err(FrameError::InvalidState(
                "fence_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.fence_timeout, Duration::from_secs(5));
        assert_eq!(config.acquire_timeout, None);
        assert!(!config.vsync);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders() {
        let config = RendererConfig::new()
            .with_vsync(true)
            .with_frames_in_flight(3)
            .with_max_objects(8)
            .with_fence_timeout(Duration::from_millis(250));
        assert!(config.vsync);
        assert_eq!(config.frames_in_flight, 3);
        assert_eq!(config.max_objects, 8);
        assert_eq!(config.fence_timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_degenerate_values() {
        assert!(RendererConfig::new().with_frames_in_flight(0).validate().is_err());
        assert!(RendererConfig::new().with_max_objects(0).validate().is_err());
        assert!(RendererConfig::new()
            .with_fence_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }
}
