//! Frame core error types.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the frame core.
///
/// A stale swapchain is not an error: it is reported as
/// [`AcquireOutcome::OutOfDate`](crate::AcquireOutcome::OutOfDate) and recovered
/// inside the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The surface exposes no usable format or present mode.
    #[error("Surface exposes no usable format/present-mode combination")]
    SurfaceUnsupported,

    /// Resource creation or a device call failed.
    #[error("Device error: {0}")]
    Device(String),

    /// The device stopped responding, e.g. a fence wait timed out.
    #[error("Device lost: {0}")]
    DeviceLost(String),

    /// A bounded image acquisition timed out.
    #[error("Swapchain image acquisition timed out after {0:?}")]
    AcquireTimeout(Duration),

    /// The scene has more objects than the per-frame object buffer holds.
    #[error("Scene has {requested} objects but the frame buffer holds {capacity}")]
    ObjectCapacity { requested: usize, capacity: usize },

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl FrameError {
    /// Returns true for errors after which the device cannot be used again.
    pub const fn is_device_lost(&self) -> bool {
        matches!(self, Self::DeviceLost(_))
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, FrameError>;
