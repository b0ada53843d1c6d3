//! GPU error types.

use ash::vk;
use plaster_frame::FrameError;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Failed to load the Vulkan library.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// Memory allocation failed.
    #[error("Memory allocation failed: {0}")]
    AllocationFailed(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(vk::Result),

    /// Shader module creation failed.
    #[error("Shader module creation failed: {0}")]
    ShaderModule(String),

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl GpuError {
    /// The underlying Vulkan result, if any.
    pub const fn vk_result(&self) -> Option<vk::Result> {
        match self {
            Self::Vulkan(r) | Self::SwapchainCreation(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<GpuError> for FrameError {
    fn from(err: GpuError) -> Self {
        match err.vk_result() {
            Some(vk::Result::ERROR_DEVICE_LOST) => Self::DeviceLost(err.to_string()),
            _ => Self::Device(err.to_string()),
        }
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_lost_maps_to_device_lost() {
        let err: FrameError = GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST).into();
        assert!(err.is_device_lost());
    }

    #[test]
    fn other_errors_map_to_device() {
        let err: FrameError = GpuError::AllocationFailed("out of memory".into()).into();
        assert!(matches!(err, FrameError::Device(msg) if msg.contains("out of memory")));
        let err: FrameError = GpuError::SwapchainCreation(vk::Result::ERROR_OUT_OF_HOST_MEMORY).into();
        assert!(matches!(err, FrameError::Device(_)));
    }
}
