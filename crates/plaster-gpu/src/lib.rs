//! Vulkan device layer for the Plaster engine.
//!
//! This crate provides:
//! - Vulkan instance, surface and device management
//! - GPU capability detection
//! - Memory allocation via gpu-allocator
//! - The render pass and clay pipeline
//! - [`VulkanBackend`], the `plaster_frame::GpuBackend` implementation

pub mod backend;
pub mod capabilities;
pub mod command;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod instance;
pub mod memory;
pub mod mesh;
pub mod pipeline;
pub mod render_pass;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use backend::{ShaderCode, VulkanBackend, VulkanFrameResources};
pub use capabilities::{GpuCapabilities, GpuVendor};
pub use context::{DeviceContext, DeviceContextBuilder};
pub use descriptors::{write_uniform_buffer, DescriptorPool, DescriptorSetLayoutBuilder};
pub use error::{GpuError, Result};
pub use memory::{GpuAllocator, GpuBuffer};
pub use mesh::{GpuMaterial, GpuMesh};
pub use pipeline::{GraphicsPipeline, GraphicsPipelineConfig};
pub use surface::SurfaceContext;
pub use swapchain::VulkanSwapchain;
