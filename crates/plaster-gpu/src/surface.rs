//! Window surface and conversions between Vulkan and frame-core types.
//!
//! The frame core reasons about formats, present modes and extents without
//! knowing about Vulkan. This module owns the `VkSurfaceKHR` and translates
//! in both directions.

use crate::error::{GpuError, Result};
use ash::vk;
use plaster_core::Extent2d;
use plaster_frame::{ColorSpace, PixelFormat, PresentMode, SurfaceFormat, SurfaceSupport};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// Surface context for windowed rendering.
///
/// Manages the Vulkan surface and the swapchain loader that presents into it.
pub struct SurfaceContext {
    /// The Vulkan surface handle.
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader.
    pub surface_loader: ash::khr::surface::Instance,
    /// Swapchain extension loader. Set once the logical device exists.
    pub(crate) swapchain_loader: Option<ash::khr::swapchain::Device>,
}

impl SurfaceContext {
    /// Create a surface for a window.
    ///
    /// # Safety
    /// The entry and instance must be valid; the handles must outlive the surface.
    pub unsafe fn new(
        entry: &ash::Entry,
        instance: &ash::Instance,
        display: RawDisplayHandle,
        window: RawWindowHandle,
    ) -> Result<Self> {
        let surface = ash_window::create_surface(entry, instance, display, window, None)
            .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;
        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        Ok(Self {
            surface,
            surface_loader,
            swapchain_loader: None,
        })
    }

    /// Load the swapchain functions for `device`.
    pub(crate) fn attach_device(&mut self, instance: &ash::Instance, device: &ash::Device) {
        self.swapchain_loader = Some(ash::khr::swapchain::Device::new(instance, device));
    }

    /// The swapchain loader.
    pub fn swapchain_loader(&self) -> Result<&ash::khr::swapchain::Device> {
        self.swapchain_loader
            .as_ref()
            .ok_or_else(|| GpuError::InvalidState("Surface has no device attached".to_string()))
    }

    /// Query raw surface capabilities.
    ///
    /// # Safety
    /// The physical device must be the one the surface was checked against.
    pub unsafe fn raw_capabilities(
        &self,
        physical_device: vk::PhysicalDevice,
    ) -> Result<vk::SurfaceCapabilitiesKHR> {
        let caps = self
            .surface_loader
            .get_physical_device_surface_capabilities(physical_device, self.surface)?;
        Ok(caps)
    }

    /// Query what the surface supports right now.
    ///
    /// # Safety
    /// The physical device must be the one the surface was checked against.
    pub unsafe fn support(&self, physical_device: vk::PhysicalDevice) -> Result<SurfaceSupport> {
        let caps = self.raw_capabilities(physical_device)?;
        let formats = self
            .surface_loader
            .get_physical_device_surface_formats(physical_device, self.surface)?;
        let present_modes = self
            .surface_loader
            .get_physical_device_surface_present_modes(physical_device, self.surface)?;

        Ok(support_from_vk(&caps, &formats, &present_modes))
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// The surface must not be in use and every swapchain on it must be destroyed.
    pub unsafe fn destroy(&self) {
        self.surface_loader.destroy_surface(self.surface, None);
    }
}

/// Assemble [`SurfaceSupport`] from raw Vulkan query results.
pub fn support_from_vk(
    caps: &vk::SurfaceCapabilitiesKHR,
    formats: &[vk::SurfaceFormatKHR],
    present_modes: &[vk::PresentModeKHR],
) -> SurfaceSupport {
    // u32::MAX means the swapchain decides its own size.
    let current_extent = (caps.current_extent.width != u32::MAX)
        .then(|| extent_from_vk(caps.current_extent));

    SurfaceSupport {
        formats: formats
            .iter()
            .map(|f| SurfaceFormat::new(pixel_format_from_vk(f.format), color_space_from_vk(f.color_space)))
            .collect(),
        present_modes: present_modes.iter().copied().map(present_mode_from_vk).collect(),
        min_image_count: caps.min_image_count,
        max_image_count: caps.max_image_count,
        current_extent,
        min_extent: extent_from_vk(caps.min_image_extent),
        max_extent: extent_from_vk(caps.max_image_extent),
    }
}

pub const fn extent_from_vk(extent: vk::Extent2D) -> Extent2d {
    Extent2d::new(extent.width, extent.height)
}

pub const fn extent_to_vk(extent: Extent2d) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width,
        height: extent.height,
    }
}

pub const fn pixel_format_from_vk(format: vk::Format) -> PixelFormat {
    match format {
        vk::Format::B8G8R8A8_SRGB => PixelFormat::Bgra8Srgb,
        vk::Format::B8G8R8A8_UNORM => PixelFormat::Bgra8Unorm,
        vk::Format::R8G8B8A8_SRGB => PixelFormat::Rgba8Srgb,
        vk::Format::R8G8B8A8_UNORM => PixelFormat::Rgba8Unorm,
        other => PixelFormat::Other(other.as_raw()),
    }
}

pub const fn pixel_format_to_vk(format: PixelFormat) -> vk::Format {
    match format {
        PixelFormat::Bgra8Srgb => vk::Format::B8G8R8A8_SRGB,
        PixelFormat::Bgra8Unorm => vk::Format::B8G8R8A8_UNORM,
        PixelFormat::Rgba8Srgb => vk::Format::R8G8B8A8_SRGB,
        PixelFormat::Rgba8Unorm => vk::Format::R8G8B8A8_UNORM,
        PixelFormat::Other(raw) => vk::Format::from_raw(raw),
    }
}

pub const fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> ColorSpace {
    match color_space {
        vk::ColorSpaceKHR::SRGB_NONLINEAR => ColorSpace::SrgbNonlinear,
        other => ColorSpace::Other(other.as_raw()),
    }
}

pub const fn color_space_to_vk(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonlinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::Other(raw) => vk::ColorSpaceKHR::from_raw(raw),
    }
}

pub const fn present_mode_from_vk(mode: vk::PresentModeKHR) -> PresentMode {
    match mode {
        vk::PresentModeKHR::IMMEDIATE => PresentMode::Immediate,
        vk::PresentModeKHR::MAILBOX => PresentMode::Mailbox,
        vk::PresentModeKHR::FIFO => PresentMode::Fifo,
        vk::PresentModeKHR::FIFO_RELAXED => PresentMode::FifoRelaxed,
        other => PresentMode::Other(other.as_raw()),
    }
}

pub const fn present_mode_to_vk(mode: PresentMode) -> vk::PresentModeKHR {
    match mode {
        PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentMode::Fifo => vk::PresentModeKHR::FIFO,
        PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        PresentMode::Other(raw) => vk::PresentModeKHR::from_raw(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 8,
            current_extent: current,
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            ..Default::default()
        }
    }

    #[test]
    fn undefined_current_extent_becomes_none() {
        let undefined = vk::Extent2D { width: u32::MAX, height: u32::MAX };
        let support = support_from_vk(&caps(undefined), &[], &[]);
        assert_eq!(support.current_extent, None);
        assert_eq!(support.max_extent, Extent2d::new(4096, 4096));

        let fixed = vk::Extent2D { width: 800, height: 600 };
        let support = support_from_vk(&caps(fixed), &[], &[]);
        assert_eq!(support.current_extent, Some(Extent2d::new(800, 600)));
    }

    #[test]
    fn formats_convert_both_ways() {
        let raw = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let support = support_from_vk(&caps(vk::Extent2D::default()), &[raw], &[]);
        assert_eq!(support.formats, [SurfaceFormat::BGRA8_SRGB]);

        let odd = pixel_format_from_vk(vk::Format::A2B10G10R10_UNORM_PACK32);
        assert_eq!(pixel_format_to_vk(odd), vk::Format::A2B10G10R10_UNORM_PACK32);
        assert_eq!(
            color_space_to_vk(color_space_from_vk(vk::ColorSpaceKHR::HDR10_ST2084_EXT)),
            vk::ColorSpaceKHR::HDR10_ST2084_EXT
        );
    }

    #[test]
    fn present_modes_map_to_core_modes() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        let support = support_from_vk(&caps(vk::Extent2D::default()), &[], &modes);
        assert_eq!(support.present_modes, [PresentMode::Fifo, PresentMode::Mailbox]);
        assert_eq!(present_mode_to_vk(PresentMode::Immediate), vk::PresentModeKHR::IMMEDIATE);
    }
}
