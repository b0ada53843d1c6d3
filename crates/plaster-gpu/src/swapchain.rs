//! Raw Vulkan swapchain.

use crate::error::{GpuError, Result};
use crate::surface::{color_space_to_vk, extent_to_vk, pixel_format_to_vk, present_mode_to_vk};
use ash::vk;
use plaster_frame::{AcquireOutcome, PresentOutcome, SwapchainDesc};

/// Swapchain handle and its images.
///
/// Image views and framebuffers belong to the frame core, which creates them
/// per image through the backend.
#[derive(Debug)]
pub struct VulkanSwapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl VulkanSwapchain {
    /// Create a new swapchain, retiring `old_swapchain` if given.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn new(
        swapchain_loader: &ash::khr::swapchain::Device,
        surface: vk::SurfaceKHR,
        pre_transform: vk::SurfaceTransformFlagsKHR,
        desc: &SwapchainDesc,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let format = pixel_format_to_vk(desc.format.format);
        let extent = extent_to_vk(desc.extent);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(desc.min_image_count)
            .image_format(format)
            .image_color_space(color_space_to_vk(desc.format.color_space))
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode_to_vk(desc.present_mode))
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or(vk::SwapchainKHR::null()));

        let swapchain = swapchain_loader
            .create_swapchain(&create_info, None)
            .map_err(GpuError::SwapchainCreation)?;

        let images = match swapchain_loader.get_swapchain_images(swapchain) {
            Ok(images) => images,
            Err(e) => {
                swapchain_loader.destroy_swapchain(swapchain, None);
                return Err(e.into());
            }
        };

        Ok(Self {
            swapchain,
            images,
            format,
            extent,
        })
    }

    /// Create a color view of image `index`.
    ///
    /// # Safety
    /// The device must be the one the swapchain was created on.
    pub unsafe fn create_image_view(&self, device: &ash::Device, index: usize) -> Result<vk::ImageView> {
        let image = self.images.get(index).copied().ok_or_else(|| {
            GpuError::InvalidState(format!("Swapchain image {index} does not exist"))
        })?;

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(self.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let view = device.create_image_view(&view_info, None)?;
        Ok(view)
    }

    /// Acquire the next image.
    ///
    /// An expired timeout is returned as `GpuError::Vulkan(TIMEOUT)` or
    /// `GpuError::Vulkan(NOT_READY)`.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn acquire_next_image(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquireOutcome> {
        let result = swapchain_loader.acquire_next_image(
            self.swapchain,
            timeout_ns,
            semaphore,
            vk::Fence::null(),
        );

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            }),
            // No image was acquired and the semaphore is untouched.
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Present an image.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn present(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<PresentOutcome> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match swapchain_loader.queue_present(queue, &present_info) {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Destroy the swapchain.
    ///
    /// # Safety
    /// The swapchain must not be in use and its views must be destroyed.
    pub unsafe fn destroy(&self, swapchain_loader: &ash::khr::swapchain::Device) {
        swapchain_loader.destroy_swapchain(self.swapchain, None);
    }
}
