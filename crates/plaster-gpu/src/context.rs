//! Vulkan device context.

use crate::capabilities::GpuCapabilities;
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, select_physical_device};
use crate::memory::GpuAllocator;
use crate::surface::SurfaceContext;
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Instance, device, presentation surface and allocator for one window.
pub struct DeviceContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) capabilities: GpuCapabilities,
    pub(crate) allocator: Mutex<GpuAllocator>,
    pub(crate) surface: SurfaceContext,
    /// One family handles graphics and presentation.
    pub(crate) queue_family: u32,
    pub(crate) queue: vk::Queue,
}

impl DeviceContext {
    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the Vulkan instance handle.
    pub const fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the physical device handle.
    pub const fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get GPU capabilities.
    pub const fn capabilities(&self) -> &GpuCapabilities {
        &self.capabilities
    }

    /// Get the presentation surface.
    pub const fn surface(&self) -> &SurfaceContext {
        &self.surface
    }

    /// Get the graphics and present queue.
    pub const fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub const fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Get access to the GPU allocator.
    pub const fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // Shutdown allocator BEFORE destroying device
            self.allocator.lock().shutdown();

            self.device.destroy_device(None);
            self.surface.destroy();
            self.instance.destroy_instance(None);
        }
    }
}

/// Builder for creating a device context.
pub struct DeviceContextBuilder {
    app_name: String,
    enable_validation: bool,
}

impl Default for DeviceContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "Plaster".to_string(),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

impl DeviceContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub const fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Build the context for `window`.
    ///
    /// The window must outlive the returned context.
    pub fn build<W>(self, window: &W) -> Result<DeviceContext>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?
            .as_raw();

        // Load Vulkan entry point
        let entry = unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;

        let instance =
            unsafe { create_instance(&entry, &self.app_name, display, self.enable_validation) }?;

        let mut surface = match unsafe { SurfaceContext::new(&entry, &instance, display, window_handle) } {
            Ok(surface) => surface,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };

        match unsafe { Self::create_device(&instance, &mut surface) } {
            Ok((physical_device, capabilities, device, queue_family, allocator)) => {
                let queue = unsafe { device.get_device_queue(queue_family, 0) };
                Ok(DeviceContext {
                    entry,
                    instance,
                    physical_device,
                    device,
                    capabilities,
                    allocator: Mutex::new(allocator),
                    surface,
                    queue_family,
                    queue,
                })
            }
            Err(e) => {
                unsafe {
                    surface.destroy();
                    instance.destroy_instance(None);
                }
                Err(e)
            }
        }
    }

    /// Select a physical device for `surface` and create the logical device
    /// and allocator. Cleans up the device if the allocator fails.
    unsafe fn create_device(
        instance: &ash::Instance,
        surface: &mut SurfaceContext,
    ) -> Result<(vk::PhysicalDevice, GpuCapabilities, Arc<ash::Device>, u32, GpuAllocator)> {
        let (physical_device, queue_family) =
            select_physical_device(instance, &surface.surface_loader, surface.surface)?;

        let capabilities = GpuCapabilities::query(instance, physical_device);
        if !capabilities.meets_requirements() {
            return Err(GpuError::NoSuitableDevice);
        }
        tracing::info!("Selected GPU: {}", capabilities.summary());

        let device = Arc::new(create_logical_device(instance, physical_device, queue_family)?);

        match GpuAllocator::new(instance, Arc::clone(&device), physical_device) {
            Ok(allocator) => {
                surface.attach_device(instance, &device);
                Ok((physical_device, capabilities, device, queue_family, allocator))
            }
            Err(e) => {
                device.destroy_device(None);
                Err(e)
            }
        }
    }
}

/// Create the logical device with one graphics/present queue.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
) -> Result<ash::Device> {
    let queue_priority = 1.0_f32;
    let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(queue_family)
        .queue_priorities(std::slice::from_ref(&queue_priority))];

    #[allow(unused_mut)]
    let mut extension_names = vec![ash::khr::swapchain::NAME.as_ptr()];
    #[cfg(target_os = "macos")]
    extension_names.push(ash::khr::portability_subset::NAME.as_ptr());

    let features = vk::PhysicalDeviceFeatures::default();

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    let device = instance.create_device(physical_device, &device_create_info, None)?;
    Ok(device)
}
