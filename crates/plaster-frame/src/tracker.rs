//! Per-image fence tracking.
//!
//! With N swapchain images and F frame slots the ring alone cannot stop two
//! slots from rendering into the same image. The tracker remembers, per image,
//! the fence of the last submission that rendered into it.

use std::time::Duration;

use tracing::debug;

use crate::backend::{FenceStatus, GpuBackend};
use crate::error::{FrameError, Result};

/// Maps swapchain image index to the fence guarding its last use.
#[derive(Debug)]
pub struct ImageFenceTracker<F> {
    images: Vec<Option<F>>,
}

impl<F: Copy + PartialEq> ImageFenceTracker<F> {
    /// Tracker for `image_count` images, all free.
    pub fn new(image_count: usize) -> Self {
        Self {
            images: vec![None; image_count],
        }
    }

    /// Number of tracked images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Fence currently recorded for `image_index`.
    pub fn fence(&self, image_index: u32) -> Option<F> {
        self.images.get(image_index as usize).copied().flatten()
    }

    /// Wait for the last submission into `image_index`, if any.
    ///
    /// `own_fence` is the fence of the slot about to record. The slot has
    /// already waited on it, so an entry equal to it is skipped. Returns
    /// whether a wait on another slot's fence took place.
    pub fn wait_if_busy<B: GpuBackend<Fence = F>>(
        &self,
        backend: &B,
        image_index: u32,
        own_fence: F,
        timeout: Duration,
    ) -> Result<bool> {
        let Some(fence) = self.fence(image_index) else {
            return Ok(false);
        };
        if fence == own_fence {
            return Ok(false);
        }

        debug!("Image {} still in use by another frame, waiting", image_index);
        match backend.wait_for_fence(fence, timeout)? {
            FenceStatus::Signaled => Ok(true),
            FenceStatus::TimedOut => Err(FrameError::DeviceLost(format!(
                "fence for swapchain image {image_index} not signaled within {timeout:?}"
            ))),
        }
    }

    /// Record that the submission guarded by `fence` renders into `image_index`.
    pub fn mark_in_use(&mut self, image_index: u32, fence: F) -> Result<()> {
        let len = self.images.len();
        let entry = self.images.get_mut(image_index as usize).ok_or_else(|| {
            FrameError::InvalidState(format!(
                "image index {image_index} out of range for {len} swapchain images"
            ))
        })?;
        *entry = Some(fence);
        Ok(())
    }

    /// Forget all entries and resize for a rebuilt swapchain.
    pub fn reset(&mut self, image_count: usize) {
        self.images.clear();
        self.images.resize(image_count, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{GpuCompletion, HeadlessConfig, HeadlessDevice};

    #[test]
    fn free_images_do_not_wait() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let own = device.create_fence(true).unwrap();
        let tracker = ImageFenceTracker::new(3);
        assert!(!tracker.wait_if_busy(&device, 1, own, Duration::from_millis(10)).unwrap());
        assert!(!tracker.wait_if_busy(&device, 7, own, Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn own_fence_is_skipped() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let own = device.create_fence(false).unwrap();
        let mut tracker = ImageFenceTracker::new(2);
        tracker.mark_in_use(0, own).unwrap();
        // Unsignaled, so waiting on it would time out.
        assert!(!tracker.wait_if_busy(&device, 0, own, Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn waits_on_other_slot_fence() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let own = device.create_fence(true).unwrap();
        let other = device.create_fence(true).unwrap();
        let mut tracker = ImageFenceTracker::new(2);
        tracker.mark_in_use(1, other).unwrap();
        assert!(tracker.wait_if_busy(&device, 1, own, Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn unsignaled_fence_times_out_as_device_lost() {
        let device = HeadlessDevice::new(
            HeadlessConfig::default().with_completion(GpuCompletion::Manual),
        );
        let own = device.create_fence(true).unwrap();
        let other = device.create_fence(false).unwrap();
        let mut tracker = ImageFenceTracker::new(2);
        tracker.mark_in_use(0, other).unwrap();
        let err = tracker
            .wait_if_busy(&device, 0, own, Duration::from_millis(20))
            .unwrap_err();
        assert!(err.is_device_lost());
    }

    #[test]
    fn reset_clears_and_resizes() {
        let mut tracker = ImageFenceTracker::new(2);
        tracker.mark_in_use(1, 9_u32).unwrap();
        tracker.reset(4);
        assert_eq!(tracker.len(), 4);
        assert!((0..4).all(|i| tracker.fence(i).is_none()));
        assert!(tracker.mark_in_use(4, 1).is_err());
    }
}
