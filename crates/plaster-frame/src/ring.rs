//! Frame resource ring.

use crate::backend::GpuBackend;
use crate::error::Result;

/// Resources owned by one frame in flight.
pub struct FrameSlot<B: GpuBackend> {
    pub command_buffer: B::CommandBuffer,
    /// Signaled by acquisition, waited on by the submission.
    pub image_available: B::Semaphore,
    /// Signaled by the submission, waited on by presentation.
    pub render_finished: B::Semaphore,
    /// Created signaled so the first wait on a fresh slot returns at once.
    pub in_flight: B::Fence,
    pub resources: B::FrameResources,
}

impl<B: GpuBackend> FrameSlot<B> {
    /// Create a slot, releasing anything already created if a step fails.
    pub fn new(backend: &B, object_capacity: usize, object_stride: u64) -> Result<Self> {
        let in_flight = backend.create_fence(true)?;

        let image_available = match backend.create_semaphore() {
            Ok(s) => s,
            Err(e) => {
                backend.destroy_fence(in_flight);
                return Err(e);
            }
        };

        let render_finished = match backend.create_semaphore() {
            Ok(s) => s,
            Err(e) => {
                backend.destroy_semaphore(image_available);
                backend.destroy_fence(in_flight);
                return Err(e);
            }
        };

        let command_buffer = match backend.allocate_command_buffer() {
            Ok(cmd) => cmd,
            Err(e) => {
                backend.destroy_semaphore(render_finished);
                backend.destroy_semaphore(image_available);
                backend.destroy_fence(in_flight);
                return Err(e);
            }
        };

        let resources = match backend.create_frame_resources(object_capacity, object_stride) {
            Ok(r) => r,
            Err(e) => {
                backend.free_command_buffer(command_buffer);
                backend.destroy_semaphore(render_finished);
                backend.destroy_semaphore(image_available);
                backend.destroy_fence(in_flight);
                return Err(e);
            }
        };

        Ok(Self {
            command_buffer,
            image_available,
            render_finished,
            in_flight,
            resources,
        })
    }

    /// Destroy the slot. The device must be idle.
    pub fn destroy(self, backend: &B) {
        backend.destroy_frame_resources(self.resources);
        backend.free_command_buffer(self.command_buffer);
        backend.destroy_semaphore(self.render_finished);
        backend.destroy_semaphore(self.image_available);
        backend.destroy_fence(self.in_flight);
    }
}

/// Fixed ring of frame slots, indexed by `frame_counter % len`.
pub struct FrameRing<B: GpuBackend> {
    slots: Vec<FrameSlot<B>>,
    frame_counter: u64,
}

impl<B: GpuBackend> FrameRing<B> {
    /// A ring with no slots, used before initialization and after shutdown.
    pub const fn empty() -> Self {
        Self {
            slots: Vec::new(),
            frame_counter: 0,
        }
    }

    /// Create `count` slots.
    pub fn new(
        backend: &B,
        count: usize,
        object_capacity: usize,
        object_stride: u64,
    ) -> Result<Self> {
        let mut ring = Self::empty();
        for _ in 0..count {
            match FrameSlot::new(backend, object_capacity, object_stride) {
                Ok(slot) => ring.slots.push(slot),
                Err(e) => {
                    ring.destroy(backend);
                    return Err(e);
                }
            }
        }
        Ok(ring)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Frames submitted so far.
    pub const fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Index of the slot the next frame records into.
    #[allow(clippy::cast_possible_truncation)]
    pub fn current_index(&self) -> usize {
        if self.slots.is_empty() {
            0
        } else {
            (self.frame_counter % self.slots.len() as u64) as usize
        }
    }

    pub fn current(&self) -> Option<&FrameSlot<B>> {
        self.slots.get(self.current_index())
    }

    pub fn current_mut(&mut self) -> Option<&mut FrameSlot<B>> {
        let index = self.current_index();
        self.slots.get_mut(index)
    }

    pub fn slot(&self, index: usize) -> Option<&FrameSlot<B>> {
        self.slots.get(index)
    }

    /// Move to the next slot. Called once per submitted frame.
    pub fn advance(&mut self) {
        self.frame_counter += 1;
    }

    /// Destroy every slot. The device must be idle.
    pub fn destroy(&mut self, backend: &B) {
        for slot in self.slots.drain(..).rev() {
            slot.destroy(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{FaultPoint, HeadlessConfig, HeadlessDevice};

    #[test]
    fn slots_cycle_with_counter() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut ring = FrameRing::new(&device, 2, 4, 256).unwrap();
        let indices: Vec<_> = (0..5)
            .map(|_| {
                let i = ring.current_index();
                ring.advance();
                i
            })
            .collect();
        assert_eq!(indices, [0, 1, 0, 1, 0]);
        assert_eq!(ring.frame_counter(), 5);
        ring.destroy(&device);
    }

    #[test]
    fn slot_objects_are_distinct() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut ring = FrameRing::new(&device, 2, 4, 256).unwrap();
        let (a, b) = (ring.slot(0).unwrap(), ring.slot(1).unwrap());
        assert_ne!(a.in_flight, b.in_flight);
        assert_ne!(a.command_buffer, b.command_buffer);
        assert_ne!(a.image_available, b.image_available);
        ring.destroy(&device);
        assert!(device.live_objects().is_empty());
    }

    #[test]
    fn fences_start_signaled() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut ring = FrameRing::new(&device, 2, 1, 256).unwrap();
        assert!(device.is_fence_signaled(ring.slot(0).unwrap().in_flight));
        assert!(device.is_fence_signaled(ring.slot(1).unwrap().in_flight));
        ring.destroy(&device);
    }

    #[test]
    fn failed_creation_releases_partial_ring() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        // Second slot's frame resources fail.
        device.inject_fault(FaultPoint::FrameResources, 1);
        assert!(FrameRing::new(&device, 2, 4, 256).is_err());
        assert!(device.live_objects().is_empty());
    }
}
