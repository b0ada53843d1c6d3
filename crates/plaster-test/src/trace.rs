//! Queries over the fake device's event log.

use plaster_core::Extent2d;
use plaster_frame::headless::{DeviceEvent, HeadlessCommandBuffer, HeadlessFence};

/// Positions of the events matching `pred`.
pub fn positions(events: &[DeviceEvent], pred: impl Fn(&DeviceEvent) -> bool) -> Vec<usize> {
    events
        .iter()
        .enumerate()
        .filter_map(|(i, e)| pred(e).then_some(i))
        .collect()
}

/// Image indices handed out by successful acquisitions, in order.
pub fn acquired_images(events: &[DeviceEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::Acquired { image_index, .. } => Some(*image_index),
            _ => None,
        })
        .collect()
}

/// Extent of every render pass begun, in order.
pub fn render_pass_extents(events: &[DeviceEvent]) -> Vec<Extent2d> {
    events
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::RenderPassBegun { extent, .. } => Some(*extent),
            _ => None,
        })
        .collect()
}

/// Command buffer and fence of every submission, in order.
pub fn submissions(events: &[DeviceEvent]) -> Vec<(HeadlessCommandBuffer, HeadlessFence)> {
    events
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::Submitted {
                command_buffer,
                fence,
            } => Some((*command_buffer, *fence)),
            _ => None,
        })
        .collect()
}

/// Fences waited on while they were still unsignaled.
pub fn blocked_waits(events: &[DeviceEvent]) -> Vec<HeadlessFence> {
    events
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::FenceWaited {
                fence,
                signaled: false,
            } => Some(*fence),
            _ => None,
        })
        .collect()
}

/// Swapchains created, by id.
pub fn swapchains_created(events: &[DeviceEvent]) -> Vec<u64> {
    events
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::SwapchainCreated(creation) => Some(creation.id),
            _ => None,
        })
        .collect()
}

/// Position of the first command buffer reset that happened before the fence
/// of that buffer's previous submission signaled.
pub fn first_reset_before_completion(events: &[DeviceEvent]) -> Option<usize> {
    let mut awaiting: Vec<(HeadlessCommandBuffer, HeadlessFence)> = Vec::new();
    for (i, event) in events.iter().enumerate() {
        match event {
            DeviceEvent::Submitted {
                command_buffer,
                fence,
            } => awaiting.push((*command_buffer, *fence)),
            DeviceEvent::FenceSignaled(fence) => awaiting.retain(|(_, f)| f != fence),
            DeviceEvent::CommandBufferReset(cmd) => {
                if awaiting.iter().any(|(c, _)| c == cmd) {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
