//! End-to-end frame scenarios against the fake device.

use hashbrown::HashSet;
use plaster_core::Extent2d;
use plaster_frame::headless::{DeviceEvent, HeadlessConfig, HeadlessFramebuffer};
use plaster_frame::FrameOutcome;

use crate::harness::{FrameHarness, HarnessConfig};
use crate::trace;

#[test]
fn first_frame_on_two_image_swapchain() {
    let config = HarnessConfig::default().with_device(HeadlessConfig::default().with_image_count(2));
    let mut harness = FrameHarness::new(config).unwrap();
    assert_eq!(harness.renderer.image_count(), 2);
    assert_eq!(harness.renderer.frames_in_flight(), 2);

    let outcome = harness.render().unwrap();
    assert_eq!(outcome, FrameOutcome::Presented { image_index: 0, slot: 0 });

    let events = harness.events();
    // The fresh slot's fence starts signaled, so the first wait does not block.
    let DeviceEvent::FenceWaited { fence, signaled } = events[0].clone() else {
        panic!("frame did not start with a fence wait: {:?}", events[0]);
    };
    assert!(signaled);
    assert!(trace::blocked_waits(&events).is_empty());

    assert_eq!(trace::acquired_images(&events), [0]);
    assert_eq!(trace::submissions(&events).len(), 1);
    assert_eq!(trace::submissions(&events)[0].1, fence);

    let order = |event: &DeviceEvent| {
        events
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("missing {event:?}"))
    };
    let acquired = events
        .iter()
        .position(|e| matches!(e, DeviceEvent::Acquired { .. }))
        .unwrap();
    let submitted = events
        .iter()
        .position(|e| matches!(e, DeviceEvent::Submitted { .. }))
        .unwrap();
    let presented = events
        .iter()
        .position(|e| matches!(e, DeviceEvent::Presented { image_index: 0, .. }))
        .unwrap();
    assert!(acquired < order(&DeviceEvent::FenceReset(fence)));
    assert!(order(&DeviceEvent::FenceReset(fence)) < submitted);
    assert!(submitted < order(&DeviceEvent::FenceSignaled(fence)));
    assert!(submitted < presented);

    assert_eq!(harness.renderer.frame_counter(), 1);
    assert!(harness.violations().is_empty());
}

#[test]
fn resize_mid_run_rebuilds_once_before_third_frame() {
    let old_extent = Extent2d::new(800, 600);
    let new_extent = Extent2d::new(1280, 720);
    let mut harness = FrameHarness::new(HarnessConfig::default().with_extent(old_extent)).unwrap();

    for frame in 1..=10 {
        if frame == 3 {
            harness.resize(new_extent);
        }
        assert!(matches!(harness.render().unwrap(), FrameOutcome::Presented { .. }));
    }

    let events = harness.events();
    let presented = trace::positions(&events, |e| matches!(e, DeviceEvent::Presented { .. }));
    let acquired = trace::positions(&events, |e| matches!(e, DeviceEvent::Acquired { .. }));
    let created = trace::positions(&events, |e| matches!(e, DeviceEvent::SwapchainCreated(_)));
    assert_eq!((presented.len(), acquired.len()), (10, 10));
    assert_eq!(created.len(), 1);
    assert!(presented[1] < created[0] && created[0] < acquired[2]);

    let extents = trace::render_pass_extents(&events);
    assert_eq!(extents[..2], [old_extent; 2]);
    assert_eq!(extents[2..], [new_extent; 8]);

    let framebuffers: Vec<HeadlessFramebuffer> = events
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::RenderPassBegun { framebuffer, .. } => Some(*framebuffer),
            _ => None,
        })
        .collect();
    let before: HashSet<_> = framebuffers[..2].iter().copied().collect();
    assert!(framebuffers[2..].iter().all(|fb| !before.contains(fb)));

    let new_swapchain = trace::swapchains_created(&events)[0];
    assert!(events[presented[2]..].iter().all(|e| match e {
        DeviceEvent::Presented { swapchain, .. } => *swapchain == new_swapchain,
        _ => true,
    }));
    assert_eq!(harness.renderer.frame_counter(), 10);
    assert!(harness.violations().is_empty());
}

#[test]
fn stale_acquire_rebuilds_without_submitting() {
    let mut harness = FrameHarness::with_defaults().unwrap();
    harness.device.script_acquire_out_of_date(1);

    assert!(matches!(harness.render().unwrap(), FrameOutcome::Presented { .. }));

    let events = harness.events();
    let stale = trace::positions(&events, |e| *e == DeviceEvent::AcquireOutOfDate);
    let acquired = trace::positions(&events, |e| matches!(e, DeviceEvent::Acquired { .. }));
    let submitted = trace::positions(&events, |e| matches!(e, DeviceEvent::Submitted { .. }));
    let created = trace::positions(&events, |e| matches!(e, DeviceEvent::SwapchainCreated(_)));
    let idle = trace::positions(&events, |e| *e == DeviceEvent::WaitIdle);

    assert_eq!((stale.len(), acquired.len(), submitted.len()), (1, 1, 1));
    assert!(stale[0] < acquired[0] && acquired[0] < submitted[0]);
    // The rebuild sits between the stale acquisition and the retry.
    assert_eq!(created.len(), 1);
    assert!(stale[0] < idle[0] && idle[0] < created[0] && created[0] < acquired[0]);

    assert_eq!(harness.renderer.stats().swapchain_rebuilds, 1);
    assert_eq!(harness.renderer.frame_counter(), 1);
    assert_eq!(harness.device.submission_count(), 1);
    assert!(harness.violations().is_empty());
}
