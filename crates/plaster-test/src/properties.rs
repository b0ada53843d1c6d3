//! Behavioural properties of the frame core, checked against the fake device.

use std::thread;
use std::time::{Duration, Instant};

use plaster_core::Extent2d;
use plaster_frame::headless::{DeviceEvent, GpuCompletion, HeadlessConfig};
use plaster_frame::{FrameError, FrameOutcome, RendererConfig};

use crate::harness::{FrameHarness, HarnessConfig};
use crate::trace;

fn manual_completion(fence_timeout: Duration) -> HarnessConfig {
    HarnessConfig::default()
        .with_device(HeadlessConfig::default().with_completion(GpuCompletion::Manual))
        .with_renderer(RendererConfig::default().with_fence_timeout(fence_timeout))
}

fn slot_of(outcome: FrameOutcome) -> usize {
    match outcome {
        FrameOutcome::Presented { slot, .. } => slot,
        FrameOutcome::Deferred => panic!("frame was deferred"),
    }
}

// No command buffer is reset while its previous submission executes.

#[test]
fn slot_blocks_on_unfinished_work_instead_of_recording() {
    let mut harness = FrameHarness::new(manual_completion(Duration::from_millis(50))).unwrap();
    harness.render_frames(2).unwrap();
    assert_eq!(harness.device.pending_submissions(), 2);

    // Slot 0 comes round again while its first frame never completes.
    let err = harness.render().unwrap_err();
    assert!(matches!(err, FrameError::DeviceLost(_)), "{err:?}");

    let events = harness.events();
    let first_fence = trace::submissions(&events)[0].1;
    assert_eq!(trace::blocked_waits(&events), [first_fence]);
    assert_eq!(trace::first_reset_before_completion(&events), None);
    assert_eq!(harness.renderer.frame_counter(), 2);
    assert_eq!(harness.device.submission_count(), 2);
    assert!(harness.violations().is_empty());
}

#[test]
fn slot_resumes_once_its_fence_is_released() {
    let mut harness = FrameHarness::new(manual_completion(Duration::from_secs(5))).unwrap();
    harness.render_frames(2).unwrap();
    let first_fence = trace::submissions(&harness.events())[0].1;

    let release_after = Duration::from_millis(50);
    let device = harness.device.clone();
    let start = Instant::now();
    let releaser = thread::spawn(move || {
        thread::sleep(release_after);
        device.signal_fence(first_fence);
    });

    let outcome = harness.render().unwrap();
    assert!(start.elapsed() >= release_after);
    releaser.join().unwrap();

    assert_eq!(slot_of(outcome), 0);
    let events = harness.events();
    let signaled = trace::positions(&events, |e| *e == DeviceEvent::FenceSignaled(first_fence));
    let resets = trace::positions(&events, |e| matches!(e, DeviceEvent::CommandBufferReset(_)));
    assert_eq!(signaled.len(), 1);
    assert!(signaled[0] < resets[2]);
    assert_eq!(trace::first_reset_before_completion(&events), None);
    assert!(harness.violations().is_empty());
}

#[test]
fn no_reset_while_pending_across_image_orders() {
    let orders: [&[u32]; 4] = [
        &[0, 1, 2, 0, 1, 2, 0, 1, 2, 0],
        &[0, 0, 0, 0, 0, 0, 0, 0],
        &[2, 1, 0, 2, 1, 0, 1, 1, 2],
        &[1, 2, 2, 0, 1, 0, 0, 2, 1, 1, 0, 2],
    ];
    for order in orders {
        for frames_in_flight in 1..=3 {
            let config = HarnessConfig::default().with_renderer(
                RendererConfig::default().with_frames_in_flight(frames_in_flight),
            );
            let mut harness = FrameHarness::new(config).unwrap();
            harness.device.script_acquire_images(order);
            harness.render_frames(order.len()).unwrap();

            let events = harness.events();
            assert_eq!(trace::acquired_images(&events), order);
            assert_eq!(trace::first_reset_before_completion(&events), None);
            assert!(harness.violations().is_empty(), "{:?}", harness.violations());
        }
    }
}

// Frames map onto slots round-robin and the counter advances once per frame.

#[test]
fn frames_cycle_through_two_slots() {
    let mut harness = FrameHarness::with_defaults().unwrap();
    let slots: Vec<_> = harness.render_frames(8).unwrap().into_iter().map(slot_of).collect();
    assert_eq!(slots, [0, 1, 0, 1, 0, 1, 0, 1]);
    assert_eq!(harness.renderer.frame_counter(), 8);
    assert_eq!(harness.device.submission_count(), 8);
}

#[test]
fn frames_cycle_through_configured_slot_count() {
    let config = HarnessConfig::default()
        .with_renderer(RendererConfig::default().with_frames_in_flight(3));
    let mut harness = FrameHarness::new(config).unwrap();
    let slots: Vec<_> = harness.render_frames(7).unwrap().into_iter().map(slot_of).collect();
    assert_eq!(slots, [0, 1, 2, 0, 1, 2, 0]);
}

#[test]
fn deferred_frame_does_not_advance() {
    let mut harness = FrameHarness::with_defaults().unwrap();
    harness.render().unwrap();

    harness.resize(Extent2d::ZERO);
    assert_eq!(harness.render().unwrap(), FrameOutcome::Deferred);
    assert_eq!(harness.renderer.frame_counter(), 1);
    assert_eq!(harness.renderer.current_slot_index(), 1);

    harness.resize(Extent2d::new(640, 480));
    assert_eq!(slot_of(harness.render().unwrap()), 1);
    assert_eq!(harness.renderer.frame_counter(), 2);
}

// Consecutive resizes collapse into one rebuild.

#[test]
fn consecutive_resizes_rebuild_once_at_latest_extent() {
    let mut harness = FrameHarness::with_defaults().unwrap();
    harness.render().unwrap();

    for extent in [(1024, 768), (1280, 720), (320, 200), (1600, 900), (1920, 1080)] {
        harness.resize(Extent2d::new(extent.0, extent.1));
    }
    harness.render().unwrap();

    let events = harness.events();
    let created: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::SwapchainCreated(creation) => Some(*creation),
            _ => None,
        })
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].extent, Extent2d::new(1920, 1080));
    assert_eq!(harness.renderer.stats().swapchain_rebuilds, 1);
    assert_eq!(harness.renderer.extent(), Extent2d::new(1920, 1080));
    assert_eq!(harness.device.live_objects().swapchains, 1);
}

#[test]
fn repeated_recreate_requests_rebuild_once() {
    let mut harness = FrameHarness::with_defaults().unwrap();
    for _ in 0..4 {
        harness.renderer.request_recreate();
    }
    harness.render().unwrap();
    harness.render().unwrap();
    assert_eq!(trace::swapchains_created(&harness.events()).len(), 1);
    assert!(!harness.renderer.is_recreate_pending());
}

// Stale acquisitions are absorbed inside one call.

#[test]
fn stale_acquisitions_are_invisible_to_caller() {
    for stale in [1, 2, 5, 16] {
        let mut harness = FrameHarness::with_defaults().unwrap();
        harness.device.script_acquire_out_of_date(stale);

        let outcome = harness.render().unwrap();
        assert!(matches!(outcome, FrameOutcome::Presented { slot: 0, .. }));
        assert_eq!(harness.renderer.frame_counter(), 1);
        assert_eq!(harness.device.submission_count(), 1);

        let stats = harness.renderer.stats();
        assert_eq!(stats.acquire_retries, stale as u64);
        assert_eq!(stats.swapchain_rebuilds, stale as u64);
        assert!(harness.violations().is_empty());
    }
}

#[test]
fn exhausted_retries_defer_then_recover() {
    let config = HarnessConfig::default()
        .with_renderer(RendererConfig::default().with_max_acquire_retries(2));
    let mut harness = FrameHarness::new(config).unwrap();
    harness.device.script_acquire_out_of_date(3);

    assert_eq!(harness.render().unwrap(), FrameOutcome::Deferred);
    assert_eq!(harness.renderer.frame_counter(), 0);
    assert_eq!(harness.device.submission_count(), 0);
    assert!(harness.renderer.is_recreate_pending());

    assert!(matches!(harness.render().unwrap(), FrameOutcome::Presented { .. }));
    assert_eq!(harness.renderer.frame_counter(), 1);
    assert_eq!(harness.renderer.stats().frames_deferred, 1);
}

// More images than slots forces waits through the image tracker.

#[test]
fn image_reuse_waits_on_other_slot_fence() {
    let config = HarnessConfig::default().with_device(HeadlessConfig::default().with_image_count(3));
    let mut harness = FrameHarness::new(config).unwrap();
    assert_eq!(harness.renderer.image_count(), 3);
    assert_eq!(harness.renderer.frames_in_flight(), 2);

    harness.render_frames(5).unwrap();
    assert_eq!(trace::acquired_images(&harness.events()), [0, 1, 2, 0, 1]);
    // Frame 3 reuses image 0 from slot 0, frame 4 reuses image 1 from slot 1.
    assert!(harness.renderer.stats().tracker_waits >= 1);
    assert_eq!(harness.renderer.stats().tracker_waits, 2);
}

#[test]
fn matching_image_and_slot_counts_never_cross_wait() {
    let config = HarnessConfig::default().with_device(HeadlessConfig::default().with_image_count(2));
    let mut harness = FrameHarness::new(config).unwrap();
    harness.render_frames(6).unwrap();
    assert_eq!(harness.renderer.stats().tracker_waits, 0);
}

#[test]
fn tracker_wait_blocks_until_other_slot_completes() {
    let config = manual_completion(Duration::from_millis(50))
        .with_device(
            HeadlessConfig::default()
                .with_completion(GpuCompletion::Manual)
                .with_image_count(3),
        );
    let mut harness = FrameHarness::new(config).unwrap();
    // Slot 1 gets image 0 while slot 0 is still rendering into it.
    harness.device.script_acquire_images(&[0, 0]);
    harness.render().unwrap();

    let err = harness.render().unwrap_err();
    assert!(matches!(err, FrameError::DeviceLost(_)), "{err:?}");
    let events = harness.events();
    assert_eq!(trace::blocked_waits(&events), [trace::submissions(&events)[0].1]);
    assert_eq!(harness.device.submission_count(), 1);
    assert!(harness.violations().is_empty());
}
