// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-threaded playback scenarios. The test thread is both producer and
//! render thread; the manual clock makes every selection deterministic.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use frameflip_core::BufferWait;
use frameflip_core::flags::RenderFlags;
use frameflip_core::slot::SlotIndex;
use frameflip_core::slots::SlotState;
use frameflip_core::software::SoftwareFactory;
use frameflip_core::time::{frame_duration, msec_to_time};
use frameflip_core::timing::{DeinterlaceMethod, PresentField, PresentStep};
use frameflip_harness::{Rig, TestFrame};

#[test]
fn basic_playback_presents_each_frame_once_in_order() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(30.0, 0), Ok(()));
    let slots = rig.manager.slot_states().len();
    assert!((2..=6).contains(&slots), "buffer count {slots} out of range");

    let period = frame_duration(30.0);
    let pts: Vec<f64> = (0..3).map(|i| f64::from(i) * period).collect();
    for &p in &pts {
        assert!(rig.queue(p).is_some(), "slot available for pts {p}");
    }

    for _ in 0..3 {
        rig.tick();
        assert!(rig.partition_holds(), "pool stays a partition");
        let counts = rig.manager.slot_counts();
        assert_eq!(counts.total(), slots, "no slot lost or duplicated");
        rig.clock.advance(period);
    }

    let log = rig.log.lock();
    assert_eq!(log.selected_pts(), pts, "each frame once, in order");
    assert!(log.skipped.is_empty(), "clock never fell behind");
    assert_eq!(
        rig.probe.flips(),
        vec![SlotIndex(1), SlotIndex(2), SlotIndex(3)]
    );
}

#[test]
fn starvation_fails_without_touching_the_pool() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    assert!(rig.queue(0.0).is_some(), "first frame fits");
    assert!(rig.queue(40_000.0).is_some(), "second frame fits");

    let before = rig.manager.slot_states();
    let frame = TestFrame::yuv420(8, 8, 1);
    assert_eq!(rig.manager.add_picture(&frame.picture(80_000.0)), None);
    let stop = AtomicBool::new(false);
    let flipped = rig.manager.flip_page(
        &stop,
        80_000.0,
        DeinterlaceMethod::None,
        PresentField::None,
        false,
    );
    assert_eq!(flipped, None, "no free slot to queue");
    assert_eq!(rig.manager.slot_states(), before, "pool untouched");
    assert_eq!(rig.port.log().buffers, Some((2, 0, 0)));
}

#[test]
fn two_slot_pool_holds_a_single_pending_frame() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 2), Ok(()));
    assert!(rig.queue(0.0).is_some(), "the only free slot");
    assert_eq!(rig.queue(40_000.0), None);
}

#[test]
fn late_frames_are_skipped_to_the_newest_due_one() {
    let rig = Rig::with_refresh(240.0);
    assert_eq!(rig.configure(100.0, 5), Ok(()));
    for ms in [0.0, 10.0, 20.0, 30.0] {
        assert!(rig.queue(msec_to_time(ms)).is_some(), "slot for {ms}ms");
    }
    // Render pts lands on 25ms: two refresh periods of lookahead.
    rig.clock
        .set(msec_to_time(25.0) - 2.0 * frame_duration(240.0));
    rig.manager.frame_move();

    let log = rig.log.lock();
    assert_eq!(log.selected_pts(), vec![msec_to_time(20.0)]);
    assert_eq!(log.skipped_slots(), vec![SlotIndex(1), SlotIndex(2)]);
    drop(log);

    assert_eq!(rig.manager.presenting_slot(), Some(SlotIndex(3)));
    assert_eq!(rig.manager.slots_in(SlotState::Queued), vec![SlotIndex(4)]);
    assert_eq!(
        rig.probe.released(),
        vec![SlotIndex(1), SlotIndex(2), SlotIndex(0)],
        "skipped frames go through discard before release"
    );
    assert_eq!(rig.manager.stats().skipped, 2);
}

#[test]
fn frames_are_not_flipped_before_they_are_due() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    assert!(rig.queue(1_000_000.0).is_some(), "future frame queued");
    rig.tick();
    assert!(rig.log.lock().selected.is_empty(), "one second early");
    assert_eq!(rig.manager.present_step(), PresentStep::Ready);
}

#[test]
fn reverse_playback_treats_the_front_frame_as_due() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    assert!(rig.queue(1_000_000.0).is_some(), "future frame queued");
    rig.clock.set_speed(-1.0);
    rig.tick();
    assert_eq!(rig.log.lock().selected_pts(), vec![1_000_000.0]);
}

#[test]
fn identical_configure_keeps_pool_and_sync_state() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(30.0, 4), Ok(()));
    assert!(rig.queue(0.0).is_some(), "frame queued");
    rig.tick();
    assert!(rig.queue(33_333.0).is_some(), "frame queued");

    let states = rig.manager.slot_states();
    let sync = rig.manager.clock_sync();
    assert_eq!(rig.configure(30.0, 4), Ok(()));
    assert_eq!(rig.manager.slot_states(), states);
    assert_eq!(rig.manager.clock_sync(), sync);
    assert_eq!(rig.probe.configures(), 1, "backend configured once");
    assert_eq!(rig.port.log().params_changes, 1);
}

#[test]
fn changed_configure_resets_the_pool() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    assert!(rig.queue(0.0).is_some(), "frame queued");
    assert_eq!(rig.configure(50.0, 4), Ok(()));
    assert_eq!(
        rig.manager.slot_states(),
        vec![
            SlotState::Presenting,
            SlotState::Free,
            SlotState::Free,
            SlotState::Free
        ]
    );
    assert_eq!(rig.probe.configures(), 2);
    assert_eq!(
        rig.port.log().render_info.map(|i| i.max_buffer_size),
        Some(6)
    );
}

#[test]
fn suppressed_gui_drops_oldest_queued_frame() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    assert!(rig.queue(0.0).is_some(), "first frame queued");
    assert!(rig.queue(40_000.0).is_some(), "second frame queued");

    rig.display.set_render_gui(false);
    let stop = AtomicBool::new(false);
    let wait = rig
        .manager
        .wait_for_buffer(&stop, Duration::from_millis(10));
    assert_eq!(wait, BufferWait::Suppressed { dropped: 1 });
    assert_eq!(rig.manager.slots_in(SlotState::Discard), vec![SlotIndex(1)]);
    assert_eq!(rig.manager.slots_in(SlotState::Queued), vec![SlotIndex(2)]);
    assert_eq!(rig.log.lock().dropped, 1);
}

#[test]
fn repeated_buffer_timeouts_suppress_gui() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 2), Ok(()));
    assert!(rig.queue(0.0).is_some(), "pool now full");

    let stop = AtomicBool::new(false);
    for attempt in 0..3 {
        assert_eq!(
            rig.manager
                .wait_for_buffer(&stop, Duration::from_millis(1)),
            BufferWait::Unavailable,
            "attempt {attempt} times out"
        );
    }
    assert_eq!(
        rig.manager
            .wait_for_buffer(&stop, Duration::from_millis(1)),
        BufferWait::Suppressed { dropped: 1 }
    );

    // The render thread releases the backlog regardless of retention.
    rig.manager.frame_move();
    assert_eq!(
        rig.manager
            .wait_for_buffer(&stop, Duration::from_millis(1)),
        BufferWait::Available { level: 0 }
    );
}

#[test]
fn retained_pages_stay_out_of_the_free_pool() {
    let rig = Rig::new(SoftwareFactory::new().with_retained_frames(1), 60.0);
    assert_eq!(rig.configure(25.0, 4), Ok(()));
    for i in 0..3 {
        assert!(rig.queue(f64::from(i) * 40_000.0).is_some(), "frame {i}");
    }
    rig.tick();
    rig.clock.advance(40_000.0);
    rig.tick();

    // Slot 1 was replaced by slot 2 but the backend still reads it.
    assert_eq!(rig.manager.presenting_slot(), Some(SlotIndex(2)));
    assert_eq!(rig.manager.slots_in(SlotState::Discard), vec![SlotIndex(1)]);
    assert!(rig.partition_holds(), "retention keeps the partition");
}

#[test]
fn skipped_frames_are_reclaimed_past_retained_pages() {
    let rig = Rig::new(SoftwareFactory::new().with_retained_frames(2), 60.0);
    assert_eq!(rig.configure(25.0, 5), Ok(()));
    let lookahead = 2.0 * frame_duration(60.0);

    for pts in [0.0, 40_000.0] {
        let slot = rig.queue(pts).expect("free slot");
        rig.clock.set(pts - lookahead);
        rig.tick();
        assert_eq!(rig.manager.presenting_slot(), Some(slot));
    }

    // 80ms is overtaken by a full frame and never reaches the backend.
    assert!(rig.queue(80_000.0).is_some(), "late frame queued");
    let current = rig.queue(120_000.0).expect("current frame queued");
    rig.clock.set(140_000.0 - lookahead);
    rig.tick();
    assert_eq!(rig.manager.presenting_slot(), Some(current));

    let skipped = rig.log.lock().skipped_slots();
    assert_eq!(skipped.len(), 1, "one frame skipped");
    assert!(!rig.probe.flips().contains(&skipped[0]));
    assert!(rig.probe.released().contains(&skipped[0]));

    let discard = rig.manager.slots_in(SlotState::Discard);
    assert!(!discard.contains(&skipped[0]), "skipped slot freed");
    assert_eq!(discard.len(), 2, "both retained pages stay out");
    assert!(rig.partition_holds());
}

#[test]
fn bob_renders_both_fields_of_a_frame() {
    let rig = Rig::new(SoftwareFactory::new().with_double_pass(), 60.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    let frame = TestFrame::yuv420(8, 8, 90);
    assert!(rig.manager.add_picture(&frame.picture(0.0)).is_some(), "fits");
    let stop = AtomicBool::new(false);
    let queued = rig.manager.flip_page(
        &stop,
        0.0,
        DeinterlaceMethod::Auto,
        PresentField::Top,
        false,
    );
    assert_eq!(queued, Some(SlotIndex(1)));

    rig.manager.frame_move();
    rig.manager.render(true, RenderFlags::empty(), 255, true);
    assert_eq!(rig.manager.present_step(), PresentStep::Frame2);
    rig.manager.render(true, RenderFlags::empty(), 255, true);
    assert_eq!(rig.manager.present_step(), PresentStep::Idle);

    let flags: Vec<RenderFlags> = rig.probe.passes().iter().map(|p| p.flags).collect();
    assert_eq!(
        flags,
        vec![
            RenderFlags::TOP | RenderFlags::FIELD0,
            RenderFlags::BOT | RenderFlags::FIELD1
        ]
    );
}

#[test]
fn video_layer_backend_draws_outside_the_gui_pass() {
    let rig = Rig::new(SoftwareFactory::new().as_video_layer(), 60.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    assert!(rig.queue(0.0).is_some(), "frame queued");
    rig.manager.frame_move();
    let configured_updates = rig.probe.updates();

    rig.manager.render(true, RenderFlags::empty(), 255, true);
    assert!(rig.probe.passes().is_empty(), "no drawing in the GUI pass");
    assert_eq!(rig.probe.updates(), configured_updates + 1);

    rig.manager.render(true, RenderFlags::empty(), 255, false);
    assert_eq!(rig.probe.passes().len(), 1);
    assert!(rig.manager.is_video_layer());
    assert!(!rig.manager.is_gui_layer());
}

#[test]
fn presenting_follows_page_flips() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    assert!(!rig.manager.is_presenting(), "nothing flipped yet");
    assert!(rig.queue(0.0).is_some(), "frame queued");
    rig.tick();
    assert!(rig.manager.is_presenting());
    assert!(rig.manager.is_gui_layer());
}

#[test]
fn render_thread_flush_returns_every_slot() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 4), Ok(()));
    for i in 0..3 {
        assert!(rig.queue(f64::from(i) * 40_000.0).is_some(), "frame {i}");
    }
    rig.tick();
    assert_eq!(rig.manager.flush(), Ok(()));
    let counts = rig.manager.slot_counts();
    assert_eq!((counts.queued, counts.discard, counts.free), (0, 0, 3));
    assert_eq!(rig.manager.present_step(), PresentStep::Idle);
    assert_eq!(rig.probe.flushes(), 1);
}

#[test]
fn stats_report_presentation_time() {
    let rig = Rig::with_refresh(50.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    assert!(rig.queue(80_000.0).is_some(), "frame queued");
    rig.clock.set(80_000.0);
    rig.manager.frame_move();
    let stats = rig.manager.stats();
    // Clock sync is active at 50Hz/25fps and centers the render pts.
    assert!(rig.manager.clock_sync().enabled, "integer refresh multiple");
    assert_eq!(stats.present_pts, 80_000.0 - 2.0 * frame_duration(50.0));
    assert_eq!(stats.late_frames, 0);
    assert_eq!(stats.queued, 0);
}
