// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A real producer thread against a render loop on the test thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use frameflip_core::backend::VideoParams;
use frameflip_core::config::RenderConfig;
use frameflip_core::error::RenderError;
use frameflip_core::flags::ConfigFlags;
use frameflip_core::format::RenderFormat;
use frameflip_core::software::SoftwareFactory;
use frameflip_core::time::frame_duration;
use frameflip_core::timing::{DeinterlaceMethod, PresentField, PresentStep, RenderState};
use frameflip_core::trace::SharedSink;
use frameflip_core::{BufferWait, RenderManager};
use frameflip_debug::recorder::{RecordedEvent, RecorderSink, decode};
use frameflip_harness::{Rig, TestFrame, fast_config};

const FRAMES: u32 = 60;
const MAX_TICKS: usize = 20_000;

fn produce(manager: &RenderManager, frames: u32, fps: f64) -> u32 {
    let frame = TestFrame::yuv420(8, 8, 120);
    let stop = AtomicBool::new(false);
    let mut queued = 0;
    for index in 0..frames {
        let pts = f64::from(index) * frame_duration(fps);
        while !matches!(
            manager.wait_for_buffer(&stop, Duration::from_millis(50)),
            BufferWait::Available { .. }
        ) {}
        if manager.add_picture(&frame.picture(pts)).is_none() {
            continue;
        }
        let flipped = manager.flip_page(
            &stop,
            pts,
            DeinterlaceMethod::None,
            PresentField::None,
            false,
        );
        if flipped.is_some() {
            queued += 1;
        }
    }
    queued
}

/// Runs render ticks until `done` holds, sleeping briefly between them.
fn render_until(rig: &Rig, mut done: impl FnMut() -> bool) {
    let mut ticks = 0;
    while !done() {
        rig.tick_and_advance();
        thread::sleep(Duration::from_millis(1));
        ticks += 1;
        assert!(ticks < MAX_TICKS, "render loop made no progress");
    }
}

/// Configures from a second thread, ticking the render loop meanwhile if
/// `ticking`.
fn configure_off_thread(rig: &Rig, params: VideoParams, ticking: bool) -> Result<(), RenderError> {
    let manager = Arc::clone(&rig.manager);
    let configurer = thread::spawn(move || manager.configure(params));
    let mut ticks = 0;
    while !configurer.is_finished() {
        if ticking {
            rig.tick();
        }
        thread::sleep(Duration::from_millis(1));
        ticks += 1;
        assert!(ticks < MAX_TICKS, "configure never returned");
    }
    configurer.join().expect("configure thread panicked")
}

fn planar(buffers: usize) -> VideoParams {
    VideoParams::new(8, 8, 25.0, RenderFormat::Yuv420p).with_buffers(buffers)
}

#[test]
fn every_produced_frame_is_accounted_for() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 4), Ok(()));
    let recorder = SharedSink::new(RecorderSink::new());
    rig.manager.set_trace_sink(Box::new(recorder.clone()));

    let manager = Arc::clone(&rig.manager);
    let producer = thread::spawn(move || produce(&manager, FRAMES, 25.0));
    render_until(&rig, || {
        producer.is_finished() && rig.manager.slot_counts().queued == 0
    });
    let queued = producer.join().expect("producer thread panicked");
    assert_eq!(queued, FRAMES, "every frame found a slot");
    assert!(rig.partition_holds());

    let (mut enqueued, mut selected, mut skipped, mut dropped) = (0, 0, 0, 0);
    for event in decode(recorder.lock().as_bytes()) {
        match event {
            RecordedEvent::FrameQueued(_) => enqueued += 1,
            RecordedEvent::FrameSelected(_) => selected += 1,
            RecordedEvent::FrameSkipped(_) => skipped += 1,
            RecordedEvent::BacklogDrop(e) => dropped += e.dropped,
            _ => {}
        }
    }
    assert_eq!(enqueued, FRAMES as usize);
    assert_eq!(
        selected + skipped + dropped,
        FRAMES as usize,
        "selected {selected}, skipped {skipped}, dropped {dropped}"
    );
    assert_eq!(rig.probe.flips().len(), selected);
}

#[test]
fn blocking_flip_returns_once_picked_up() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 4), Ok(()));
    let manager = Arc::clone(&rig.manager);
    let producer = thread::spawn(move || {
        let frame = TestFrame::yuv420(8, 8, 50);
        let stop = AtomicBool::new(false);
        let slot = manager.add_picture(&frame.picture(0.0))?;
        manager.flip_page(
            &stop,
            0.0,
            DeinterlaceMethod::None,
            PresentField::None,
            true,
        )?;
        Some(slot)
    });
    render_until(&rig, || producer.is_finished());
    let slot = producer.join().expect("producer thread panicked");
    assert!(slot.is_some(), "the frame was queued");
    assert_eq!(rig.manager.presenting_slot(), slot);
}

#[test]
fn off_thread_flush_runs_on_the_next_tick() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 4), Ok(()));
    for pts in [0.0, 40_000.0, 80_000.0] {
        assert!(rig.queue(pts).is_some(), "slot for {pts}");
    }
    rig.tick();

    let manager = Arc::clone(&rig.manager);
    let flusher = thread::spawn(move || manager.flush());
    let mut ticks = 0;
    while !flusher.is_finished() {
        rig.manager.frame_move();
        thread::sleep(Duration::from_millis(1));
        ticks += 1;
        assert!(ticks < MAX_TICKS, "flush was never picked up");
    }
    assert_eq!(flusher.join().expect("flush thread panicked"), Ok(()));
    assert_eq!(rig.manager.slot_counts().free, 3);
    assert_eq!(rig.manager.slot_counts().queued, 0);
    assert_eq!(rig.probe.flushes(), 1);
}

#[test]
fn off_thread_configure_is_applied_by_frame_move() {
    let rig = Rig::with_refresh(60.0);
    let manager = Arc::clone(&rig.manager);
    let configurer = thread::spawn(move || {
        manager.configure(
            VideoParams::new(8, 8, 25.0, RenderFormat::Yuv420p)
                .with_buffers(3)
                .with_flags(ConfigFlags::FULLSCREEN),
        )
    });
    let mut ticks = 0;
    while !configurer.is_finished() {
        rig.manager.frame_move();
        thread::sleep(Duration::from_millis(1));
        ticks += 1;
        assert!(ticks < MAX_TICKS, "configure was never picked up");
    }
    assert_eq!(configurer.join().expect("configure thread panicked"), Ok(()));
    assert!(rig.manager.is_configured());
    assert!(rig.display.fullscreen_requested(), "fullscreen flag honored");
    assert_eq!(rig.manager.slot_states().len(), 3);
}

#[test]
fn configure_recovers_after_the_render_thread_missed_it() {
    let rig = Rig::with_refresh(60.0);
    let missed = configure_off_thread(&rig, planar(3), false);
    assert!(
        matches!(
            missed,
            Err(RenderError::Timeout {
                operation: "configure",
                ..
            })
        ),
        "got {missed:?}"
    );
    assert_eq!(rig.manager.render_state(), RenderState::Unconfigured);
    assert_eq!(rig.manager.present_step(), PresentStep::Idle);

    assert_eq!(configure_off_thread(&rig, planar(3), true), Ok(()));
    assert!(rig.manager.is_configured());
    assert_eq!(rig.manager.slot_states().len(), 3);
}

#[test]
fn configure_recovers_after_the_backend_refused() {
    let rig = Rig::with_refresh(60.0);
    let hardware = VideoParams::new(8, 8, 25.0, RenderFormat::Vaapi);
    assert_eq!(
        configure_off_thread(&rig, hardware, true),
        Err(RenderError::ConfigureFailed)
    );
    assert_eq!(rig.manager.present_step(), PresentStep::Idle);

    assert_eq!(configure_off_thread(&rig, planar(4), true), Ok(()));
    assert_eq!(rig.manager.slot_states().len(), 4);
}

#[test]
fn raised_stop_ends_a_blocking_flip() {
    let config = RenderConfig {
        flip_wait_timeout_ms: 10_000,
        ..fast_config()
    };
    let rig = Rig::with_config(SoftwareFactory::new(), 60.0, config);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    let stop = Arc::new(AtomicBool::new(false));

    let manager = Arc::clone(&rig.manager);
    let flag = Arc::clone(&stop);
    let started = Instant::now();
    let producer = thread::spawn(move || {
        let frame = TestFrame::yuv420(8, 8, 60);
        manager.add_picture(&frame.picture(0.0))?;
        manager.flip_page(
            &flag,
            0.0,
            DeinterlaceMethod::None,
            PresentField::None,
            true,
        )
    });
    // The render loop never runs, so only the flag can end the wait.
    thread::sleep(Duration::from_millis(30));
    stop.store(true, Ordering::Release);
    let queued = producer.join().expect("producer thread panicked");

    assert!(started.elapsed() < Duration::from_secs(5), "flag ended the wait");
    assert!(queued.is_some(), "the frame stays queued");
    assert_eq!(rig.manager.slot_counts().queued, 1);
    assert_eq!(rig.manager.present_step(), PresentStep::Ready);
}

#[test]
fn raised_stop_ends_a_buffer_wait() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 2), Ok(()));
    assert!(rig.queue(0.0).is_some(), "pool is now full");

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let raiser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        flag.store(true, Ordering::Release);
    });
    let started = Instant::now();
    let wait = rig.manager.wait_for_buffer(&stop, Duration::from_secs(10));
    raiser.join().expect("raiser thread panicked");

    assert_eq!(wait, BufferWait::Unavailable);
    assert!(started.elapsed() < Duration::from_secs(5), "flag ended the wait");
    assert_eq!(rig.manager.slot_counts().queued, 1, "nothing dropped");
}

#[test]
fn off_thread_flush_times_out_without_a_render_loop() {
    let rig = Rig::with_refresh(60.0);
    assert_eq!(rig.configure(25.0, 3), Ok(()));
    assert!(rig.queue(0.0).is_some(), "frame queued");

    let manager = Arc::clone(&rig.manager);
    let flushed = thread::spawn(move || manager.flush())
        .join()
        .expect("flush thread panicked");
    assert!(
        matches!(
            flushed,
            Err(RenderError::Timeout {
                operation: "flush",
                ..
            })
        ),
        "got {flushed:?}"
    );

    // The abandoned request is not replayed by a later tick.
    rig.manager.frame_move();
    assert_eq!(rig.probe.flushes(), 0);
}
