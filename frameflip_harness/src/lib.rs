// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic test doubles for driving a [`RenderManager`].
//!
//! - [`ManualClock`]: a [`ClockSource`] that only moves when told to and
//!   records every vsync adjustment.
//! - [`RecordingPort`]: a [`PlayerPort`] that keeps the last notification
//!   of each kind.
//! - [`TestFrame`]: owned pixel data that lends out [`VideoPicture`]s.
//! - [`SelectionLog`]: a [`TraceSink`] that keeps selection decisions.
//! - [`Rig`]: all of the above wired to a software backend, with
//!   one-call producer and render-tick helpers.
//!
//! The thread that builds a [`Rig`] is the manager's render thread.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use parking_lot::Mutex;

use frameflip_core::RenderManager;
use frameflip_core::backend::{RenderInfo, VideoParams};
use frameflip_core::clock::{ClockInfo, ClockSource};
use frameflip_core::config::RenderConfig;
use frameflip_core::display::{DisplayContext, FixedDisplay};
use frameflip_core::error::RenderError;
use frameflip_core::flags::RenderFlags;
use frameflip_core::format::RenderFormat;
use frameflip_core::picture::{VideoPicture, plane_geometry};
use frameflip_core::port::PlayerPort;
use frameflip_core::slot::SlotIndex;
use frameflip_core::slots::SlotState;
use frameflip_core::software::{RenderProbe, SoftwareFactory};
use frameflip_core::time::{MediaTime, frame_duration};
use frameflip_core::timing::{DeinterlaceMethod, PresentField};
use frameflip_core::trace::{
    BacklogDropEvent, ClockSyncEvent, FrameSelectedEvent, FrameSkippedEvent, SharedSink,
    TraceSink,
};

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ManualState {
    now: MediaTime,
    speed: f64,
    info: Option<ClockInfo>,
    vsync_adjust: MediaTime,
    adjustments: Vec<MediaTime>,
}

/// A clock that stands still between explicit updates.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

impl ManualClock {
    /// A clock reading `start`, at normal speed, without reference-clock
    /// details.
    #[must_use]
    pub fn new(start: MediaTime) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: start,
                speed: 1.0,
                info: None,
                vsync_adjust: 0.0,
                adjustments: Vec::new(),
            }),
        }
    }

    /// Sets the reading.
    pub fn set(&self, now: MediaTime) {
        self.state.lock().now = now;
    }

    /// Moves the reading by `delta`.
    pub fn advance(&self, delta: MediaTime) {
        self.state.lock().now += delta;
    }

    /// Sets the playback speed.
    pub fn set_speed(&self, speed: f64) {
        self.state.lock().speed = speed;
    }

    /// Sets the reference-clock details reported to the manager.
    pub fn set_clock_info(&self, info: Option<ClockInfo>) {
        self.state.lock().info = info;
    }

    /// The vsync adjustment currently published.
    #[must_use]
    pub fn vsync_adjust(&self) -> MediaTime {
        self.state.lock().vsync_adjust
    }

    /// Every change of the vsync adjustment, in order.
    #[must_use]
    pub fn adjustments(&self) -> Vec<MediaTime> {
        self.state.lock().adjustments.clone()
    }
}

impl ClockSource for ManualClock {
    fn clock(&self) -> MediaTime {
        self.state.lock().now
    }

    fn speed(&self) -> f64 {
        self.state.lock().speed
    }

    fn clock_info(&self) -> Option<ClockInfo> {
        self.state.lock().info
    }

    fn set_vsync_adjust(&self, adjust: MediaTime) {
        let mut state = self.state.lock();
        if state.vsync_adjust != adjust {
            state.adjustments.push(adjust);
        }
        state.vsync_adjust = adjust;
    }
}

// ---------------------------------------------------------------------------
// RecordingPort
// ---------------------------------------------------------------------------

/// Snapshot of everything a [`RecordingPort`] has been told.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortLog {
    /// Last reported backend capabilities.
    pub render_info: Option<RenderInfo>,
    /// Last reported `(queued, discard, free)` levels.
    pub buffers: Option<(usize, usize, usize)>,
    /// Number of buffer-level reports.
    pub buffer_reports: usize,
    /// Number of video-parameter change notifications.
    pub params_changes: usize,
    /// Last clock-sync evaluation.
    pub clock_sync: Option<bool>,
}

/// A [`PlayerPort`] that records notifications.
#[derive(Debug, Default)]
pub struct RecordingPort {
    log: Mutex<PortLog>,
}

impl RecordingPort {
    /// An empty port.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What has been reported so far.
    #[must_use]
    pub fn log(&self) -> PortLog {
        *self.log.lock()
    }
}

impl PlayerPort for RecordingPort {
    fn update_render_info(&self, info: &RenderInfo) {
        self.log.lock().render_info = Some(*info);
    }

    fn update_render_buffers(&self, queued: usize, discard: usize, free: usize) {
        let mut log = self.log.lock();
        log.buffers = Some((queued, discard, free));
        log.buffer_reports += 1;
    }

    fn video_params_change(&self) {
        self.log.lock().params_changes += 1;
    }

    fn update_clock_sync(&self, enabled: bool) {
        self.log.lock().clock_sync = Some(enabled);
    }
}

// ---------------------------------------------------------------------------
// TestFrame
// ---------------------------------------------------------------------------

/// Tightly packed pixel data for one picture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestFrame {
    format: RenderFormat,
    width: u32,
    height: u32,
    planes: [Vec<u8>; 3],
    strides: [usize; 3],
}

impl TestFrame {
    /// A frame with every luma sample set to `luma` and neutral chroma.
    #[must_use]
    pub fn solid(format: RenderFormat, width: u32, height: u32, luma: u8) -> Self {
        let geometry = plane_geometry(format, width, height);
        let planes = [0, 1, 2].map(|i| {
            let (row_bytes, rows) = geometry[i];
            let fill = if i == 0 { luma } else { 128 };
            vec![fill; row_bytes * rows]
        });
        Self {
            format,
            width,
            height,
            planes,
            strides: geometry.map(|(row_bytes, _)| row_bytes),
        }
    }

    /// A planar 8-bit 4:2:0 frame.
    #[must_use]
    pub fn yuv420(width: u32, height: u32, luma: u8) -> Self {
        Self::solid(RenderFormat::Yuv420p, width, height, luma)
    }

    /// Borrows the frame as a picture due at `pts`.
    #[must_use]
    pub fn picture(&self, pts: MediaTime) -> VideoPicture<'_> {
        VideoPicture::new(
            self.format,
            self.width,
            self.height,
            [&self.planes[0], &self.planes[1], &self.planes[2]],
            self.strides,
        )
        .with_pts(pts)
    }
}

// ---------------------------------------------------------------------------
// SelectionLog
// ---------------------------------------------------------------------------

/// Selection decisions observed through the trace sink.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionLog {
    /// Presented frames, in order.
    pub selected: Vec<FrameSelectedEvent>,
    /// Skipped frames, in order.
    pub skipped: Vec<FrameSkippedEvent>,
    /// Published clock-sync offsets.
    pub sync_offsets: Vec<MediaTime>,
    /// Frames dropped while the GUI was suppressed.
    pub dropped: usize,
}

impl SelectionLog {
    /// Timestamps of presented frames, in order.
    #[must_use]
    pub fn selected_pts(&self) -> Vec<MediaTime> {
        self.selected.iter().map(|e| e.pts).collect()
    }

    /// Slots of skipped frames, in order.
    #[must_use]
    pub fn skipped_slots(&self) -> Vec<SlotIndex> {
        self.skipped.iter().map(|e| e.slot).collect()
    }
}

impl TraceSink for SelectionLog {
    fn on_frame_selected(&mut self, e: &FrameSelectedEvent) {
        self.selected.push(*e);
    }

    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        self.skipped.push(*e);
    }

    fn on_clock_sync(&mut self, e: &ClockSyncEvent) {
        self.sync_offsets.push(e.sync_offset);
    }

    fn on_backlog_drop(&mut self, e: &BacklogDropEvent) {
        self.dropped += e.dropped;
    }
}

// ---------------------------------------------------------------------------
// Partition audit
// ---------------------------------------------------------------------------

/// Returns `true` if `states` has exactly one presenting slot.
///
/// Every slot carries one state, so this is the whole partition check once
/// the pool is non-empty.
#[must_use]
pub fn is_partition(states: &[SlotState]) -> bool {
    states
        .iter()
        .filter(|state| **state == SlotState::Presenting)
        .count()
        == 1
}

// ---------------------------------------------------------------------------
// Rig
// ---------------------------------------------------------------------------

/// Timeouts short enough that failing waits do not slow tests down.
#[must_use]
pub fn fast_config() -> RenderConfig {
    RenderConfig {
        drain_timeout_ms: 100,
        configure_timeout_ms: 500,
        flip_wait_timeout_ms: 20,
        flip_wait_poll_ms: 2,
        buffer_poll_ms: 2,
        flush_timeout_ms: 1000,
        post_configure_wait_ms: 0,
        presenting_hold_ms: 1000,
        ..RenderConfig::default()
    }
}

/// A manager wired to deterministic collaborators and a software backend.
#[derive(Debug)]
pub struct Rig {
    /// The manager under test.
    pub manager: Arc<RenderManager>,
    /// Its clock.
    pub clock: Arc<ManualClock>,
    /// Its display.
    pub display: Arc<FixedDisplay>,
    /// Its player port.
    pub port: Arc<RecordingPort>,
    /// Observes the software backend.
    pub probe: RenderProbe,
    /// Selection decisions.
    pub log: SharedSink<SelectionLog>,
    frame: TestFrame,
    stop: AtomicBool,
}

impl Rig {
    /// Builds a rig around `factory` on a display refreshing at `refresh_rate`.
    #[must_use]
    pub fn new(factory: SoftwareFactory, refresh_rate: f64) -> Self {
        Self::with_config(factory, refresh_rate, fast_config())
    }

    /// [`new`](Self::new) with explicit manager configuration.
    #[must_use]
    pub fn with_config(factory: SoftwareFactory, refresh_rate: f64, config: RenderConfig) -> Self {
        let clock = Arc::new(ManualClock::new(0.0));
        let display = Arc::new(FixedDisplay::new(refresh_rate));
        let port = Arc::new(RecordingPort::new());
        let probe = factory.probe();
        let manager = RenderManager::new(
            Arc::clone(&clock) as Arc<dyn ClockSource>,
            Arc::clone(&display) as Arc<dyn DisplayContext>,
            Arc::clone(&port) as Arc<dyn PlayerPort>,
            Box::new(factory),
        )
        .with_config(config);
        let log = SharedSink::new(SelectionLog::default());
        manager.set_trace_sink(Box::new(log.clone()));
        Self {
            manager: Arc::new(manager),
            clock,
            display,
            port,
            probe,
            log,
            frame: TestFrame::yuv420(8, 8, 200),
            stop: AtomicBool::new(false),
        }
    }

    /// A rig with default software backend options.
    #[must_use]
    pub fn with_refresh(refresh_rate: f64) -> Self {
        Self::new(SoftwareFactory::new(), refresh_rate)
    }

    /// Configures an 8x8 planar stream at `fps` with `buffers` slots.
    pub fn configure(&self, fps: f64, buffers: usize) -> Result<(), RenderError> {
        self.manager.configure(
            VideoParams::new(8, 8, fps, RenderFormat::Yuv420p).with_buffers(buffers),
        )
    }

    /// Adds and queues one picture due at `pts`. `None` when starved.
    pub fn queue(&self, pts: MediaTime) -> Option<SlotIndex> {
        let filled = self.manager.add_picture(&self.frame.picture(pts))?;
        let queued = self.manager.flip_page(
            &self.stop,
            pts,
            DeinterlaceMethod::None,
            PresentField::None,
            false,
        );
        debug_assert_eq!(queued, Some(filled), "flip queues the slot just filled");
        queued
    }

    /// One render tick: select and flip, then draw the GUI pass.
    pub fn tick(&self) {
        self.manager.frame_move();
        self.manager.render(true, RenderFlags::empty(), 255, true);
    }

    /// [`tick`](Self::tick), then advance the clock by one refresh period.
    pub fn tick_and_advance(&self) {
        self.tick();
        self.clock.advance(frame_duration(self.display_refresh()));
    }

    /// Current display refresh rate.
    #[must_use]
    pub fn display_refresh(&self) -> f64 {
        self.display.refresh_rate()
    }

    /// Whether the slot pool is currently a valid partition.
    #[must_use]
    pub fn partition_holds(&self) -> bool {
        is_partition(&self.manager.slot_states())
    }
}
