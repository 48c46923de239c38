// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render manager: a producer/render-thread handoff for video frames.
//!
//! A producer (decoder) thread fills slots and queues them; the render
//! thread selects which queued frame to show each tick, flips the backend
//! to it and draws it:
//!
//! ```text
//!   producer                                   render thread
//!   ────────                                   ─────────────
//!   configure() ───── Configuring ──────────►  frame_move(): configure backend
//!   wait_for_buffer()                          frame_move(): select frame, flip page,
//!   add_picture()  ── fill free slot                         reclaim discards
//!   flip_page()    ── free → queued ────────►  render():     draw presenting slot
//! ```
//!
//! # Locks
//!
//! Three locks guard the manager, always acquired in this order:
//!
//! 1. **state**: configuration state and stream parameters.
//! 2. **present**: the slot pool, present step, frame-selection and
//!    clock-sync state. Its condvar is the "present event" that blocking
//!    producer calls wait on.
//! 3. **data**: the backend.
//!
//! A method may skip a lock but never takes an earlier one while holding a
//! later one.
//!
//! # Threads
//!
//! The thread that constructs the manager is its render thread until
//! [`bind_render_thread`](RenderManager::bind_render_thread) says otherwise.
//! [`pre_init`](RenderManager::pre_init) and [`un_init`](RenderManager::un_init)
//! are rejected elsewhere; [`configure`](RenderManager::configure) and
//! [`flush`](RenderManager::flush) run inline on the render thread and are
//! marshaled to it from any other thread.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::backend::{
    RenderBackend, RenderFeature, RenderInfo, RendererFactory, ScalingMethod, VideoParams,
    VideoRect, ViewMode,
};
use crate::clock::ClockSource;
use crate::config::RenderConfig;
use crate::display::DisplayContext;
use crate::error::RenderError;
use crate::event::Event;
use crate::flags::{ConfigFlags, RenderFlags};
use crate::format::RenderFormat;
use crate::picture::{self, VideoPicture};
use crate::port::PlayerPort;
use crate::present::present as present_page;
use crate::scheduler::{ClockSync, clock_sync_eligible, frames_late, is_due, select_frame};
use crate::slot::SlotIndex;
use crate::slots::{SlotCounts, SlotPool, SlotState};
use crate::time::{MediaTime, NOPTS, frame_duration, msec_to_time, sec_to_time, time_to_duration};
use crate::timing::{
    DeinterlaceMethod, PresentField, PresentStep, RenderState, present_method, step_after_render,
};
use crate::trace::{
    BacklogDropEvent, ClockSyncEvent, FrameQueuedEvent, FrameSelectedEvent, FrameSkippedEvent,
    PageFlipEvent, RenderPassEvent, TraceSink,
};

/// Slot count before the first configuration.
const INITIAL_QUEUE_SIZE: usize = 2;

/// Longest a suppressed-GUI buffer wait sleeps before dropping a frame.
const SUPPRESSED_SLEEP: Duration = Duration::from_millis(20);

/// Consecutive timed-out buffer waits after which GUI rendering is assumed
/// suppressed.
const BUFFER_WAIT_ESCALATION: u32 = 2;

/// Outcome of [`RenderManager::wait_for_buffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferWait {
    /// A free slot exists; `level` frames are queued or awaiting release.
    Available {
        /// Queued plus discarded slots.
        level: usize,
    },
    /// GUI rendering is suppressed; the oldest queued frame was dropped
    /// instead of waiting.
    Suppressed {
        /// Frames dropped by this call.
        dropped: usize,
    },
    /// No slot became free in time, or the stop flag was raised.
    Unavailable,
}

impl BufferWait {
    /// Buffer level, `0` when suppressed, `None` when unavailable.
    #[must_use]
    pub const fn level(self) -> Option<usize> {
        match self {
            Self::Available { level } => Some(level),
            Self::Suppressed { .. } => Some(0),
            Self::Unavailable => None,
        }
    }
}

/// Presentation counters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderStats {
    /// Accumulated late frames, divided by ten.
    pub late_frames: i32,
    /// Media time the presenting frame was due on screen.
    pub present_pts: MediaTime,
    /// Queued slots.
    pub queued: usize,
    /// Slots awaiting release.
    pub discard: usize,
    /// Free slots.
    pub free: usize,
    /// Frames skipped by late-frame selection since configuration.
    pub skipped: u64,
}

struct StateData {
    state: RenderState,
    params: VideoParams,
    /// Seconds.
    display_latency: f64,
    video_delay_ms: f64,
    trigger_update_resolution: bool,
    debug: bool,
}

struct PresentData {
    slots: SlotPool,
    queue_size: usize,
    step: PresentStep,
    force_next: bool,
    late_frames: i32,
    present_pts: MediaTime,
    skipped: u64,
    clock_sync: ClockSync,
    render_gui: bool,
    wait_for_buffer_count: u32,
    presenting_until: Option<Instant>,
    sink: Option<Box<dyn TraceSink>>,
}

impl PresentData {
    fn new() -> Self {
        Self {
            slots: SlotPool::new(INITIAL_QUEUE_SIZE),
            queue_size: INITIAL_QUEUE_SIZE,
            step: PresentStep::Idle,
            force_next: false,
            late_frames: 0,
            present_pts: NOPTS,
            skipped: 0,
            clock_sync: ClockSync::default(),
            render_gui: true,
            wait_for_buffer_count: 0,
            presenting_until: None,
            sink: None,
        }
    }

    fn trace(&mut self, emit: impl FnOnce(&mut dyn TraceSink)) {
        if let Some(sink) = self.sink.as_deref_mut() {
            emit(sink);
        }
    }

    fn reset_slots(&mut self) {
        let size = self.queue_size;
        self.slots.reset(size);
        self.step = PresentStep::Idle;
        self.present_pts = NOPTS;
    }
}

/// Per-tick values read under the state lock.
#[derive(Clone, Copy, Debug)]
struct TickTiming {
    fps: f64,
    refresh_rate: f64,
    display_latency: f64,
    video_delay_ms: f64,
    debug: bool,
}

/// Coordinates frame slots between a producer thread and the render thread.
pub struct RenderManager {
    config: RenderConfig,
    clock: Arc<dyn ClockSource>,
    display: Arc<dyn DisplayContext>,
    port: Arc<dyn PlayerPort>,
    factory: Box<dyn RendererFactory>,
    render_thread: Mutex<ThreadId>,
    state: Mutex<StateData>,
    present: Mutex<PresentData>,
    present_event: Condvar,
    data: Mutex<Option<Box<dyn RenderBackend>>>,
    state_event: Event,
    flush_event: Event,
    flush_requested: AtomicBool,
}

impl fmt::Debug for RenderManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderManager")
            .field("config", &self.config)
            .field("state", &self.state.lock().state)
            .field("step", &self.present.lock().step)
            .finish_non_exhaustive()
    }
}

impl RenderManager {
    /// Creates an unconfigured manager. The calling thread becomes the
    /// render thread.
    #[must_use]
    pub fn new(
        clock: Arc<dyn ClockSource>,
        display: Arc<dyn DisplayContext>,
        port: Arc<dyn PlayerPort>,
        factory: Box<dyn RendererFactory>,
    ) -> Self {
        Self {
            config: RenderConfig::default(),
            clock,
            display,
            port,
            factory,
            render_thread: Mutex::new(thread::current().id()),
            state: Mutex::new(StateData {
                state: RenderState::Unconfigured,
                params: VideoParams::default(),
                display_latency: 0.0,
                video_delay_ms: 0.0,
                trigger_update_resolution: false,
                debug: false,
            }),
            present: Mutex::new(PresentData::new()),
            present_event: Condvar::new(),
            data: Mutex::new(None),
            state_event: Event::new(),
            flush_event: Event::new(),
            flush_requested: AtomicBool::new(false),
        }
    }

    /// Replaces the tuning configuration.
    #[must_use]
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// The tuning configuration.
    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Makes the calling thread the render thread.
    pub fn bind_render_thread(&self) {
        *self.render_thread.lock() = thread::current().id();
    }

    /// Installs a trace sink, returning the previous one.
    pub fn set_trace_sink(&self, sink: Box<dyn TraceSink>) -> Option<Box<dyn TraceSink>> {
        self.present.lock().sink.replace(sink)
    }

    /// Removes the trace sink.
    pub fn take_trace_sink(&self) -> Option<Box<dyn TraceSink>> {
        self.present.lock().sink.take()
    }

    fn on_render_thread(&self) -> bool {
        *self.render_thread.lock() == thread::current().id()
    }

    // -- render-thread lifecycle -------------------------------------------

    /// Prepares the manager before the first stream.
    ///
    /// Creates a planar-YUV backend if none exists, refreshes the display
    /// latency and resets the slot pool bookkeeping. The next
    /// [`configure`](Self::configure) always reconfigures.
    pub fn pre_init(&self) -> Result<(), RenderError> {
        if !self.on_render_thread() {
            log::error!("pre_init called from outside the render thread");
            return Err(RenderError::WrongThread {
                operation: "pre_init",
            });
        }
        let mut state = self.state.lock();
        {
            let mut data = self.data.lock();
            if data.is_none() {
                let Some(mut backend) = self.factory.create(RenderFormat::Yuv420p) else {
                    log::error!("no renderer available for {}", RenderFormat::Yuv420p);
                    return Err(RenderError::UnsupportedFormat(RenderFormat::Yuv420p));
                };
                backend.pre_init();
                *data = Some(backend);
            }
        }
        self.update_display_latency(&mut state);
        state.params.format = RenderFormat::None;

        let mut present = self.present.lock();
        present.queue_size = INITIAL_QUEUE_SIZE;
        present.skipped = 0;
        present.step = PresentStep::Idle;
        Ok(())
    }

    /// Drops the backend and returns to the unconfigured state.
    pub fn un_init(&self) -> Result<(), RenderError> {
        if !self.on_render_thread() {
            log::error!("un_init called from outside the render thread");
            return Err(RenderError::WrongThread {
                operation: "un_init",
            });
        }
        let mut state = self.state.lock();
        if self.data.lock().take().is_some() {
            log::debug!("renderer released");
        }
        state.state = RenderState::Unconfigured;
        Ok(())
    }

    // -- configuration ------------------------------------------------------

    /// Configures the pipeline for a stream.
    ///
    /// Returns immediately if `params` describe the configured stream and the
    /// backend does not need a new hardware context. Otherwise waits for the
    /// presenting frame to drain, hands the parameters to the render thread
    /// and waits for it to configure the backend.
    pub fn configure(&self, params: VideoParams) -> Result<(), RenderError> {
        {
            let state = self.state.lock();
            if state.state == RenderState::Configured && state.params.same_stream(&params) {
                let data = self.data.lock();
                if data
                    .as_deref()
                    .is_some_and(|backend| !backend.config_changed(params.hw.as_ref()))
                {
                    return Ok(());
                }
            }
        }

        log::debug!(
            "configure {}x{} ({}x{}) at {:.3} fps, format {}, {} buffers",
            params.width,
            params.height,
            params.display_width,
            params.display_height,
            params.fps,
            params.format,
            params.buffers,
        );

        let on_render_thread = self.on_render_thread();
        self.drain_presentation(on_render_thread)?;

        {
            let mut state = self.state.lock();
            state.params = params;
            state.state = RenderState::Configuring;
            self.state_event.reset();
            let mut present = self.present.lock();
            present.clock_sync.reset();
            // Wakes frame_wait so the render thread picks the request up.
            present.step = PresentStep::Ready;
            self.present_event.notify_all();
        }
        self.clock.set_vsync_adjust(0.0);

        if on_render_thread {
            self.configure_backend();
        } else if !self.state_event.wait(self.config.configure_timeout()) {
            let mut state = self.state.lock();
            if state.state == RenderState::Configuring {
                state.state = RenderState::Unconfigured;
                self.present.lock().step = PresentStep::Idle;
                self.present_event.notify_all();
                log::warn!("timeout waiting for the render thread to configure");
                return Err(RenderError::Timeout {
                    operation: "configure",
                    waited: self.config.configure_timeout(),
                });
            }
        }

        if self.state.lock().state == RenderState::Configured {
            Ok(())
        } else {
            Err(RenderError::ConfigureFailed)
        }
    }

    fn drain_presentation(&self, on_render_thread: bool) -> Result<(), RenderError> {
        let mut present = self.present.lock();
        if on_render_thread {
            // Nobody else advances the step; complete it here.
            present.step = PresentStep::Idle;
            return Ok(());
        }
        present.force_next = true;
        let deadline = Instant::now() + self.config.drain_timeout();
        while present.step != PresentStep::Idle {
            if self
                .present_event
                .wait_until(&mut present, deadline)
                .timed_out()
                && present.step != PresentStep::Idle
            {
                present.force_next = false;
                log::warn!("timeout waiting for presentation to drain before configure");
                return Err(RenderError::Timeout {
                    operation: "configure drain",
                    waited: self.config.drain_timeout(),
                });
            }
        }
        present.force_next = false;
        Ok(())
    }

    fn queue_size_for(&self, info: RenderInfo, requested: usize) -> usize {
        let wanted = if requested > 0 {
            requested
        } else {
            info.optimal_buffer_size
        };
        let size = wanted
            .min(info.max_buffer_size)
            .min(self.config.max_buffers);
        if size < 2 {
            log::warn!("renderer offers {size} buffers, using 2");
            2
        } else {
            size
        }
    }

    /// Applies the pending configuration on the render thread.
    fn configure_backend(&self) -> bool {
        let mut state = self.state.lock();
        let mut present = self.present.lock();
        let mut data = self.data.lock();

        let format = state.params.format;
        if data
            .as_deref()
            .is_some_and(|backend| !backend.handles_format(format))
        {
            log::debug!("renderer cannot handle {format}, replacing it");
            *data = None;
        }
        if data.is_none() {
            *data = self.factory.create(format);
            match data.as_deref() {
                Some(_) => log::debug!("created renderer for {format}"),
                None => log::error!("no renderer available for {format}"),
            }
        }

        let configured = match data.as_deref_mut() {
            Some(backend) => match backend.configure(&state.params) {
                Ok(()) => {
                    let info = backend.render_info();
                    let size = self.queue_size_for(info, state.params.buffers);
                    backend.set_buffer_size(size);
                    backend.update();
                    self.port.update_render_info(&info);
                    Some(size)
                }
                Err(err) => {
                    log::error!("renderer rejected configuration: {err}");
                    None
                }
            },
            None => None,
        };

        let ok = if let Some(size) = configured {
            present.queue_size = size;
            present.reset_slots();
            present.render_gui = true;
            present.wait_for_buffer_count = 0;
            present.late_frames = 0;
            present.skipped = 0;
            present.force_next = false;
            present.clock_sync.reset();
            state.trigger_update_resolution = true;
            state.debug = false;
            state.state = RenderState::Configured;
            log::debug!("configured {size} slots for {format}");
            true
        } else {
            state.state = RenderState::Unconfigured;
            present.step = PresentStep::Idle;
            false
        };
        self.present_event.notify_all();
        drop(data);
        drop(present);
        drop(state);

        if ok {
            self.clock.set_vsync_adjust(0.0);
        }
        self.state_event.set();
        self.port.video_params_change();
        ok
    }

    /// Returns `true` once a configuration has been applied.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.state.lock().state == RenderState::Configured
    }

    /// Current configuration state.
    #[must_use]
    pub fn render_state(&self) -> RenderState {
        self.state.lock().state
    }

    // -- producer side ------------------------------------------------------

    /// Copies or imports `picture` into the next free slot.
    ///
    /// Does not change slot membership; a following
    /// [`flip_page`](Self::flip_page) queues the same slot. Returns `None`
    /// when no slot is free, no backend exists, or the picture does not fit
    /// the slot's image.
    pub fn add_picture(&self, picture: &VideoPicture<'_>) -> Option<SlotIndex> {
        let slot = self.present.lock().slots.front(SlotState::Free)?;

        let mut data = self.data.lock();
        let backend = data.as_deref_mut()?;

        if picture.format.is_hardware() || backend.is_picture_hw(picture) {
            backend.add_picture_hw(picture, slot);
            return Some(slot);
        }

        let Some(image) = backend.get_image(slot) else {
            log::warn!("renderer has no image for slot {slot}");
            return None;
        };
        let copied = match picture.format {
            RenderFormat::Yuv420p | RenderFormat::Yuv420p10 | RenderFormat::Yuv420p16 => {
                picture::copy_planar(picture, image)
            }
            RenderFormat::Nv12 => picture::copy_nv12(picture, image),
            RenderFormat::Yuyv422 | RenderFormat::Uyvy422 => {
                picture::copy_yuv422_packed(picture, image)
            }
            other => {
                backend.release_image(slot);
                log::error!("cannot copy pictures in format {other}");
                return None;
            }
        };
        backend.release_image(slot);

        match copied {
            Ok(()) => Some(slot),
            Err(err) => {
                log::warn!("dropping picture for slot {slot}: {err}");
                None
            }
        }
    }

    /// Queues the next free slot for presentation.
    ///
    /// With `wait`, blocks (bounded) until the render thread has picked the
    /// frame up, forcing it through selection. Returns the queued slot, or
    /// `None` if stopped, unconfigured or starved.
    pub fn flip_page(
        &self,
        stop: &AtomicBool,
        pts: MediaTime,
        deinterlace: DeinterlaceMethod,
        field_sync: PresentField,
        wait: bool,
    ) -> Option<SlotIndex> {
        if stop.load(Ordering::Acquire) || !self.is_configured() {
            return None;
        }
        let wants_double_pass = self.data.lock().as_deref()?.wants_double_pass();
        let (method, field) = present_method(deinterlace, field_sync, wants_double_pass);

        let mut present = self.present.lock();
        let slot = present.slots.front(SlotState::Free)?;
        present.slots.enqueue(slot, pts, field, method);
        let counts = present.slots.counts();
        self.port
            .update_render_buffers(counts.queued, counts.discard, counts.free);
        let event = FrameQueuedEvent {
            slot,
            pts,
            queued: counts.queued,
            at: self.clock.clock(),
        };
        present.trace(|sink| sink.on_frame_queued(&event));

        if present.step == PresentStep::Idle {
            present.step = PresentStep::Ready;
        }
        self.present_event.notify_all();

        if wait {
            present.force_next = true;
            let deadline = Instant::now() + self.config.flip_wait_timeout();
            while present.step == PresentStep::Ready {
                self.present_event
                    .wait_for(&mut present, self.config.flip_wait_poll());
                if stop.load(Ordering::Acquire) {
                    break;
                }
                if Instant::now() >= deadline {
                    log::warn!("timeout waiting for slot {slot} to be picked up");
                    break;
                }
            }
            present.force_next = false;
        }
        Some(slot)
    }

    /// Waits for a free slot.
    ///
    /// Polls in increments of at most `buffer_poll_ms` until `timeout`
    /// elapses or `stop` is raised. When GUI rendering is suppressed nothing
    /// will consume the queue, so the oldest queued frame is dropped instead
    /// of waiting.
    pub fn wait_for_buffer(&self, stop: &AtomicBool, timeout: Duration) -> BufferWait {
        let mut present = self.present.lock();

        if !present.render_gui || !self.display.render_gui() {
            present.render_gui = false;
            let clock = self.clock.clock();
            let next_pts = present
                .slots
                .front(SlotState::Queued)
                .and_then(|slot| present.slots.get(slot))
                .map(|slot| slot.pts);
            let sleep = next_pts
                .map_or(SUPPRESSED_SLEEP, |pts| time_to_duration(pts - clock))
                .min(SUPPRESSED_SLEEP);
            if !sleep.is_zero() {
                self.present_event.wait_for(&mut present, sleep);
            }
            let dropped = match present.slots.front(SlotState::Queued) {
                Some(oldest) => usize::from(present.slots.discard(oldest)),
                None => 0,
            };
            if present.step == PresentStep::Ready && present.slots.count(SlotState::Queued) == 0 {
                present.step = PresentStep::Idle;
            }
            self.present_event.notify_all();
            if dropped > 0 {
                let event = BacklogDropEvent {
                    dropped,
                    at: self.clock.clock(),
                };
                present.trace(|sink| sink.on_backlog_drop(&event));
            }
            return BufferWait::Suppressed { dropped };
        }

        let deadline = Instant::now() + timeout;
        let poll = self.config.buffer_poll().min(timeout);
        while present.slots.count(SlotState::Free) == 0 {
            self.present_event.wait_for(&mut present, poll);
            let stopped = stop.load(Ordering::Acquire);
            if Instant::now() >= deadline || stopped {
                if !timeout.is_zero() && !stopped {
                    log::warn!("timeout waiting for a free buffer");
                    present.wait_for_buffer_count += 1;
                    if present.wait_for_buffer_count > BUFFER_WAIT_ESCALATION {
                        present.render_gui = false;
                    }
                }
                return BufferWait::Unavailable;
            }
        }

        present.wait_for_buffer_count = 0;
        let counts = present.slots.counts();
        BufferWait::Available {
            level: counts.queued + counts.discard,
        }
    }

    /// Discards every queued frame and resets the pool.
    ///
    /// Runs inline on the render thread; elsewhere the request is handed to
    /// the next [`frame_move`](Self::frame_move) and waited for.
    pub fn flush(&self) -> Result<(), RenderError> {
        if self.data.lock().is_none() {
            return Ok(());
        }
        if self.on_render_thread() {
            self.flush_now();
            return Ok(());
        }
        self.flush_event.reset();
        self.flush_requested.store(true, Ordering::Release);
        if self.flush_event.wait(self.config.flush_timeout()) {
            Ok(())
        } else {
            self.flush_requested.store(false, Ordering::Release);
            log::error!("timeout waiting for the render thread to flush");
            Err(RenderError::Timeout {
                operation: "flush",
                waited: self.config.flush_timeout(),
            })
        }
    }

    fn flush_now(&self) {
        let _state = self.state.lock();
        let mut present = self.present.lock();
        if let Some(backend) = self.data.lock().as_deref_mut() {
            backend.flush();
        }
        present.reset_slots();
        self.present_event.notify_all();
        drop(present);
        log::debug!("render queue flushed");
        self.flush_event.set();
    }

    // -- render thread ------------------------------------------------------

    /// Advances the pipeline by one render tick.
    ///
    /// Applies pending configuration and flush requests, evaluates clock
    /// sync, selects and flips to the next frame when one is due, and
    /// returns retired slots the backend no longer needs to the free pool.
    pub fn frame_move(&self) {
        if self.flush_requested.swap(false, Ordering::AcqRel) {
            self.flush_now();
        }
        self.update_resolution();

        let state = self.state.lock().state;
        match state {
            RenderState::Unconfigured => return,
            RenderState::Configuring => {
                if !self.configure_backend() {
                    return;
                }
                let fullscreen = self
                    .state
                    .lock()
                    .params
                    .flags
                    .contains(ConfigFlags::FULLSCREEN);
                if fullscreen {
                    self.display.request_fullscreen();
                }
                self.frame_wait(self.config.post_configure_wait());
            }
            RenderState::Configured => {}
        }

        let timing = self.check_enable_clock_sync();

        let mut present = self.present.lock();
        if present.step == PresentStep::Ready && present.slots.count(SlotState::Queued) == 0 {
            present.step = PresentStep::Idle;
        }
        if present.step == PresentStep::Ready {
            self.prepare_next_render(&mut present, &timing);
        }
        if present.step == PresentStep::Flip {
            if let Some(slot) = present.slots.presenting() {
                if let Some(backend) = self.data.lock().as_deref_mut() {
                    backend.flip_page(slot);
                }
                let event = PageFlipEvent {
                    slot,
                    at: self.clock.clock(),
                };
                present.trace(|sink| sink.on_page_flip(&event));
            }
            present.step = PresentStep::Frame;
            present.presenting_until = Some(Instant::now() + self.config.presenting_hold());
            self.present_event.notify_all();
        }

        self.reclaim_discarded(&mut present);

        let counts = present.slots.counts();
        self.port
            .update_render_buffers(counts.queued, counts.discard, counts.free);
        present.render_gui = true;
        if timing.debug {
            log::debug!(
                "tick: step {:?}, queued {}, discard {}, free {}, late {}",
                present.step,
                counts.queued,
                counts.discard,
                counts.free,
                present.late_frames,
            );
        }
    }

    fn prepare_next_render(&self, present: &mut PresentData, timing: &TickTiming) {
        let queued = present.slots.members(SlotState::Queued);
        if queued.is_empty() {
            log::error!("frame selection ran with an empty queue");
            present.step = PresentStep::Idle;
            self.present_event.notify_all();
            return;
        }
        let queued_pts: Vec<MediaTime> = queued
            .iter()
            .map(|&slot| present.slots.get(slot).map_or(NOPTS, |s| s.pts))
            .collect();

        let clock = self.clock.clock();
        let frame_time = frame_duration(timing.refresh_rate);
        let total_latency = sec_to_time(timing.display_latency)
            - msec_to_time(timing.video_delay_ms)
            + 2.0 * frame_time;
        let mut render_pts = clock + total_latency;
        let next_pts = if self.clock.speed() < 0.0 {
            render_pts
        } else {
            queued_pts[0]
        };

        if present.clock_sync.enabled {
            let published = present.clock_sync.observe(
                render_pts,
                next_pts,
                frame_time,
                self.config.clock_sync_samples,
            );
            if let Some(offset) = published {
                self.clock.set_vsync_adjust(-offset);
                let event = ClockSyncEvent {
                    sync_offset: offset,
                    at: clock,
                };
                present.trace(|sink| sink.on_clock_sync(&event));
            }
            render_pts = present.clock_sync.adjust(render_pts, frame_time);
        } else {
            self.clock.set_vsync_adjust(0.0);
        }

        if !is_due(next_pts, render_pts, present.force_next) {
            return;
        }

        let factor = self.config.late_policy().factor(present.late_frames);
        let Some(position) = select_frame(&queued_pts, render_pts, frame_time, factor) else {
            return;
        };
        for (&slot, &pts) in queued.iter().zip(&queued_pts).take(position) {
            present.slots.discard(slot);
            present.skipped += 1;
            let event = FrameSkippedEvent {
                slot,
                pts,
                render_pts,
            };
            present.trace(|sink| sink.on_frame_skipped(&event));
        }

        let chosen = queued[position];
        let chosen_pts = queued_pts[position];
        let late = frames_late(render_pts, chosen_pts, timing.fps);
        present.late_frames = if late > 0 {
            present.late_frames.saturating_add(late)
        } else {
            0
        };

        present.step = PresentStep::Flip;
        present.slots.present(chosen);
        present.present_pts = chosen_pts - total_latency;
        self.present_event.notify_all();

        let counts = present.slots.counts();
        self.port
            .update_render_buffers(counts.queued, counts.discard, counts.free);
        let event = FrameSelectedEvent {
            slot: chosen,
            pts: chosen_pts,
            render_pts,
            skipped: u32::try_from(position).unwrap_or(u32::MAX),
            late_frames: present.late_frames,
            at: clock,
        };
        present.trace(|sink| sink.on_frame_selected(&event));
    }

    /// Returns every retired slot the backend no longer reads to the free
    /// pool, oldest first. Everything is released while the GUI is
    /// suppressed.
    fn reclaim_discarded(&self, present: &mut PresentData) {
        let discarded = present.slots.members(SlotState::Discard);
        if discarded.is_empty() {
            return;
        }
        let mut data = self.data.lock();
        let mut released = false;
        for slot in discarded {
            let held = present.render_gui
                && data
                    .as_deref()
                    .is_some_and(|backend| backend.need_buffer(slot));
            if held {
                continue;
            }
            if let Some(backend) = data.as_deref_mut() {
                backend.release_buffer(slot);
            }
            released |= present.slots.release(slot);
        }
        if released {
            self.present_event.notify_all();
        }
    }

    fn check_enable_clock_sync(&self) -> TickTiming {
        let timing = {
            let state = self.state.lock();
            TickTiming {
                fps: state.params.fps,
                refresh_rate: self.display.refresh_rate(),
                display_latency: state.display_latency,
                video_delay_ms: state.video_delay_ms,
                debug: state.debug,
            }
        };
        let speed = self.clock.clock_info().map(|info| info.clock_speed);
        let enabled = clock_sync_eligible(
            timing.refresh_rate,
            timing.fps,
            speed,
            self.config.clock_sync_epsilon,
        );
        self.present.lock().clock_sync.enabled = enabled;
        if !enabled {
            self.clock.set_vsync_adjust(0.0);
        }
        self.port.update_clock_sync(enabled);
        timing
    }

    /// Draws the presenting slot and advances the present step.
    ///
    /// `gui` marks the GUI compositing pass. A backend that is a GUI layer
    /// draws only in that pass; a video-layer backend draws in the other
    /// pass and only applies pending updates in the GUI pass. The present
    /// step advances on the GUI pass.
    pub fn render(&self, clear: bool, flags: RenderFlags, alpha: u8, gui: bool) {
        if self.state.lock().state != RenderState::Configured {
            return;
        }
        let Some(gui_layer) = self.data.lock().as_deref().map(|b| b.is_gui_layer()) else {
            return;
        };
        if !gui && gui_layer {
            return;
        }

        let (slot, frame, step) = {
            let present = self.present.lock();
            let Some(slot) = present.slots.presenting() else {
                return;
            };
            let Some(frame) = present.slots.get(slot).copied() else {
                return;
            };
            (slot, frame, present.step)
        };

        if !gui || gui_layer {
            if let Some(backend) = self.data.lock().as_deref_mut() {
                present_page(
                    backend,
                    frame.method,
                    frame.field,
                    step,
                    clear,
                    flags,
                    alpha,
                );
            }
        }
        if gui && !gui_layer {
            if let Some(backend) = self.data.lock().as_deref_mut() {
                backend.update();
            }
        }

        let mut present = self.present.lock();
        let event = RenderPassEvent {
            slot,
            step,
            method: frame.method,
            gui,
            at: self.clock.clock(),
        };
        present.trace(|sink| sink.on_render_pass(&event));
        if gui {
            present.step = step_after_render(present.step, frame.method);
            if present.step == PresentStep::Idle && present.slots.count(SlotState::Queued) > 0 {
                present.step = PresentStep::Ready;
            }
            self.present_event.notify_all();
        }
    }

    /// Waits up to `timeout` for a frame to become pending. Returns `true`
    /// if the present step left idle.
    pub fn frame_wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut present = self.present.lock();
        while present.step == PresentStep::Idle {
            if self
                .present_event
                .wait_until(&mut present, deadline)
                .timed_out()
            {
                break;
            }
        }
        present.step != PresentStep::Idle
    }

    // -- display ------------------------------------------------------------

    /// Requests a display-mode re-evaluation on the next tick.
    ///
    /// A non-zero `width` also records the new content rate, width and
    /// flags, which forces the next [`configure`](Self::configure).
    pub fn trigger_update_resolution(&self, fps: f64, width: u32, flags: ConfigFlags) {
        let mut state = self.state.lock();
        if width > 0 {
            state.params.fps = fps;
            state.params.width = width;
            state.params.flags = flags;
        }
        state.trigger_update_resolution = true;
    }

    fn update_resolution(&self) {
        let mut state = self.state.lock();
        if !state.trigger_update_resolution || !self.display.is_fullscreen_video() {
            return;
        }
        if self.config.adjust_refresh_rate && state.params.fps > 0.0 {
            self.display
                .match_refresh_rate(state.params.fps, state.params.width);
            self.update_display_latency(&mut state);
        }
        state.trigger_update_resolution = false;
        drop(state);
        self.port.video_params_change();
    }

    fn update_display_latency(&self, state: &mut StateData) {
        let refresh = self.display.refresh_rate();
        let query = if self.display.is_windowed() {
            0.0
        } else {
            refresh
        };
        let mut latency = self.display.display_latency(query);
        if refresh > 0.0 {
            let extra_buffers = self.display.swap_buffer_count().saturating_sub(1);
            latency += f64::from(extra_buffers) / refresh;
        }
        state.display_latency = latency;
    }

    /// Predicted display latency in seconds.
    #[must_use]
    pub fn display_latency(&self) -> f64 {
        self.state.lock().display_latency
    }

    /// Sets the audio/video offset in milliseconds. Positive values show
    /// video earlier.
    pub fn set_video_delay(&self, millis: f64) {
        self.state.lock().video_delay_ms = millis;
    }

    /// The audio/video offset in milliseconds.
    #[must_use]
    pub fn video_delay(&self) -> f64 {
        self.state.lock().video_delay_ms
    }

    // -- queries ------------------------------------------------------------

    /// Returns `true` within `presenting_hold_ms` of the last page flip.
    #[must_use]
    pub fn is_presenting(&self) -> bool {
        if !self.is_configured() {
            return false;
        }
        self.present
            .lock()
            .presenting_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Returns `true` if a GUI-layer backend is actively presenting.
    #[must_use]
    pub fn is_gui_layer(&self) -> bool {
        let gui_layer = {
            let _state = self.state.lock();
            self.data.lock().as_deref().is_some_and(|b| b.is_gui_layer())
        };
        gui_layer && self.is_presenting()
    }

    /// Returns `true` if the backend draws on its own video plane.
    #[must_use]
    pub fn is_video_layer(&self) -> bool {
        let _state = self.state.lock();
        self.data.lock().as_deref().is_some_and(|b| !b.is_gui_layer())
    }

    /// Display aspect ratio of the stream, `1.0` without a backend.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        let _state = self.state.lock();
        self.data.lock().as_deref().map_or(1.0, |b| b.aspect_ratio())
    }

    /// Source, destination and view rectangles.
    #[must_use]
    pub fn video_rect(&self) -> VideoRect {
        let _state = self.state.lock();
        self.data
            .lock()
            .as_deref()
            .map_or_else(VideoRect::default, |b| b.video_rect())
    }

    /// Changes how video is fitted into the view.
    pub fn set_view_mode(&self, mode: ViewMode) {
        {
            let _state = self.state.lock();
            if let Some(backend) = self.data.lock().as_deref_mut() {
                backend.set_view_mode(mode);
            }
        }
        self.port.video_params_change();
    }

    /// Backend buffering capabilities; without a backend only the hard cap
    /// is known.
    #[must_use]
    pub fn render_info(&self) -> RenderInfo {
        let _state = self.state.lock();
        match self.data.lock().as_deref() {
            Some(backend) => backend.render_info(),
            None => RenderInfo {
                optimal_buffer_size: 0,
                max_buffer_size: self.config.max_buffers,
            },
        }
    }

    /// Returns `true` if the backend supports `feature`.
    #[must_use]
    pub fn supports_feature(&self, feature: RenderFeature) -> bool {
        let _state = self.state.lock();
        self.data
            .lock()
            .as_deref()
            .is_some_and(|b| b.supports_feature(feature))
    }

    /// Returns `true` if the backend supports `method`.
    #[must_use]
    pub fn supports_scaling(&self, method: ScalingMethod) -> bool {
        let _state = self.state.lock();
        self.data
            .lock()
            .as_deref()
            .is_some_and(|b| b.supports_scaling(method))
    }

    /// Flips per-tick debug logging.
    pub fn toggle_debug(&self) {
        let mut state = self.state.lock();
        state.debug = !state.debug;
    }

    /// Returns `true` while per-tick debug logging is on.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.state.lock().debug
    }

    /// Presentation counters.
    #[must_use]
    pub fn stats(&self) -> RenderStats {
        let present = self.present.lock();
        let counts = present.slots.counts();
        RenderStats {
            late_frames: present.late_frames / 10,
            present_pts: present.present_pts,
            queued: counts.queued,
            discard: counts.discard,
            free: counts.free,
            skipped: present.skipped,
        }
    }

    /// Current present step.
    #[must_use]
    pub fn present_step(&self) -> PresentStep {
        self.present.lock().step
    }

    /// Membership of every slot, by index.
    #[must_use]
    pub fn slot_states(&self) -> Vec<SlotState> {
        self.present.lock().slots.states()
    }

    /// Occupancy of every slot collection.
    #[must_use]
    pub fn slot_counts(&self) -> SlotCounts {
        self.present.lock().slots.counts()
    }

    /// Slots in `state`, oldest first.
    #[must_use]
    pub fn slots_in(&self, state: SlotState) -> Vec<SlotIndex> {
        self.present.lock().slots.members(state)
    }

    /// The slot the backend is showing.
    #[must_use]
    pub fn presenting_slot(&self) -> Option<SlotIndex> {
        self.present.lock().slots.presenting()
    }

    /// Clock-sync estimator state.
    #[must_use]
    pub fn clock_sync(&self) -> ClockSync {
        self.present.lock().clock_sync
    }
}
