// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame lifecycle events.
//!
//! [`TraceSink`] has one method per event in a frame's life: queued,
//! selected or skipped, flipped, rendered. Every method defaults to a no-op.
//! Install a sink with
//! [`RenderManager::set_trace_sink`](crate::manager::RenderManager::set_trace_sink).
//!
//! Sinks are called with the manager's present lock held; they must be
//! quick and must not call back into the manager.
//!
//! Timestamps are media-clock readings ([`MediaTime`]) taken when the event
//! happened.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::slot::SlotIndex;
use crate::time::MediaTime;
use crate::timing::{PresentMethod, PresentStep};

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// A producer moved a filled slot into the queue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameQueuedEvent {
    /// The slot.
    pub slot: SlotIndex,
    /// Frame timestamp.
    pub pts: MediaTime,
    /// Queue depth after the move.
    pub queued: usize,
    /// Clock reading.
    pub at: MediaTime,
}

/// Frame selection chose a slot to present.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSelectedEvent {
    /// The chosen slot.
    pub slot: SlotIndex,
    /// Its timestamp.
    pub pts: MediaTime,
    /// Predicted on-screen media time.
    pub render_pts: MediaTime,
    /// Older frames skipped to reach it.
    pub skipped: u32,
    /// Late-frame counter after the selection.
    pub late_frames: i32,
    /// Clock reading.
    pub at: MediaTime,
}

/// A queued frame was skipped because a later one was already due.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSkippedEvent {
    /// The skipped slot.
    pub slot: SlotIndex,
    /// Its timestamp.
    pub pts: MediaTime,
    /// Predicted on-screen media time when it was skipped.
    pub render_pts: MediaTime,
}

/// The backend flipped to a new page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageFlipEvent {
    /// The new page.
    pub slot: SlotIndex,
    /// Clock reading.
    pub at: MediaTime,
}

/// One render call was dispatched to the backend.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderPassEvent {
    /// Page drawn.
    pub slot: SlotIndex,
    /// Step at dispatch time.
    pub step: PresentStep,
    /// Present method of the page.
    pub method: PresentMethod,
    /// Whether this was the GUI pass.
    pub gui: bool,
    /// Clock reading.
    pub at: MediaTime,
}

/// Clock sync published a new correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockSyncEvent {
    /// Average phase error of the last window.
    pub sync_offset: MediaTime,
    /// Clock reading.
    pub at: MediaTime,
}

/// Queued frames were dropped because the GUI is not rendering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BacklogDropEvent {
    /// Frames moved to discard.
    pub dropped: usize,
    /// Clock reading.
    pub at: MediaTime,
}

// ---------------------------------------------------------------------------
// TraceSink
// ---------------------------------------------------------------------------

/// Receives pipeline events.
pub trait TraceSink: Send {
    /// A frame entered the queue.
    fn on_frame_queued(&mut self, e: &FrameQueuedEvent) {
        let _ = e;
    }

    /// A frame was selected for presentation.
    fn on_frame_selected(&mut self, e: &FrameSelectedEvent) {
        let _ = e;
    }

    /// A frame was skipped.
    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        let _ = e;
    }

    /// The backend flipped pages.
    fn on_page_flip(&mut self, e: &PageFlipEvent) {
        let _ = e;
    }

    /// A render pass was dispatched.
    fn on_render_pass(&mut self, e: &RenderPassEvent) {
        let _ = e;
    }

    /// Clock sync published an offset.
    fn on_clock_sync(&mut self, e: &ClockSyncEvent) {
        let _ = e;
    }

    /// The backlog was dropped.
    fn on_backlog_drop(&mut self, e: &BacklogDropEvent) {
        let _ = e;
    }
}

/// A sink that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// A sink the manager owns while the caller keeps a handle to it.
///
/// Cloning shares the inner sink, so a recorder can be installed in the
/// manager and inspected afterwards.
#[derive(Debug, Default)]
pub struct SharedSink<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedSink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TraceSink> SharedSink<S> {
    /// Wraps `sink`.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(sink)),
        }
    }

    /// Locks the inner sink.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.inner.lock()
    }
}

impl<S: TraceSink> TraceSink for SharedSink<S> {
    fn on_frame_queued(&mut self, e: &FrameQueuedEvent) {
        self.inner.lock().on_frame_queued(e);
    }

    fn on_frame_selected(&mut self, e: &FrameSelectedEvent) {
        self.inner.lock().on_frame_selected(e);
    }

    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        self.inner.lock().on_frame_skipped(e);
    }

    fn on_page_flip(&mut self, e: &PageFlipEvent) {
        self.inner.lock().on_page_flip(e);
    }

    fn on_render_pass(&mut self, e: &RenderPassEvent) {
        self.inner.lock().on_render_pass(e);
    }

    fn on_clock_sync(&mut self, e: &ClockSyncEvent) {
        self.inner.lock().on_clock_sync(e);
    }

    fn on_backlog_drop(&mut self, e: &BacklogDropEvent) {
        self.inner.lock().on_backlog_drop(e);
    }
}
