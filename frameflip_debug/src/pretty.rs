// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Live playback log.
//!
//! [`PrettyPrintSink`] prints each trace event as it happens, one line per
//! event, with media times in milliseconds.

use std::io::Write;

use frameflip_core::time::{MediaTime, time_to_msec};
use frameflip_core::trace::{
    BacklogDropEvent, ClockSyncEvent, FrameQueuedEvent, FrameSelectedEvent, FrameSkippedEvent,
    PageFlipEvent, RenderPassEvent, TraceSink,
};

/// Streams trace lines to a [`Write`](std::io::Write), stderr by default.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn ms(t: MediaTime) -> f64 {
    time_to_msec(t)
}

impl<W: Write + Send> TraceSink for PrettyPrintSink<W> {
    fn on_frame_queued(&mut self, e: &FrameQueuedEvent) {
        let _ = writeln!(
            self.writer,
            "[queue] slot={} pts={:.3}ms depth={} at {:.3}ms",
            e.slot,
            ms(e.pts),
            e.queued,
            ms(e.at),
        );
    }

    fn on_frame_selected(&mut self, e: &FrameSelectedEvent) {
        let _ = writeln!(
            self.writer,
            "[select] slot={} pts={:.3}ms render={:.3}ms skipped={} late={}",
            e.slot,
            ms(e.pts),
            ms(e.render_pts),
            e.skipped,
            e.late_frames,
        );
    }

    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] slot={} pts={:.3}ms behind by {:.3}ms",
            e.slot,
            ms(e.pts),
            ms(e.render_pts - e.pts),
        );
    }

    fn on_page_flip(&mut self, e: &PageFlipEvent) {
        let _ = writeln!(self.writer, "[flip] slot={} at {:.3}ms", e.slot, ms(e.at));
    }

    fn on_render_pass(&mut self, e: &RenderPassEvent) {
        let pass = if e.gui { "gui" } else { "video" };
        let _ = writeln!(
            self.writer,
            "[render] slot={} {:?}/{:?} pass={pass}",
            e.slot, e.method, e.step,
        );
    }

    fn on_clock_sync(&mut self, e: &ClockSyncEvent) {
        let _ = writeln!(
            self.writer,
            "[sync] offset={:.3}ms at {:.3}ms",
            ms(e.sync_offset),
            ms(e.at),
        );
    }

    fn on_backlog_drop(&mut self, e: &BacklogDropEvent) {
        let _ = writeln!(
            self.writer,
            "[drop] frames={} gui suppressed at {:.3}ms",
            e.dropped,
            ms(e.at),
        );
    }
}
