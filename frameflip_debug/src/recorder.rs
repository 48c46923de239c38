// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Binary capture of render-manager trace events.
//!
//! [`RecorderSink`] is a [`TraceSink`] that appends each event to a
//! `Vec<u8>` as fixed-size little-endian records. Media times are stored as
//! raw `f64` bits. [`decode`] reads them back as an iterator of
//! [`RecordedEvent`].

use frameflip_core::slot::SlotIndex;
use frameflip_core::timing::{PresentMethod, PresentStep};
use frameflip_core::trace::{
    BacklogDropEvent, ClockSyncEvent, FrameQueuedEvent, FrameSelectedEvent, FrameSkippedEvent,
    PageFlipEvent, RenderPassEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_QUEUED: u8 = 1;
const TAG_FRAME_SELECTED: u8 = 2;
const TAG_FRAME_SKIPPED: u8 = 3;
const TAG_PAGE_FLIP: u8 = 4;
const TAG_RENDER_PASS: u8 = 5;
const TAG_CLOCK_SYNC: u8 = 6;
const TAG_BACKLOG_DROP: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// Appends every frame, flip and sync event to an in-memory byte log.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Starts with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded log so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Hands over the encoded log.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, v: usize) {
        self.write_u32(u32::try_from(v).unwrap_or(u32::MAX));
    }

    fn write_slot(&mut self, slot: SlotIndex) {
        self.write_count(slot.get());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    fn write_step(&mut self, step: PresentStep) {
        self.write_u8(match step {
            PresentStep::Idle => 0,
            PresentStep::Ready => 1,
            PresentStep::Flip => 2,
            PresentStep::Frame => 3,
            PresentStep::Frame2 => 4,
        });
    }

    fn write_method(&mut self, method: PresentMethod) {
        self.write_u8(match method {
            PresentMethod::Single => 0,
            PresentMethod::Blend => 1,
            PresentMethod::Weave => 2,
            PresentMethod::Bob => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_queued(&mut self, e: &FrameQueuedEvent) {
        self.write_u8(TAG_FRAME_QUEUED);
        self.write_slot(e.slot);
        self.write_f64(e.pts);
        self.write_count(e.queued);
        self.write_f64(e.at);
    }

    fn on_frame_selected(&mut self, e: &FrameSelectedEvent) {
        self.write_u8(TAG_FRAME_SELECTED);
        self.write_slot(e.slot);
        self.write_f64(e.pts);
        self.write_f64(e.render_pts);
        self.write_u32(e.skipped);
        self.buf.extend_from_slice(&e.late_frames.to_le_bytes());
        self.write_f64(e.at);
    }

    fn on_frame_skipped(&mut self, e: &FrameSkippedEvent) {
        self.write_u8(TAG_FRAME_SKIPPED);
        self.write_slot(e.slot);
        self.write_f64(e.pts);
        self.write_f64(e.render_pts);
    }

    fn on_page_flip(&mut self, e: &PageFlipEvent) {
        self.write_u8(TAG_PAGE_FLIP);
        self.write_slot(e.slot);
        self.write_f64(e.at);
    }

    fn on_render_pass(&mut self, e: &RenderPassEvent) {
        self.write_u8(TAG_RENDER_PASS);
        self.write_slot(e.slot);
        self.write_step(e.step);
        self.write_method(e.method);
        self.write_u8(u8::from(e.gui));
        self.write_f64(e.at);
    }

    fn on_clock_sync(&mut self, e: &ClockSyncEvent) {
        self.write_u8(TAG_CLOCK_SYNC);
        self.write_f64(e.sync_offset);
        self.write_f64(e.at);
    }

    fn on_backlog_drop(&mut self, e: &BacklogDropEvent) {
        self.write_u8(TAG_BACKLOG_DROP);
        self.write_count(e.dropped);
        self.write_f64(e.at);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// One event read back from a recorder log.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`FrameQueuedEvent`].
    FrameQueued(FrameQueuedEvent),
    /// A [`FrameSelectedEvent`].
    FrameSelected(FrameSelectedEvent),
    /// A [`FrameSkippedEvent`].
    FrameSkipped(FrameSkippedEvent),
    /// A [`PageFlipEvent`].
    PageFlip(PageFlipEvent),
    /// A [`RenderPassEvent`].
    RenderPass(RenderPassEvent),
    /// A [`ClockSyncEvent`].
    ClockSync(ClockSyncEvent),
    /// A [`BacklogDropEvent`].
    BacklogDrop(BacklogDropEvent),
}

/// Reads a [`RecorderSink`] log back event by event.
///
/// Decoding stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Returned by [`decode`].
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.take().map(i32::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.take().map(|b| f64::from_bits(u64::from_le_bytes(b)))
    }

    fn read_count(&mut self) -> Option<usize> {
        self.read_u32().and_then(|v| usize::try_from(v).ok())
    }

    fn read_slot(&mut self) -> Option<SlotIndex> {
        self.read_count().map(SlotIndex)
    }

    fn read_step(&mut self) -> Option<PresentStep> {
        Some(match self.read_u8()? {
            0 => PresentStep::Idle,
            1 => PresentStep::Ready,
            2 => PresentStep::Flip,
            3 => PresentStep::Frame,
            _ => PresentStep::Frame2,
        })
    }

    fn read_method(&mut self) -> Option<PresentMethod> {
        Some(match self.read_u8()? {
            0 => PresentMethod::Single,
            1 => PresentMethod::Blend,
            2 => PresentMethod::Weave,
            _ => PresentMethod::Bob,
        })
    }

    fn decode_frame_queued(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameQueued(FrameQueuedEvent {
            slot: self.read_slot()?,
            pts: self.read_f64()?,
            queued: self.read_count()?,
            at: self.read_f64()?,
        }))
    }

    fn decode_frame_selected(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSelected(FrameSelectedEvent {
            slot: self.read_slot()?,
            pts: self.read_f64()?,
            render_pts: self.read_f64()?,
            skipped: self.read_u32()?,
            late_frames: self.read_i32()?,
            at: self.read_f64()?,
        }))
    }

    fn decode_frame_skipped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSkipped(FrameSkippedEvent {
            slot: self.read_slot()?,
            pts: self.read_f64()?,
            render_pts: self.read_f64()?,
        }))
    }

    fn decode_page_flip(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PageFlip(PageFlipEvent {
            slot: self.read_slot()?,
            at: self.read_f64()?,
        }))
    }

    fn decode_render_pass(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RenderPass(RenderPassEvent {
            slot: self.read_slot()?,
            step: self.read_step()?,
            method: self.read_method()?,
            gui: self.read_u8()? != 0,
            at: self.read_f64()?,
        }))
    }

    fn decode_clock_sync(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ClockSync(ClockSyncEvent {
            sync_offset: self.read_f64()?,
            at: self.read_f64()?,
        }))
    }

    fn decode_backlog_drop(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::BacklogDrop(BacklogDropEvent {
            dropped: self.read_count()?,
            at: self.read_f64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_QUEUED => self.decode_frame_queued(),
            TAG_FRAME_SELECTED => self.decode_frame_selected(),
            TAG_FRAME_SKIPPED => self.decode_frame_skipped(),
            TAG_PAGE_FLIP => self.decode_page_flip(),
            TAG_RENDER_PASS => self.decode_render_pass(),
            TAG_CLOCK_SYNC => self.decode_clock_sync(),
            TAG_BACKLOG_DROP => self.decode_backlog_drop(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_with_skips_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_frame_skipped(&FrameSkippedEvent {
            slot: SlotIndex(1),
            pts: 0.0,
            render_pts: 25_000.0,
        });
        let selected = FrameSelectedEvent {
            slot: SlotIndex(3),
            pts: 16_667.0,
            render_pts: 25_000.0,
            skipped: 1,
            late_frames: -2,
            at: 20_833.0,
        };
        rec.on_frame_selected(&selected);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecordedEvent::FrameSkipped(e) => assert_eq!(e.slot, SlotIndex(1)),
            other => panic!("expected FrameSkipped, got {other:?}"),
        }
        assert_eq!(events[1], RecordedEvent::FrameSelected(selected));
    }

    #[test]
    fn render_pass_keeps_step_and_method() {
        let mut rec = RecorderSink::new();
        rec.on_render_pass(&RenderPassEvent {
            slot: SlotIndex(2),
            step: PresentStep::Frame2,
            method: PresentMethod::Bob,
            gui: true,
            at: 1.5,
        });
        match decode(rec.as_bytes()).next() {
            Some(RecordedEvent::RenderPass(e)) => {
                assert_eq!(e.step, PresentStep::Frame2);
                assert_eq!(e.method, PresentMethod::Bob);
                assert!(e.gui, "gui flag survives");
            }
            other => panic!("expected RenderPass, got {other:?}"),
        }
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_page_flip(&PageFlipEvent {
            slot: SlotIndex(1),
            at: 10.0,
        });
        rec.on_clock_sync(&ClockSyncEvent {
            sync_offset: 120.0,
            at: 20.0,
        });
        let bytes = rec.into_bytes();
        let truncated = &bytes[..bytes.len() - 3];
        let events: Vec<_> = decode(truncated).collect();
        assert_eq!(events.len(), 1, "only the complete record decodes");
    }

    #[test]
    fn unknown_tag_stops_iteration() {
        assert_eq!(decode(&[0xff, 0, 0]).count(), 0);
    }
}
