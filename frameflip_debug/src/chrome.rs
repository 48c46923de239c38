// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Playback timelines for `chrome://tracing`.
//!
//! [`export`] turns a [`RecorderSink`](super::recorder::RecorderSink) log into
//! [Chrome Trace Event Format][format] JSON.
//! Media time is already in microseconds, which is what the format expects.
//!
//! Producer-side events land on thread 1, render-thread events on thread 0.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use frameflip_core::time::MediaTime;
use frameflip_core::trace::FrameSkippedEvent;

use crate::recorder::{RecordedEvent, decode};

const RENDER_TID: u32 = 0;
const PRODUCER_TID: u32 = 1;

/// Writes a recorder log as one JSON array of trace events.
///
/// Events become instants on their thread. Queue depth and the sync offset
/// are also emitted as counters. [Perfetto](https://ui.perfetto.dev/) loads
/// the result as well.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Skips carry no clock reading of their own. They are held until the
    // selection emitted right after them and take its timestamp.
    let mut pending_skips: Vec<FrameSkippedEvent> = Vec::new();
    let mut last_render_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::FrameQueued(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameQueued",
                    "cat": "Producer",
                    "ts": e.at,
                    "pid": 0,
                    "tid": PRODUCER_TID,
                    "s": "t",
                    "args": {
                        "slot": e.slot.get(),
                        "pts": e.pts,
                        "queued": e.queued,
                    }
                }));
                events.push(json!({
                    "ph": "C",
                    "name": "Queue",
                    "ts": e.at,
                    "pid": 0,
                    "args": { "queued": e.queued }
                }));
            }
            RecordedEvent::FrameSelected(e) => {
                last_render_ts = e.at;
                for skip in pending_skips.drain(..) {
                    events.push(skip_event(&skip, e.at));
                }
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSelected",
                    "cat": "Selection",
                    "ts": e.at,
                    "pid": 0,
                    "tid": RENDER_TID,
                    "s": "t",
                    "args": {
                        "slot": e.slot.get(),
                        "pts": e.pts,
                        "render_pts": e.render_pts,
                        "skipped": e.skipped,
                        "late_frames": e.late_frames,
                    }
                }));
            }
            RecordedEvent::FrameSkipped(e) => pending_skips.push(e),
            RecordedEvent::PageFlip(e) => {
                last_render_ts = e.at;
                events.push(json!({
                    "ph": "i",
                    "name": "PageFlip",
                    "cat": "Present",
                    "ts": e.at,
                    "pid": 0,
                    "tid": RENDER_TID,
                    "s": "t",
                    "args": { "slot": e.slot.get() }
                }));
            }
            RecordedEvent::RenderPass(e) => {
                last_render_ts = e.at;
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.method),
                    "cat": "Render",
                    "ts": e.at,
                    "pid": 0,
                    "tid": RENDER_TID,
                    "s": "t",
                    "args": {
                        "slot": e.slot.get(),
                        "step": format!("{:?}", e.step),
                        "gui": e.gui,
                    }
                }));
            }
            RecordedEvent::ClockSync(e) => {
                events.push(json!({
                    "ph": "C",
                    "name": "SyncOffset",
                    "ts": e.at,
                    "pid": 0,
                    "args": { "offset_us": e.sync_offset }
                }));
            }
            RecordedEvent::BacklogDrop(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "BacklogDrop",
                    "cat": "Producer",
                    "ts": e.at,
                    "pid": 0,
                    "tid": PRODUCER_TID,
                    "s": "g",
                    "args": { "dropped": e.dropped }
                }));
            }
        }
    }

    for skip in &pending_skips {
        events.push(skip_event(skip, last_render_ts));
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn skip_event(e: &FrameSkippedEvent, ts: MediaTime) -> Value {
    json!({
        "ph": "i",
        "name": "FrameSkipped",
        "cat": "Selection",
        "ts": ts,
        "pid": 0,
        "tid": RENDER_TID,
        "s": "t",
        "args": {
            "slot": e.slot.get(),
            "pts": e.pts,
            "late_us": e.render_pts - e.pts,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use frameflip_core::slot::SlotIndex;
    use frameflip_core::trace::{
        FrameQueuedEvent, FrameSelectedEvent, FrameSkippedEvent, PageFlipEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_frame_queued(&FrameQueuedEvent {
            slot: SlotIndex(1),
            pts: 0.0,
            queued: 1,
            at: 100.0,
        });
        rec.on_frame_skipped(&FrameSkippedEvent {
            slot: SlotIndex(1),
            pts: 0.0,
            render_pts: 40_000.0,
        });
        rec.on_frame_selected(&FrameSelectedEvent {
            slot: SlotIndex(2),
            pts: 33_333.0,
            render_pts: 40_000.0,
            skipped: 1,
            late_frames: 0,
            at: 5_000.0,
        });
        rec.on_page_flip(&PageFlipEvent {
            slot: SlotIndex(2),
            at: 5_010.0,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).expect("writing to a Vec cannot fail");
        let parsed: Vec<Value> =
            serde_json::from_slice(&out).expect("export writes a JSON array");

        // Queued emits an instant and a counter.
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[0]["name"], "FrameQueued");
        assert_eq!(parsed[0]["tid"], PRODUCER_TID);
        assert_eq!(parsed[1]["ph"], "C");
        assert_eq!(parsed[2]["name"], "FrameSkipped");
        assert_eq!(parsed[2]["ts"], 5_000.0, "skip takes the selection's time");
        assert_eq!(parsed[3]["name"], "FrameSelected");
        assert_eq!(parsed[3]["args"]["skipped"], 1);
        assert_eq!(parsed[4]["ts"], 5_010.0);
    }

    #[test]
    fn trailing_skips_use_the_last_render_time() {
        let mut rec = RecorderSink::new();
        rec.on_page_flip(&PageFlipEvent {
            slot: SlotIndex(0),
            at: 7_000.0,
        });
        rec.on_frame_skipped(&FrameSkippedEvent {
            slot: SlotIndex(3),
            pts: 0.0,
            render_pts: 90_000.0,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).expect("writing to a Vec cannot fail");
        let parsed: Vec<Value> = serde_json::from_slice(&out).expect("valid JSON");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["name"], "FrameSkipped");
        assert_eq!(parsed[1]["ts"], 7_000.0);
        assert_eq!(parsed[1]["args"]["late_us"], 90_000.0);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).expect("writing to a Vec cannot fail");
        let parsed: Vec<Value> = serde_json::from_slice(&out).expect("valid JSON");
        assert!(parsed.is_empty(), "no events, empty array");
    }
}
