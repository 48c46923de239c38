// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Late-frame selection and vsync clock sync.
//!
//! Each render tick predicts the media time at which the next flip becomes
//! visible (the *render pts*) and picks the queued frame to show:
//!
//! ```text
//!   render_pts = clock + display_latency - video_delay + 2 * frame_time
//!
//!   queued:  [ f0 ][ f1 ][ f2 ][ f3 ]          (arrival order)
//!              │     │     │
//!              └─────┴─────┴── overdue by more than late_factor * frame_time
//!                              → skip to the newest such frame
//! ```
//!
//! [`ClockSync`] averages the phase error between render pts and frame pts
//! over a window of ticks and publishes a correction that nudges the player
//! clock onto the vblank grid. It only runs when the display refresh is an
//! integer multiple of the content rate; see [`clock_sync_eligible`].

use serde::{Deserialize, Serialize};

use crate::time::MediaTime;

/// How forgiving selection is towards frames that are slightly late.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatePolicy {
    /// Fraction of a frame duration a frame may be overdue and still be
    /// shown instead of skipped.
    pub tolerance: f64,
    /// Accumulated late-frame count above which the tolerance is dropped.
    pub cutoff: i32,
}

impl LatePolicy {
    /// 0.98 frames of slack while fewer than seven frames have been late.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            tolerance: 0.98,
            cutoff: 6,
        }
    }

    /// Tolerance factor to apply given the current late-frame count.
    #[inline]
    #[must_use]
    pub fn factor(&self, late_frames: i32) -> f64 {
        if late_frames <= self.cutoff {
            self.tolerance
        } else {
            0.0
        }
    }
}

impl Default for LatePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Returns `true` once the front frame should be flipped.
///
/// A frame is due when the render pts has reached it, or when a caller
/// forces the next frame through (configuration drain, blocking flip).
#[inline]
#[must_use]
pub fn is_due(front_pts: MediaTime, render_pts: MediaTime, force: bool) -> bool {
    force || render_pts >= front_pts
}

/// Picks the queued frame to present.
///
/// `queued_pts` is in arrival order. Starting from the front, selection
/// advances past every frame the render pts has overtaken by at least
/// `late_factor * frame_time`, stopping at the first one it has not.
/// Returns the position of the chosen frame, or `None` for an empty queue.
#[must_use]
pub fn select_frame(
    queued_pts: &[MediaTime],
    render_pts: MediaTime,
    frame_time: MediaTime,
    late_factor: f64,
) -> Option<usize> {
    if queued_pts.is_empty() {
        return None;
    }
    let mut selected = 0;
    for (position, &pts) in queued_pts.iter().enumerate().skip(1) {
        if render_pts < pts + late_factor * frame_time {
            break;
        }
        selected = position;
    }
    Some(selected)
}

/// Whole content frames by which `pts` trails `render_pts`.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "late-frame count is clamped to the i32 range before truncation"
)]
pub fn frames_late(render_pts: MediaTime, pts: MediaTime, fps: f64) -> i32 {
    let late = (render_pts - pts) * fps / crate::time::TIME_BASE;
    if !late.is_finite() {
        return 0;
    }
    late.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// Returns `true` if the display refresh and content rate allow clock sync.
///
/// The content rate is scaled by the reference clock's speed when one is
/// available. Sync needs the refresh to be an integer multiple of the
/// content rate within `epsilon`.
#[must_use]
pub fn clock_sync_eligible(
    refresh_rate: f64,
    content_fps: f64,
    clock_speed: Option<f64>,
    epsilon: f64,
) -> bool {
    if content_fps == 0.0 {
        return false;
    }
    let fps = content_fps * clock_speed.unwrap_or(1.0);
    let diff = if refresh_rate >= fps {
        refresh_rate % fps
    } else {
        fps - refresh_rate
    };
    diff < epsilon
}

/// Running phase-error estimate for vsync clock sync.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClockSync {
    /// Whether sync is currently active.
    pub enabled: bool,
    /// Accumulated phase error of the current window.
    pub error: MediaTime,
    /// Samples in the current window.
    pub error_count: u32,
    /// Most recently published average phase error.
    pub sync_offset: MediaTime,
}

impl ClockSync {
    /// Clears the estimate and disables sync.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Adds one phase-error sample.
    ///
    /// Once more than `window` samples have accumulated, the average is
    /// stored as the sync offset, the window restarts, and the new offset
    /// is returned so the caller can apply it to the clock.
    pub fn observe(
        &mut self,
        render_pts: MediaTime,
        next_pts: MediaTime,
        frame_time: MediaTime,
        window: u32,
    ) -> Option<MediaTime> {
        if frame_time <= 0.0 {
            return None;
        }
        self.error += (render_pts - next_pts) % frame_time;
        self.error_count += 1;
        if self.error_count > window {
            let average = self.error / f64::from(self.error_count);
            self.sync_offset = average;
            self.error = 0.0;
            self.error_count = 0;
            Some(average)
        } else {
            None
        }
    }

    /// Centers `render_pts` within the vblank interval.
    #[inline]
    #[must_use]
    pub fn adjust(&self, render_pts: MediaTime, frame_time: MediaTime) -> MediaTime {
        render_pts + frame_time / 2.0 - self.sync_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::msec_to_time;

    fn ms(values: &[f64]) -> Vec<MediaTime> {
        values.iter().map(|v| msec_to_time(*v)).collect()
    }

    #[test]
    fn overdue_frames_are_skipped_to_newest_late_one() {
        // 240 Hz display: 4.17 ms frame time, 4.08 ms of slack.
        let frame_time = msec_to_time(1000.0 / 240.0);
        let queued = ms(&[0.0, 10.0, 20.0, 30.0]);
        let selected = select_frame(&queued, msec_to_time(25.0), frame_time, 0.98);
        assert_eq!(selected, Some(2), "the 20 ms frame is chosen");
    }

    #[test]
    fn punctual_queue_selects_front() {
        let frame_time = msec_to_time(1000.0 / 60.0);
        let queued = ms(&[100.0, 133.0, 166.0]);
        let selected = select_frame(&queued, msec_to_time(110.0), frame_time, 0.98);
        assert_eq!(selected, Some(0));
    }

    #[test]
    fn tolerance_keeps_slightly_late_frame() {
        let frame_time = msec_to_time(20.0);
        let queued = ms(&[0.0, 10.0]);
        // 10 ms frame is overtaken by 9 ms, less than 0.98 * 20 ms.
        assert_eq!(select_frame(&queued, msec_to_time(19.0), frame_time, 0.98), Some(0));
        // Without tolerance it is skipped to.
        assert_eq!(select_frame(&queued, msec_to_time(19.0), frame_time, 0.0), Some(1));
    }

    #[test]
    fn empty_queue_selects_nothing() {
        assert_eq!(select_frame(&[], 0.0, 1.0, 0.98), None);
    }

    #[test]
    fn tolerance_drops_after_cutoff() {
        let policy = LatePolicy::standard();
        assert_eq!(policy.factor(-1), 0.98);
        assert_eq!(policy.factor(6), 0.98);
        assert_eq!(policy.factor(7), 0.0);
    }

    #[test]
    fn due_gate_respects_force() {
        assert!(!is_due(100.0, 50.0, false));
        assert!(is_due(100.0, 50.0, true), "forced frames are always due");
        assert!(is_due(100.0, 100.0, false));
    }

    #[test]
    fn frames_late_truncates_toward_zero() {
        assert_eq!(frames_late(msec_to_time(100.0), msec_to_time(0.0), 25.0), 2);
        assert_eq!(frames_late(msec_to_time(0.0), msec_to_time(100.0), 25.0), -2);
        assert_eq!(frames_late(1.0, 0.0, f64::INFINITY), 0);
    }

    #[test]
    fn integer_refresh_multiples_are_eligible() {
        assert!(clock_sync_eligible(60.0, 30.0, None, 0.01));
        assert!(clock_sync_eligible(50.0, 25.0, None, 0.01));
        assert!(!clock_sync_eligible(60.0, 24.0, None, 0.01));
        assert!(!clock_sync_eligible(60.0, 0.0, None, 0.01), "unknown rate");
        assert!(
            !clock_sync_eligible(50.0, 60.0, None, 0.01),
            "content faster than display"
        );
    }

    #[test]
    fn clock_speed_scales_content_rate() {
        assert!(!clock_sync_eligible(60.0, 30.0, Some(1.1), 0.01));
        assert!(clock_sync_eligible(60.0, 30.0, Some(1.0), 0.01));
    }

    #[test]
    fn sync_offset_converges_to_constant_phase_error() {
        let frame_time = msec_to_time(1000.0 / 60.0);
        let phase = msec_to_time(3.0);
        let mut sync = ClockSync::default();
        let mut published = None;
        for tick in 0..31_u32 {
            let next_pts = f64::from(tick) * frame_time;
            let render_pts = next_pts + 2.0 * frame_time + phase;
            published = sync.observe(render_pts, next_pts, frame_time, 30);
            if tick < 30 {
                assert_eq!(published, None, "window still filling at tick {tick}");
            }
        }
        let offset = published.expect("31st sample publishes");
        assert!((offset - phase).abs() < 1e-6, "offset {offset} != {phase}");
        assert_eq!(sync.error_count, 0, "window restarts");
        assert!((sync.adjust(0.0, frame_time) - (frame_time / 2.0 - phase)).abs() < 1e-6);
    }

    #[test]
    fn reset_disables_sync() {
        let mut sync = ClockSync {
            enabled: true,
            error: 5.0,
            error_count: 3,
            sync_offset: 1.0,
        };
        sync.reset();
        assert_eq!(sync, ClockSync::default());
    }
}
