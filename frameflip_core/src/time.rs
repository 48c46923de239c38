// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Media time base and conversions.
//!
//! Presentation timestamps, clock readings and latencies inside the render
//! manager are plain `f64` values in media-time units of one microsecond
//! ([`TIME_BASE`] units per second). Floating point is kept throughout
//! because the frame-selection and clock-sync arithmetic mixes fractional
//! frame durations with modular phase error.
//!
//! ```text
//!   seconds ──× TIME_BASE──► media time ──÷ 1000──► milliseconds
//! ```

use std::time::Duration;

/// Media-time units per second.
pub const TIME_BASE: f64 = 1_000_000.0;

/// Sentinel meaning "no presentation timestamp".
pub const NOPTS: f64 = -4_503_599_627_370_496.0;

/// A presentation timestamp or clock reading in media-time units.
pub type MediaTime = f64;

/// Converts seconds to media time.
#[inline]
#[must_use]
pub fn sec_to_time(seconds: f64) -> MediaTime {
    seconds * TIME_BASE
}

/// Converts milliseconds to media time.
#[inline]
#[must_use]
pub fn msec_to_time(millis: f64) -> MediaTime {
    millis * TIME_BASE / 1000.0
}

/// Converts media time to milliseconds.
#[inline]
#[must_use]
pub fn time_to_msec(time: MediaTime) -> f64 {
    time * 1000.0 / TIME_BASE
}

/// Duration of one display refresh (or content frame) at `rate` Hz.
///
/// Returns `0.0` for non-positive rates so callers never divide by zero.
#[inline]
#[must_use]
pub fn frame_duration(rate: f64) -> MediaTime {
    if rate > 0.0 { TIME_BASE / rate } else { 0.0 }
}

/// Returns `true` if `pts` carries a real timestamp.
#[inline]
#[must_use]
pub fn has_pts(pts: MediaTime) -> bool {
    pts != NOPTS
}

/// Converts a non-negative media-time span to a wall-clock [`Duration`].
///
/// Negative or non-finite spans saturate to zero.
#[must_use]
pub fn time_to_duration(time: MediaTime) -> Duration {
    if time.is_finite() && time > 0.0 {
        Duration::from_secs_f64(time / TIME_BASE)
    } else {
        Duration::ZERO
    }
}
