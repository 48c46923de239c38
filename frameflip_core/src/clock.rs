// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Playback clock collaborator.
//!
//! The manager reads the player's master clock to predict when a frame
//! will reach the screen, and publishes a phase correction through
//! [`set_vsync_adjust`](ClockSource::set_vsync_adjust) to phase-lock video
//! to the display refresh. The player's audio sync consumes the correction;
//! it does not move the reading the manager predicts from.
//! [`MonotonicClock`] is a self-contained implementation driven by
//! [`Instant`]:
//!
//! ```text
//! clock = speed * (now - anchor) + offset
//! ```
//!
//! Changing the speed re-anchors the mapping so the clock stays
//! continuous.

use std::time::Instant;

use parking_lot::Mutex;

use crate::time::{MediaTime, TIME_BASE};

/// Timing details a reference clock may expose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockInfo {
    /// Vblanks missed since the last query.
    pub missed_vblanks: i32,
    /// Playback speed relative to real time.
    pub clock_speed: f64,
    /// Display refresh rate the clock is locked to, in Hz.
    pub refresh_rate: f64,
}

/// Source of media time for the presentation pipeline.
pub trait ClockSource: Send + Sync {
    /// Current media time.
    fn clock(&self) -> MediaTime;

    /// Playback speed; negative while rewinding.
    fn speed(&self) -> f64;

    /// Reference-clock details, if the clock is locked to vblank.
    fn clock_info(&self) -> Option<ClockInfo> {
        None
    }

    /// Publishes a phase correction, in media time, for audio sync.
    fn set_vsync_adjust(&self, adjust: MediaTime);
}

#[derive(Debug)]
struct Mapping {
    anchor: Instant,
    offset: MediaTime,
    speed: f64,
    vsync_adjust: MediaTime,
}

/// A [`ClockSource`] backed by the monotonic system clock.
#[derive(Debug)]
pub struct MonotonicClock {
    mapping: Mutex<Mapping>,
}

impl MonotonicClock {
    /// Starts a clock at media time zero, running at normal speed.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// Starts a clock at `start`.
    #[must_use]
    pub fn starting_at(start: MediaTime) -> Self {
        Self {
            mapping: Mutex::new(Mapping {
                anchor: Instant::now(),
                offset: start,
                speed: 1.0,
                vsync_adjust: 0.0,
            }),
        }
    }

    /// Changes playback speed without a discontinuity.
    pub fn set_speed(&self, speed: f64) {
        let mut mapping = self.mapping.lock();
        let now = Instant::now();
        mapping.offset = Self::media_at(&mapping, now);
        mapping.anchor = now;
        mapping.speed = speed;
    }

    /// The phase correction currently applied.
    #[must_use]
    pub fn vsync_adjust(&self) -> MediaTime {
        self.mapping.lock().vsync_adjust
    }

    fn media_at(mapping: &Mapping, now: Instant) -> MediaTime {
        let elapsed = now.saturating_duration_since(mapping.anchor).as_secs_f64() * TIME_BASE;
        mapping.offset + mapping.speed * elapsed
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for MonotonicClock {
    fn clock(&self) -> MediaTime {
        let mapping = self.mapping.lock();
        Self::media_at(&mapping, Instant::now())
    }

    fn speed(&self) -> f64 {
        self.mapping.lock().speed
    }

    fn set_vsync_adjust(&self, adjust: MediaTime) {
        self.mapping.lock().vsync_adjust = adjust;
    }
}
