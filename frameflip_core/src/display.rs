// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display collaborator: refresh rate, latency and GUI state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// What the render manager needs to know about the display it feeds.
pub trait DisplayContext: Send + Sync {
    /// Current refresh rate in Hz.
    fn refresh_rate(&self) -> f64;

    /// Number of swap-chain buffers.
    fn swap_buffer_count(&self) -> u32 {
        2
    }

    /// Pipeline latency, in seconds, reported for `refresh_rate`.
    ///
    /// A refresh of `0.0` asks for the windowed-mode latency.
    fn display_latency(&self, refresh_rate: f64) -> f64 {
        let _ = refresh_rate;
        0.0
    }

    /// Returns `true` when the GUI runs in a window.
    fn is_windowed(&self) -> bool {
        false
    }

    /// Returns `false` when the GUI is not being drawn (screensaver, minimized).
    fn render_gui(&self) -> bool {
        true
    }

    /// Returns `true` when video is shown fullscreen.
    fn is_fullscreen_video(&self) -> bool {
        false
    }

    /// Switches the display to the mode that best fits `fps` content of
    /// `width` pixels.
    fn match_refresh_rate(&self, fps: f64, width: u32) {
        let _ = (fps, width);
    }

    /// Asks the GUI to enter fullscreen video.
    fn request_fullscreen(&self) {}
}

/// A [`DisplayContext`] with a settable refresh rate and GUI state.
#[derive(Debug)]
pub struct FixedDisplay {
    refresh_bits: AtomicU64,
    latency_secs_bits: AtomicU64,
    render_gui: AtomicBool,
    fullscreen: AtomicBool,
}

impl FixedDisplay {
    /// A display refreshing at `refresh_rate` Hz with zero latency.
    #[must_use]
    pub fn new(refresh_rate: f64) -> Self {
        Self {
            refresh_bits: AtomicU64::new(refresh_rate.to_bits()),
            latency_secs_bits: AtomicU64::new(0.0_f64.to_bits()),
            render_gui: AtomicBool::new(true),
            fullscreen: AtomicBool::new(false),
        }
    }

    /// Changes the refresh rate.
    pub fn set_refresh_rate(&self, refresh_rate: f64) {
        self.refresh_bits
            .store(refresh_rate.to_bits(), Ordering::Relaxed);
    }

    /// Changes the reported pipeline latency.
    pub fn set_latency(&self, seconds: f64) {
        self.latency_secs_bits
            .store(seconds.to_bits(), Ordering::Relaxed);
    }

    /// Toggles whether the GUI is drawn.
    pub fn set_render_gui(&self, render: bool) {
        self.render_gui.store(render, Ordering::Relaxed);
    }

    /// Returns `true` once fullscreen was requested.
    #[must_use]
    pub fn fullscreen_requested(&self) -> bool {
        self.fullscreen.load(Ordering::Relaxed)
    }
}

impl DisplayContext for FixedDisplay {
    fn refresh_rate(&self) -> f64 {
        f64::from_bits(self.refresh_bits.load(Ordering::Relaxed))
    }

    fn display_latency(&self, _refresh_rate: f64) -> f64 {
        f64::from_bits(self.latency_secs_bits.load(Ordering::Relaxed))
    }

    fn render_gui(&self) -> bool {
        self.render_gui.load(Ordering::Relaxed)
    }

    fn is_fullscreen_video(&self) -> bool {
        self.fullscreen.load(Ordering::Relaxed)
    }

    fn request_fullscreen(&self) {
        self.fullscreen.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_display_reports_updates() {
        let display = FixedDisplay::new(60.0);
        assert_eq!(display.refresh_rate(), 60.0);
        display.set_refresh_rate(50.0);
        display.set_latency(0.02);
        assert_eq!(display.refresh_rate(), 50.0);
        assert_eq!(display.display_latency(50.0), 0.02);
        assert_eq!(display.swap_buffer_count(), 2, "default swap chain");
    }

    #[test]
    fn fullscreen_request_is_remembered() {
        let display = FixedDisplay::new(60.0);
        assert!(!display.is_fullscreen_video());
        display.request_fullscreen();
        assert!(display.fullscreen_requested());
        assert!(display.is_fullscreen_video());
    }
}
