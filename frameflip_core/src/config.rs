// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render manager tuning.
//!
//! Every timeout and threshold the manager uses lives here. Defaults match
//! long-standing player behavior; override individual keys from TOML:
//!
//! ```toml
//! drain_timeout_ms = 2000
//! late_tolerance = 0.5
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scheduler::LatePolicy;

/// Manager configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// How long `configure` waits for in-flight presentation to drain.
    pub drain_timeout_ms: u64,
    /// How long `configure` waits for the render thread to apply it.
    pub configure_timeout_ms: u64,
    /// How long a blocking `flip_page` waits for its frame to be picked up.
    pub flip_wait_timeout_ms: u64,
    /// Poll interval of a blocking `flip_page`.
    pub flip_wait_poll_ms: u64,
    /// Poll interval of `wait_for_buffer`.
    pub buffer_poll_ms: u64,
    /// How long an off-thread `flush` waits for the render thread.
    pub flush_timeout_ms: u64,
    /// Wait for the first frame right after a render-thread configure.
    pub post_configure_wait_ms: u64,
    /// How long after a page flip the manager counts as presenting.
    pub presenting_hold_ms: u64,
    /// Hard cap on slots, regardless of backend.
    pub max_buffers: usize,
    /// Fraction of a frame a late frame may trail before it is skipped.
    pub late_tolerance: f64,
    /// Late-frame count above which the tolerance is dropped.
    pub late_frame_cutoff: i32,
    /// Phase-error samples averaged per clock-sync window.
    pub clock_sync_samples: u32,
    /// Maximum refresh/content mismatch, in Hz, for clock sync.
    pub clock_sync_epsilon: f64,
    /// Switch the display refresh to match content in fullscreen.
    pub adjust_refresh_rate: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let late = LatePolicy::standard();
        Self {
            drain_timeout_ms: 5000,
            configure_timeout_ms: 1000,
            flip_wait_timeout_ms: 200,
            flip_wait_poll_ms: 20,
            buffer_poll_ms: 50,
            flush_timeout_ms: 1000,
            post_configure_wait_ms: 50,
            presenting_hold_ms: 1000,
            max_buffers: 6,
            late_tolerance: late.tolerance,
            late_frame_cutoff: late.cutoff,
            clock_sync_samples: 30,
            clock_sync_epsilon: 0.01,
            adjust_refresh_rate: false,
        }
    }
}

impl RenderConfig {
    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_buffers < 2 {
            return Err(ConfigError::Invalid {
                key: "max_buffers",
                reason: "at least two slots are required",
            });
        }
        if self.late_tolerance.is_nan() || self.late_tolerance < 0.0 {
            return Err(ConfigError::Invalid {
                key: "late_tolerance",
                reason: "must be a non-negative number",
            });
        }
        if self.clock_sync_epsilon.is_nan() || self.clock_sync_epsilon <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "clock_sync_epsilon",
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// Frame-selection slack.
    #[must_use]
    pub fn late_policy(&self) -> LatePolicy {
        LatePolicy {
            tolerance: self.late_tolerance,
            cutoff: self.late_frame_cutoff,
        }
    }

    pub(crate) fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub(crate) fn configure_timeout(&self) -> Duration {
        Duration::from_millis(self.configure_timeout_ms)
    }

    pub(crate) fn flip_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.flip_wait_timeout_ms)
    }

    pub(crate) fn flip_wait_poll(&self) -> Duration {
        Duration::from_millis(self.flip_wait_poll_ms)
    }

    pub(crate) fn buffer_poll(&self) -> Duration {
        Duration::from_millis(self.buffer_poll_ms)
    }

    pub(crate) fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub(crate) fn post_configure_wait(&self) -> Duration {
        Duration::from_millis(self.post_configure_wait_ms)
    }

    pub(crate) fn presenting_hold(&self) -> Duration {
        Duration::from_millis(self.presenting_hold_ms)
    }
}
