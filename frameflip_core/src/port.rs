// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Notifications from the render manager back to the player.
//!
//! All methods default to no-ops; [`NullPort`] implements none of them.
//! Notifications are delivered from whichever thread caused them, often
//! while the manager holds internal locks, so implementations must not
//! call back into the manager.

use crate::backend::RenderInfo;

/// Receives state changes from the render manager.
pub trait PlayerPort: Send + Sync {
    /// Backend capabilities after a successful configuration.
    fn update_render_info(&self, info: &RenderInfo) {
        let _ = info;
    }

    /// Current slot occupancy.
    fn update_render_buffers(&self, queued: usize, discard: usize, free: usize) {
        let _ = (queued, discard, free);
    }

    /// Video parameters changed (configuration, resolution, view mode).
    fn video_params_change(&self) {}

    /// Clock sync was evaluated; `enabled` tells whether it is active.
    fn update_clock_sync(&self, enabled: bool) {
        let _ = enabled;
    }
}

/// A [`PlayerPort`] that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPort;

impl PlayerPort for NullPort {}
