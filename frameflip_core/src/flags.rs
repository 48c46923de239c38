// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bit flags passed to backends and carried by configuration requests.

use bitflags::bitflags;

bitflags! {
    /// Per-pass render flags handed to [`RenderBackend::render_update`].
    ///
    /// [`RenderBackend::render_update`]: crate::backend::RenderBackend::render_update
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u32 {
        /// Render the top field.
        const TOP = 1 << 0;
        /// Render the bottom field.
        const BOT = 1 << 1;
        /// First field of a two-pass frame.
        const FIELD0 = 1 << 2;
        /// Second field of a two-pass frame.
        const FIELD1 = 1 << 3;
        /// Weave both fields.
        const WEAVE = 1 << 4;
        /// Suppress on-screen display for this pass.
        const NOOSD = 1 << 5;
    }
}

bitflags! {
    /// Stream-level flags supplied with a configuration request.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ConfigFlags: u32 {
        /// Switch the display to fullscreen once configured.
        const FULLSCREEN = 1 << 0;
        /// Content is interlaced.
        const INTERLACED = 1 << 1;
        /// Full-range (0-255) luma.
        const FULL_RANGE = 1 << 2;
        /// Stereo content, side by side.
        const STEREO_SBS = 1 << 3;
        /// Stereo content, top and bottom.
        const STEREO_TAB = 1 << 4;
    }
}

impl ConfigFlags {
    /// Flags that change the stream identity.
    ///
    /// Fullscreen is a display request, not a property of the stream.
    #[must_use]
    pub const fn identity(self) -> Self {
        self.difference(Self::FULLSCREEN)
    }
}
