// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for renderers.
//!
//! A *backend* owns the per-slot image storage and draws the presenting
//! slot onto the screen. The manager drives it through [`RenderBackend`]
//! and never touches pixels itself:
//!
//! - **Configuration**: [`configure`](RenderBackend::configure) accepts
//!   stream parameters, [`render_info`](RenderBackend::render_info)
//!   reports optimal and maximum buffer counts, and
//!   [`set_buffer_size`](RenderBackend::set_buffer_size) fixes the slot count.
//!
//! - **Ingestion**: [`get_image`](RenderBackend::get_image) exposes a
//!   slot's storage for copy formats; hardware formats go through
//!   [`add_picture_hw`](RenderBackend::add_picture_hw).
//!
//! - **Presentation**: [`flip_page`](RenderBackend::flip_page) makes a
//!   slot current and [`render_update`](RenderBackend::render_update) draws
//!   one pass of it.
//!
//! - **Retention**: [`need_buffer`](RenderBackend::need_buffer) keeps a
//!   retired slot out of the free pool while the backend still reads it
//!   (temporal post-processing, in-flight GPU work).
//!
//! # Threading
//!
//! The manager keeps the backend behind its data lock. Every method runs
//! with that lock held, from either the producer thread (ingestion) or the
//! render thread (everything else).
//!
//! [`RendererFactory`] creates backends on demand; the manager calls it
//! on the render thread whenever the current backend cannot handle the
//! configured format.

use kurbo::Rect;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::flags::{ConfigFlags, RenderFlags};
use crate::format::RenderFormat;
use crate::picture::{HwHandle, Image, VideoPicture};
use crate::slot::SlotIndex;

/// Stream parameters for [`RenderManager::configure`].
///
/// [`RenderManager::configure`]: crate::manager::RenderManager::configure
#[derive(Clone, Debug, Default)]
pub struct VideoParams {
    /// Coded width.
    pub width: u32,
    /// Coded height.
    pub height: u32,
    /// Display width after pixel-aspect correction.
    pub display_width: u32,
    /// Display height after pixel-aspect correction.
    pub display_height: u32,
    /// Content frame rate.
    pub fps: f64,
    /// Stream flags.
    pub flags: ConfigFlags,
    /// Pixel layout.
    pub format: RenderFormat,
    /// Hardware decoder context, if any.
    pub hw: Option<HwHandle>,
    /// Rotation in degrees.
    pub orientation: u32,
    /// Requested slot count; `0` lets the backend choose.
    pub buffers: usize,
}

impl VideoParams {
    /// Parameters for a progressive stream with square pixels.
    #[must_use]
    pub fn new(width: u32, height: u32, fps: f64, format: RenderFormat) -> Self {
        Self {
            width,
            height,
            display_width: width,
            display_height: height,
            fps,
            format,
            ..Self::default()
        }
    }

    /// Sets the requested slot count.
    #[must_use]
    pub fn with_buffers(mut self, buffers: usize) -> Self {
        self.buffers = buffers;
        self
    }

    /// Sets the stream flags.
    #[must_use]
    pub fn with_flags(mut self, flags: ConfigFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns `true` if `other` describes the same stream.
    ///
    /// The hardware context and the fullscreen request are not compared;
    /// the backend decides whether a new hardware context matters.
    #[must_use]
    pub fn same_stream(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.display_width == other.display_width
            && self.display_height == other.display_height
            && self.fps == other.fps
            && self.flags.identity() == other.flags.identity()
            && self.format == other.format
            && self.orientation == other.orientation
            && self.buffers == other.buffers
    }
}

/// Buffering capabilities reported by a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderInfo {
    /// Slot count the backend performs best with.
    pub optimal_buffer_size: usize,
    /// Upper bound on slots.
    pub max_buffer_size: usize,
}

/// Picture adjustments a backend may support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderFeature {
    /// Brightness control.
    Brightness,
    /// Contrast control.
    Contrast,
    /// Gamma control.
    Gamma,
    /// Noise reduction.
    Noise,
    /// Sharpening.
    Sharpness,
    /// Non-linear stretch.
    NonLinearStretch,
    /// Rotation by orientation.
    Rotation,
    /// Stretch to fill.
    Stretch,
    /// Zoom.
    Zoom,
    /// Vertical shift.
    VerticalShift,
    /// Pixel-ratio override.
    PixelRatio,
    /// Post-processing filters.
    PostProcess,
}

/// Scaling filters a backend may support.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalingMethod {
    /// Nearest neighbour.
    Nearest,
    /// Bilinear.
    Linear,
    /// Bicubic.
    Cubic,
    /// Lanczos.
    Lanczos,
    /// Backend's choice.
    Auto,
}

/// How video is fitted into the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Fit inside the view, preserving aspect ratio.
    #[default]
    Normal,
    /// Fill the view, ignoring aspect ratio.
    Stretch,
    /// Native size, centered.
    Original,
}

/// Source, destination and view rectangles of the current video.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct VideoRect {
    /// Region of the decoded picture that is shown.
    pub source: Rect,
    /// Where it lands on screen.
    pub dest: Rect,
    /// The area available for video.
    pub view: Rect,
}

/// A renderer the manager can present through.
pub trait RenderBackend: Send {
    /// Called once before first configuration.
    fn pre_init(&mut self) {}

    /// Accepts stream parameters.
    fn configure(&mut self, params: &VideoParams) -> Result<(), RenderError>;

    /// Returns `true` if a new hardware context forces reconfiguration.
    fn config_changed(&self, hw: Option<&HwHandle>) -> bool {
        let _ = hw;
        false
    }

    /// Returns `true` if this backend can render `format`.
    fn handles_format(&self, format: RenderFormat) -> bool;

    /// Buffering capabilities.
    fn render_info(&self) -> RenderInfo;

    /// Fixes the number of slots.
    fn set_buffer_size(&mut self, size: usize);

    /// Applies pending settings; also called on GUI passes of a video-layer
    /// backend.
    fn update(&mut self) {}

    /// Storage for a copy-format picture into `slot`.
    fn get_image(&mut self, slot: SlotIndex) -> Option<&mut Image>;

    /// Ends a [`get_image`](Self::get_image) access.
    fn release_image(&mut self, slot: SlotIndex) {
        let _ = slot;
    }

    /// Imports a hardware picture into `slot`.
    fn add_picture_hw(&mut self, picture: &VideoPicture<'_>, slot: SlotIndex) {
        let _ = (picture, slot);
    }

    /// Returns `true` if `picture` must go through
    /// [`add_picture_hw`](Self::add_picture_hw) despite a copy format.
    fn is_picture_hw(&self, picture: &VideoPicture<'_>) -> bool {
        picture.hw.is_some()
    }

    /// Makes `slot` the page subsequent passes draw.
    fn flip_page(&mut self, slot: SlotIndex);

    /// Draws one pass of the current page.
    fn render_update(&mut self, clear: bool, flags: RenderFlags, alpha: u8);

    /// Returns `true` while the backend still reads a retired slot.
    fn need_buffer(&self, slot: SlotIndex) -> bool {
        let _ = slot;
        false
    }

    /// Called when a retired slot returns to the free pool.
    fn release_buffer(&mut self, slot: SlotIndex) {
        let _ = slot;
    }

    /// Returns `true` if the backend draws during the GUI pass.
    fn is_gui_layer(&self) -> bool {
        true
    }

    /// Returns `true` if the backend can apply `feature`.
    fn supports_feature(&self, feature: RenderFeature) -> bool {
        let _ = feature;
        false
    }

    /// Returns `true` if the backend can scale with `method`.
    fn supports_scaling(&self, method: ScalingMethod) -> bool {
        let _ = method;
        false
    }

    /// Returns `true` if interlaced content should render in two passes.
    fn wants_double_pass(&self) -> bool {
        false
    }

    /// Drops any frames the backend holds.
    fn flush(&mut self) {}

    /// Display aspect ratio of the configured stream.
    fn aspect_ratio(&self) -> f32;

    /// Current video rectangles.
    fn video_rect(&self) -> VideoRect;

    /// Changes how video fits into the view.
    fn set_view_mode(&mut self, mode: ViewMode) {
        let _ = mode;
    }
}

/// Creates backends for a format.
pub trait RendererFactory: Send + Sync {
    /// Returns a backend able to render `format`, or `None`.
    fn create(&self, format: RenderFormat) -> Option<Box<dyn RenderBackend>>;
}

impl<F> RendererFactory for F
where
    F: Fn(RenderFormat) -> Option<Box<dyn RenderBackend>> + Send + Sync,
{
    fn create(&self, format: RenderFormat) -> Option<Box<dyn RenderBackend>> {
        self(format)
    }
}
