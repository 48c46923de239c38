// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Copy-based software backend.
//!
//! [`SoftwareRenderer`] keeps one [`Image`] per slot and composites the
//! current page into an 8-bit luma framebuffer, honoring field selection
//! and alpha so that BOB, WEAVE and BLEND passes produce observably
//! different output. Hardware formats are refused.
//!
//! A cloneable [`RenderProbe`] can be attached to watch the renderer from
//! outside the manager (tests, the demo's statistics).

use std::collections::VecDeque;
use std::sync::Arc;

use kurbo::Rect;
use parking_lot::Mutex;

use crate::backend::{
    RenderBackend, RenderFeature, RenderInfo, RendererFactory, ScalingMethod, VideoParams,
    VideoRect, ViewMode,
};
use crate::error::RenderError;
use crate::flags::RenderFlags;
use crate::format::RenderFormat;
use crate::picture::{Image, VideoPicture};
use crate::queue::History;
use crate::slot::SlotIndex;

const PASS_HISTORY: usize = 256;

/// One recorded [`render_update`](RenderBackend::render_update) call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderPass {
    /// Page drawn, if any was flipped.
    pub slot: Option<SlotIndex>,
    /// Whether the framebuffer was cleared first.
    pub clear: bool,
    /// Pass flags.
    pub flags: RenderFlags,
    /// Pass alpha.
    pub alpha: u8,
}

#[derive(Debug)]
struct ProbeLog {
    configures: usize,
    flips: Vec<SlotIndex>,
    passes: History<RenderPass>,
    released: Vec<SlotIndex>,
    hw_imports: usize,
    updates: usize,
    flushes: usize,
}

impl Default for ProbeLog {
    fn default() -> Self {
        Self {
            configures: 0,
            flips: Vec::new(),
            passes: History::new(PASS_HISTORY),
            released: Vec::new(),
            hw_imports: 0,
            updates: 0,
            flushes: 0,
        }
    }
}

/// Shared view of what a [`SoftwareRenderer`] has done.
#[derive(Clone, Debug, Default)]
pub struct RenderProbe {
    log: Arc<Mutex<ProbeLog>>,
}

impl RenderProbe {
    /// Creates an empty probe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful configurations.
    #[must_use]
    pub fn configures(&self) -> usize {
        self.log.lock().configures
    }

    /// Page flips in order.
    #[must_use]
    pub fn flips(&self) -> Vec<SlotIndex> {
        self.log.lock().flips.clone()
    }

    /// Most recent render passes, oldest first.
    #[must_use]
    pub fn passes(&self) -> Vec<RenderPass> {
        self.log.lock().passes.iter().copied().collect()
    }

    /// Render passes that fell out of the history.
    #[must_use]
    pub fn dropped_passes(&self) -> u64 {
        self.log.lock().passes.evicted()
    }

    /// Slots returned to the free pool, in order.
    #[must_use]
    pub fn released(&self) -> Vec<SlotIndex> {
        self.log.lock().released.clone()
    }

    /// Hardware pictures imported.
    #[must_use]
    pub fn hw_imports(&self) -> usize {
        self.log.lock().hw_imports
    }

    /// Calls to [`update`](RenderBackend::update).
    #[must_use]
    pub fn updates(&self) -> usize {
        self.log.lock().updates
    }

    /// Calls to [`flush`](RenderBackend::flush).
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.log.lock().flushes
    }

    /// Forgets everything recorded so far.
    pub fn reset(&self) {
        let mut log = self.log.lock();
        log.configures = 0;
        log.flips.clear();
        log.passes.clear();
        log.released.clear();
        log.hw_imports = 0;
        log.updates = 0;
        log.flushes = 0;
    }
}

/// Construction options for [`SoftwareRenderer`]; also its factory.
#[derive(Clone, Debug)]
pub struct SoftwareFactory {
    info: RenderInfo,
    retained_frames: usize,
    gui_layer: bool,
    double_pass: bool,
    probe: RenderProbe,
}

impl Default for SoftwareFactory {
    fn default() -> Self {
        Self {
            info: RenderInfo {
                optimal_buffer_size: 4,
                max_buffer_size: 6,
            },
            retained_frames: 0,
            gui_layer: true,
            double_pass: false,
            probe: RenderProbe::new(),
        }
    }
}

impl SoftwareFactory {
    /// Default options: four optimal slots, six at most, GUI layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the reported buffering capabilities.
    #[must_use]
    pub fn with_render_info(mut self, info: RenderInfo) -> Self {
        self.info = info;
        self
    }

    /// Keeps the `count` most recently replaced pages out of the free pool.
    #[must_use]
    pub fn with_retained_frames(mut self, count: usize) -> Self {
        self.retained_frames = count;
        self
    }

    /// Renders in the video pass instead of the GUI pass.
    #[must_use]
    pub fn as_video_layer(mut self) -> Self {
        self.gui_layer = false;
        self
    }

    /// Requests two passes for interlaced content.
    #[must_use]
    pub fn with_double_pass(mut self) -> Self {
        self.double_pass = true;
        self
    }

    /// Attaches a probe.
    #[must_use]
    pub fn with_probe(mut self, probe: RenderProbe) -> Self {
        self.probe = probe;
        self
    }

    /// The attached probe.
    #[must_use]
    pub fn probe(&self) -> RenderProbe {
        self.probe.clone()
    }

    /// Builds a renderer with these options.
    #[must_use]
    pub fn build(&self) -> SoftwareRenderer {
        SoftwareRenderer {
            options: self.clone(),
            params: None,
            images: Vec::new(),
            current: None,
            recent: VecDeque::new(),
            output: Vec::new(),
            view_mode: ViewMode::Normal,
            view: None,
        }
    }
}

impl RendererFactory for SoftwareFactory {
    fn create(&self, format: RenderFormat) -> Option<Box<dyn RenderBackend>> {
        if format.is_hardware() {
            log::debug!("software renderer cannot import {format}");
            return None;
        }
        Some(Box::new(self.build()))
    }
}

/// A backend that copies pictures into memory and composites luma.
#[derive(Debug)]
pub struct SoftwareRenderer {
    options: SoftwareFactory,
    params: Option<VideoParams>,
    images: Vec<Image>,
    current: Option<SlotIndex>,
    recent: VecDeque<SlotIndex>,
    output: Vec<u8>,
    view_mode: ViewMode,
    view: Option<Rect>,
}

impl SoftwareRenderer {
    /// The composited luma framebuffer, row-major at coded size.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Sets the on-screen area available for video.
    pub fn set_view(&mut self, view: Rect) {
        self.view = Some(view);
    }

    fn dimensions(&self) -> (usize, usize) {
        self.params
            .as_ref()
            .map_or((0, 0), |p| (p.width as usize, p.height as usize))
    }

    fn luma_at(image: &Image, x: usize, y: usize) -> u8 {
        let stride = image.stride(0);
        let plane = image.plane(0);
        let sample = |offset: usize| plane.get(y * stride + offset).copied().unwrap_or(0);
        match image.format() {
            RenderFormat::Yuv420p | RenderFormat::Nv12 => sample(x),
            // Little-endian high byte carries the most significant bits.
            RenderFormat::Yuv420p10 => {
                let value = u16::from_le_bytes([sample(2 * x), sample(2 * x + 1)]);
                u8::try_from(value >> 2).unwrap_or(u8::MAX)
            }
            RenderFormat::Yuv420p16 => sample(2 * x + 1),
            RenderFormat::Yuyv422 => sample(2 * x),
            RenderFormat::Uyvy422 => sample(2 * x + 1),
            _ => 0,
        }
    }

    fn blend(dst: &mut u8, src: u8, alpha: u8) {
        let a = u16::from(alpha);
        let mixed = (u16::from(src) * a + u16::from(*dst) * (255 - a)) / 255;
        *dst = u8::try_from(mixed).unwrap_or(u8::MAX);
    }
}

impl RenderBackend for SoftwareRenderer {
    fn configure(&mut self, params: &VideoParams) -> Result<(), RenderError> {
        if !self.handles_format(params.format) {
            return Err(RenderError::UnsupportedFormat(params.format));
        }
        self.params = Some(params.clone());
        self.images.clear();
        self.current = None;
        self.recent.clear();
        self.output = vec![0; params.width as usize * params.height as usize];
        self.options.probe.log.lock().configures += 1;
        Ok(())
    }

    fn handles_format(&self, format: RenderFormat) -> bool {
        format != RenderFormat::None && !format.is_hardware()
    }

    fn render_info(&self) -> RenderInfo {
        self.options.info
    }

    fn set_buffer_size(&mut self, size: usize) {
        let Some(params) = &self.params else {
            return;
        };
        let image = Image::new(params.format, params.width, params.height);
        self.images = vec![image; size];
        self.current = None;
        self.recent.clear();
    }

    fn update(&mut self) {
        self.options.probe.log.lock().updates += 1;
    }

    fn get_image(&mut self, slot: SlotIndex) -> Option<&mut Image> {
        self.images.get_mut(slot.0)
    }

    fn add_picture_hw(&mut self, picture: &VideoPicture<'_>, slot: SlotIndex) {
        log::debug!("software renderer ignoring hardware picture for slot {slot}");
        let _ = picture;
        self.options.probe.log.lock().hw_imports += 1;
    }

    fn flip_page(&mut self, slot: SlotIndex) {
        if let Some(previous) = self.current.replace(slot) {
            if previous != slot && self.options.retained_frames > 0 {
                self.recent.push_back(previous);
                while self.recent.len() > self.options.retained_frames {
                    self.recent.pop_front();
                }
            }
        }
        self.recent.retain(|s| *s != slot);
        self.options.probe.log.lock().flips.push(slot);
    }

    fn render_update(&mut self, clear: bool, flags: RenderFlags, alpha: u8) {
        self.options.probe.log.lock().passes.record(RenderPass {
            slot: self.current,
            clear,
            flags,
            alpha,
        });
        if clear {
            self.output.fill(0);
        }
        let Some(image) = self.current.and_then(|slot| self.images.get(slot.0)) else {
            return;
        };
        let (width, height) = self.dimensions();
        let parity = if flags.contains(RenderFlags::TOP) {
            Some(0)
        } else if flags.contains(RenderFlags::BOT) {
            Some(1)
        } else {
            None
        };
        let line_double = parity.is_some() && !flags.contains(RenderFlags::WEAVE);
        for y in 0..height {
            if parity.is_some_and(|p| y % 2 != p) {
                continue;
            }
            for x in 0..width {
                let luma = Self::luma_at(image, x, y);
                Self::blend(&mut self.output[y * width + x], luma, alpha);
                if line_double && y + 1 < height {
                    Self::blend(&mut self.output[(y + 1) * width + x], luma, alpha);
                }
            }
        }
    }

    fn need_buffer(&self, slot: SlotIndex) -> bool {
        self.recent.contains(&slot)
    }

    fn release_buffer(&mut self, slot: SlotIndex) {
        self.options.probe.log.lock().released.push(slot);
    }

    fn is_gui_layer(&self) -> bool {
        self.options.gui_layer
    }

    fn supports_feature(&self, feature: RenderFeature) -> bool {
        matches!(
            feature,
            RenderFeature::Stretch
                | RenderFeature::Zoom
                | RenderFeature::PixelRatio
                | RenderFeature::Rotation
        )
    }

    fn supports_scaling(&self, method: ScalingMethod) -> bool {
        matches!(
            method,
            ScalingMethod::Nearest | ScalingMethod::Linear | ScalingMethod::Auto
        )
    }

    fn wants_double_pass(&self) -> bool {
        self.options.double_pass
    }

    fn flush(&mut self) {
        self.current = None;
        self.recent.clear();
        self.output.fill(0);
        self.options.probe.log.lock().flushes += 1;
    }

    fn aspect_ratio(&self) -> f32 {
        match &self.params {
            Some(p) if p.display_height > 0 => p.display_width as f32 / p.display_height as f32,
            _ => 1.0,
        }
    }

    fn video_rect(&self) -> VideoRect {
        let Some(params) = &self.params else {
            return VideoRect::default();
        };
        let source = Rect::new(0.0, 0.0, f64::from(params.width), f64::from(params.height));
        let native_w = f64::from(params.display_width);
        let native_h = f64::from(params.display_height);
        let view = self
            .view
            .unwrap_or_else(|| Rect::new(0.0, 0.0, native_w, native_h));
        let dest = match self.view_mode {
            ViewMode::Stretch => view,
            ViewMode::Original => {
                Rect::from_center_size(view.center(), (native_w, native_h))
            }
            ViewMode::Normal => {
                if native_w <= 0.0 || native_h <= 0.0 {
                    view
                } else {
                    let scale = (view.width() / native_w).min(view.height() / native_h);
                    Rect::from_center_size(view.center(), (native_w * scale, native_h * scale))
                }
            }
        };
        VideoRect { source, dest, view }
    }

    fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }
}
