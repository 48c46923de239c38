// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel formats the manager can route to a backend.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Decoded picture layout.
///
/// Software formats are copied plane by plane into backend images;
/// hardware formats carry an opaque surface handle that the backend imports
/// directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderFormat {
    /// No format selected.
    #[default]
    None,
    /// 8-bit planar 4:2:0.
    Yuv420p,
    /// 10-bit planar 4:2:0, two bytes per sample.
    Yuv420p10,
    /// 16-bit planar 4:2:0, two bytes per sample.
    Yuv420p16,
    /// 8-bit luma plane plus interleaved chroma plane.
    Nv12,
    /// Packed 4:2:2, `U Y V Y` order.
    Uyvy422,
    /// Packed 4:2:2, `Y U Y V` order.
    Yuyv422,
    /// VDPAU surface.
    Vdpau,
    /// `CoreVideo` buffer reference.
    CvbRef,
    /// VA-API surface.
    Vaapi,
    /// Android `MediaCodec` output buffer.
    MediaCodec,
    /// Amlogic hardware decoder.
    Aml,
    /// i.MX mapped buffer.
    ImxMap,
    /// Broadcom MMAL buffer.
    Mmal,
}

impl RenderFormat {
    /// Returns `true` for formats delivered as hardware surfaces.
    #[must_use]
    pub const fn is_hardware(self) -> bool {
        matches!(
            self,
            Self::Vdpau
                | Self::CvbRef
                | Self::Vaapi
                | Self::MediaCodec
                | Self::Aml
                | Self::ImxMap
                | Self::Mmal
        )
    }

    /// Returns `true` for three-plane 4:2:0 layouts.
    #[must_use]
    pub const fn is_planar_yuv(self) -> bool {
        matches!(self, Self::Yuv420p | Self::Yuv420p10 | Self::Yuv420p16)
    }

    /// Returns `true` for single-plane packed 4:2:2 layouts.
    #[must_use]
    pub const fn is_packed_422(self) -> bool {
        matches!(self, Self::Uyvy422 | Self::Yuyv422)
    }

    /// Bytes per luma sample.
    #[must_use]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::Yuv420p10 | Self::Yuv420p16 => 2,
            _ => 1,
        }
    }

    /// Short display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Yuv420p => "YV12",
            Self::Yuv420p10 => "YV12P10",
            Self::Yuv420p16 => "YV12P16",
            Self::Nv12 => "NV12",
            Self::Uyvy422 => "UYVY",
            Self::Yuyv422 => "YUY2",
            Self::Vdpau => "VDPAU",
            Self::CvbRef => "BGRA",
            Self::Vaapi => "VAAPI",
            Self::MediaCodec => "MEDIACODEC",
            Self::Aml => "AMLCODEC",
            Self::ImxMap => "IMXMAP",
            Self::Mmal => "MMAL",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
