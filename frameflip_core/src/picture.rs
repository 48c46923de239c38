// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decoded pictures and backend image storage.
//!
//! A [`VideoPicture`] borrows the decoder's planes for the duration of an
//! [`add_picture`](crate::manager::RenderManager::add_picture) call. Copy
//! formats are transferred row by row into the slot's [`Image`]; hardware
//! formats hand the backend an opaque [`HwHandle`] instead.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use crate::error::PictureError;
use crate::format::RenderFormat;
use crate::time::{MediaTime, NOPTS};

/// Opaque hardware surface or decoder context.
pub type HwHandle = Arc<dyn Any + Send + Sync>;

/// One decoded picture.
#[derive(Clone)]
pub struct VideoPicture<'a> {
    /// Pixel layout.
    pub format: RenderFormat,
    /// Coded width in pixels.
    pub width: u32,
    /// Coded height in pixels.
    pub height: u32,
    /// Presentation timestamp.
    pub pts: MediaTime,
    /// Plane data; unused planes are empty.
    pub planes: [&'a [u8]; 3],
    /// Bytes per row of each plane.
    pub strides: [usize; 3],
    /// Hardware surface, for hardware formats.
    pub hw: Option<HwHandle>,
}

impl fmt::Debug for VideoPicture<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoPicture")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pts", &self.pts)
            .field("strides", &self.strides)
            .field("hw", &self.hw.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> VideoPicture<'a> {
    /// A software picture with explicit planes and strides.
    #[must_use]
    pub fn new(
        format: RenderFormat,
        width: u32,
        height: u32,
        planes: [&'a [u8]; 3],
        strides: [usize; 3],
    ) -> Self {
        Self {
            format,
            width,
            height,
            pts: NOPTS,
            planes,
            strides,
            hw: None,
        }
    }

    /// A hardware picture that only carries a surface handle.
    #[must_use]
    pub fn hardware(format: RenderFormat, width: u32, height: u32, handle: HwHandle) -> Self {
        Self {
            format,
            width,
            height,
            pts: NOPTS,
            planes: [&[]; 3],
            strides: [0; 3],
            hw: Some(handle),
        }
    }

    /// Sets the presentation timestamp.
    #[must_use]
    pub fn with_pts(mut self, pts: MediaTime) -> Self {
        self.pts = pts;
        self
    }
}

/// Row size in bytes and row count of each plane of `format`.
#[must_use]
pub fn plane_geometry(format: RenderFormat, width: u32, height: u32) -> [(usize, usize); 3] {
    let w = width as usize;
    let h = height as usize;
    let half_w = w.div_ceil(2);
    let half_h = h.div_ceil(2);
    if format.is_planar_yuv() {
        let bps = format.bytes_per_sample();
        [(w * bps, h), (half_w * bps, half_h), (half_w * bps, half_h)]
    } else if format == RenderFormat::Nv12 {
        [(w, h), (half_w * 2, half_h), (0, 0)]
    } else if format.is_packed_422() {
        [(half_w * 4, h), (0, 0), (0, 0)]
    } else {
        [(0, 0); 3]
    }
}

/// Backend-owned storage for one slot.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    format: RenderFormat,
    width: u32,
    height: u32,
    planes: [Vec<u8>; 3],
    strides: [usize; 3],
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("strides", &self.strides)
            .finish_non_exhaustive()
    }
}

impl Image {
    /// Allocates a zeroed image with tightly packed rows.
    #[must_use]
    pub fn new(format: RenderFormat, width: u32, height: u32) -> Self {
        let geometry = plane_geometry(format, width, height);
        let planes = geometry.map(|(row, rows)| vec![0_u8; row * rows]);
        let strides = geometry.map(|(row, _)| row);
        Self {
            format,
            width,
            height,
            planes,
            strides,
        }
    }

    /// Pixel layout.
    #[must_use]
    pub const fn format(&self) -> RenderFormat {
        self.format
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Bytes of plane `index`.
    #[must_use]
    pub fn plane(&self, index: usize) -> &[u8] {
        self.planes.get(index).map_or(&[], Vec::as_slice)
    }

    /// Row stride of plane `index`.
    #[must_use]
    pub fn stride(&self, index: usize) -> usize {
        self.strides.get(index).copied().unwrap_or(0)
    }
}

fn copy_plane(
    plane: usize,
    src: &[u8],
    src_stride: usize,
    dst: &mut [u8],
    dst_stride: usize,
    row_bytes: usize,
    rows: usize,
) -> Result<(), PictureError> {
    if rows == 0 || row_bytes == 0 {
        return Ok(());
    }
    let needed = (rows - 1) * src_stride + row_bytes;
    if src.len() < needed || src_stride < row_bytes {
        return Err(PictureError::ShortPlane {
            plane,
            len: src.len(),
            needed,
        });
    }
    for row in 0..rows {
        let from = &src[row * src_stride..row * src_stride + row_bytes];
        dst[row * dst_stride..row * dst_stride + row_bytes].copy_from_slice(from);
    }
    Ok(())
}

fn check_format(picture: &VideoPicture<'_>, image: &Image) -> Result<(), PictureError> {
    if picture.format == image.format {
        Ok(())
    } else {
        Err(PictureError::FormatMismatch {
            picture: picture.format,
            image: image.format,
        })
    }
}

fn copy_planes(
    picture: &VideoPicture<'_>,
    image: &mut Image,
    count: usize,
) -> Result<(), PictureError> {
    check_format(picture, image)?;
    let geometry = plane_geometry(image.format, image.width, image.height);
    for (plane, &(row_bytes, rows)) in geometry.iter().enumerate().take(count) {
        copy_plane(
            plane,
            picture.planes[plane],
            picture.strides[plane],
            &mut image.planes[plane],
            image.strides[plane],
            row_bytes,
            rows,
        )?;
    }
    Ok(())
}

/// Copies a three-plane 4:2:0 picture.
pub fn copy_planar(picture: &VideoPicture<'_>, image: &mut Image) -> Result<(), PictureError> {
    copy_planes(picture, image, 3)
}

/// Copies a luma plane plus interleaved chroma plane.
pub fn copy_nv12(picture: &VideoPicture<'_>, image: &mut Image) -> Result<(), PictureError> {
    copy_planes(picture, image, 2)
}

/// Copies a single packed 4:2:2 plane.
pub fn copy_yuv422_packed(
    picture: &VideoPicture<'_>,
    image: &mut Image,
) -> Result<(), PictureError> {
    copy_planes(picture, image, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_dimensions_round_chroma_up() {
        let geometry = plane_geometry(RenderFormat::Yuv420p, 5, 3);
        assert_eq!(geometry, [(5, 3), (3, 2), (3, 2)]);
        let geometry = plane_geometry(RenderFormat::Yuyv422, 5, 3);
        assert_eq!(geometry[0], (12, 3), "packed rows cover whole pixel pairs");
    }

    #[test]
    fn planar_copy_honors_source_stride() {
        // 4x2 luma with 2 bytes of row padding.
        let luma: [u8; 12] = [1, 2, 3, 4, 0, 0, 5, 6, 7, 8, 0, 0];
        let u: [u8; 2] = [9, 9];
        let v: [u8; 2] = [7, 7];
        let picture = VideoPicture::new(RenderFormat::Yuv420p, 4, 2, [&luma, &u, &v], [6, 2, 2]);
        let mut image = Image::new(RenderFormat::Yuv420p, 4, 2);
        assert_eq!(copy_planar(&picture, &mut image), Ok(()));
        assert_eq!(image.plane(0), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(image.plane(1), &[9, 9]);
        assert_eq!(image.plane(2), &[7, 7]);
    }

    #[test]
    fn short_plane_is_rejected() {
        let luma = [0_u8; 3];
        let picture = VideoPicture::new(RenderFormat::Nv12, 4, 2, [&luma, &[], &[]], [4, 4, 0]);
        let mut image = Image::new(RenderFormat::Nv12, 4, 2);
        assert_eq!(
            copy_nv12(&picture, &mut image),
            Err(PictureError::ShortPlane {
                plane: 0,
                len: 3,
                needed: 8
            })
        );
    }

    #[test]
    fn mismatched_format_is_rejected() {
        let picture = VideoPicture::new(RenderFormat::Nv12, 2, 2, [&[]; 3], [0; 3]);
        let mut image = Image::new(RenderFormat::Yuv420p, 2, 2);
        assert!(
            matches!(
                copy_planar(&picture, &mut image),
                Err(PictureError::FormatMismatch { .. })
            ),
            "NV12 picture cannot fill a planar image"
        );
    }

    #[test]
    fn packed_copy_moves_single_plane() {
        let data = [10_u8, 20, 30, 40, 50, 60, 70, 80];
        let picture =
            VideoPicture::new(RenderFormat::Uyvy422, 2, 2, [&data, &[], &[]], [4, 0, 0]);
        let mut image = Image::new(RenderFormat::Uyvy422, 2, 2);
        assert_eq!(copy_yuv422_packed(&picture, &mut image), Ok(()));
        assert_eq!(image.plane(0), &data);
    }
}
