//! # Video Frame Module
//!
//! The frame model the texture cache consumes: pixel formats, a stable
//! buffer identity token, and read-only access to plane memory.
//!
//! ## Plain English
//!
//! A decoded video frame is just some bytes in memory, arranged in one
//! of a few standard layouts (planes). To put it on screen without
//! copying it, the GPU needs three things: how big it is, how the
//! bytes are laid out, and where they live. This module describes all
//! three, plus one extra: a token that says WHICH buffer this is, so
//! the cache can recognize a buffer it has already mapped.

mod software;

pub use software::SoftwareFrame;

use crate::error::FrameError;

// ============================================
// PIXEL FORMATS
// ============================================

/// Pixel layouts the fast path understands.
///
/// These are the formats the direct-texture extension accepts: a few
/// packed single-plane layouts plus the planar 4:2:0 families decoders
/// actually emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 32-bit RGBX, one packed plane.
    Rgb32,
    /// 32-bit BGRX, one packed plane.
    Bgr32,
    /// 16-bit 5-6-5 RGB, one packed plane.
    Rgb565,
    /// Packed 4:2:2 YUV, Y0 U Y1 V ordering.
    Yuyv,
    /// Packed 4:2:2 YUV, U Y0 V Y1 ordering.
    Uyvy,
    /// Planar 4:2:0, three planes ordered Y, U, V.
    Yuv420p,
    /// Planar 4:2:0, three planes ordered Y, V, U.
    Yv12,
    /// Semi-planar 4:2:0, full-height Y plane plus interleaved UV.
    Nv12,
    /// Semi-planar 4:2:0, full-height Y plane plus interleaved VU.
    Nv21,
}

impl PixelFormat {
    /// Number of separately-strided planes in this layout.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Rgb32 | Self::Bgr32 | Self::Rgb565 | Self::Yuyv | Self::Uyvy => 1,
            Self::Nv12 | Self::Nv21 => 2,
            Self::Yuv420p | Self::Yv12 => 3,
        }
    }

    /// Bytes per pixel for packed formats, `None` for planar ones.
    pub fn packed_bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Rgb32 | Self::Bgr32 => Some(4),
            Self::Rgb565 | Self::Yuyv | Self::Uyvy => Some(2),
            _ => None,
        }
    }

    /// True for the 4:2:0 families, which need even frame dimensions.
    pub fn is_subsampled(self) -> bool {
        matches!(
            self,
            Self::Yuv420p | Self::Yv12 | Self::Nv12 | Self::Nv21
        )
    }

    /// Number of rows to transfer for `plane` when copying a frame of
    /// `frame_height` rows into direct-texture storage.
    ///
    /// Luma and packed planes transfer at full frame height; every
    /// 4:2:0 chroma plane (separate or interleaved) holds half as many
    /// rows, against that plane's own stride.
    pub fn plane_copy_rows(self, frame_height: u32, plane: usize) -> u32 {
        if plane > 0 && self.is_subsampled() {
            frame_height / 2
        } else {
            frame_height
        }
    }

    /// Per-plane byte counts for a tightly-strided frame of the given
    /// dimensions; unused plane slots are zero.
    ///
    /// This is also the layout direct-texture drivers allocate for
    /// their staging storage.
    pub fn plane_sizes(self, width: u32, height: u32) -> [usize; MAX_PLANES] {
        let (w, h) = (width as usize, height as usize);
        match self {
            Self::Rgb32 | Self::Bgr32 | Self::Rgb565 | Self::Yuyv | Self::Uyvy => {
                [w * self.packed_bytes_per_pixel().unwrap() * h, 0, 0]
            }
            Self::Nv12 | Self::Nv21 => [w * h, w * (h / 2), 0],
            Self::Yuv420p | Self::Yv12 => [w * h, (w / 2) * (h / 2), (w / 2) * (h / 2)],
        }
    }

    /// The GL format token the direct-texture extension expects.
    pub fn gl_format(self) -> u32 {
        match self {
            // GL_BGRA_EXT
            Self::Rgb32 => 0x80E1,
            // GL_RGBA
            Self::Bgr32 => 0x1908,
            // GL_RGB565_OES
            Self::Rgb565 => 0x8D62,
            // GL_VIV_YUY2
            Self::Yuyv => 0x8FC2,
            // GL_VIV_UYVY
            Self::Uyvy => 0x8FC3,
            // GL_VIV_I420
            Self::Yuv420p => 0x8FC7,
            // GL_VIV_YV12
            Self::Yv12 => 0x8FC0,
            // GL_VIV_NV12
            Self::Nv12 => 0x8FC1,
            // GL_VIV_NV21
            Self::Nv21 => 0x8FC4,
        }
    }
}

// ============================================
// BUFFER IDENTITY
// ============================================

/// Stable identity of a frame's backing buffer.
///
/// ## Plain English
///
/// Decoders hand out frames from a small pool of reusable buffers.
/// When the same buffer comes around again, the GPU already has it
/// mapped and only needs a cheap "the contents changed" nudge. This
/// token is how the cache recognizes "the same buffer again".
///
/// The frame source must guarantee the token is stable for the life of
/// the buffer and never reused for different memory while any frame
/// referencing it is alive. A raw memory address does NOT satisfy
/// that guarantee (freed buffers get reallocated at the same address);
/// a pool slot index or a monotonic allocation counter does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

// ============================================
// MAPPED PLANES
// ============================================

/// Upper bound on planes across all supported formats.
pub const MAX_PLANES: usize = 3;

/// One plane of a mapped frame: the bytes and the row stride.
#[derive(Clone, Copy, Debug, Default)]
pub struct Plane<'a> {
    /// The plane's bytes, `rows * stride` of them.
    pub data: &'a [u8],

    /// Bytes per row, including any padding.
    pub stride: usize,
}

/// Read-only access to a frame's plane memory.
///
/// Dropping the guard is the unmap operation. Implementations with a
/// real unmap call register it through
/// [`with_unmap`](MappedFrame::with_unmap).
pub struct MappedFrame<'a> {
    planes: [Plane<'a>; MAX_PLANES],
    count: usize,
    unmap: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> MappedFrame<'a> {
    /// Wraps up to [`MAX_PLANES`] planes.
    pub fn new(planes: &[Plane<'a>]) -> Self {
        assert!(planes.len() <= MAX_PLANES, "too many planes");
        let mut stored = [Plane::default(); MAX_PLANES];
        stored[..planes.len()].copy_from_slice(planes);
        Self {
            planes: stored,
            count: planes.len(),
            unmap: None,
        }
    }

    /// Like [`new`](MappedFrame::new), with a hook to run when the
    /// mapping is released.
    pub fn with_unmap(planes: &[Plane<'a>], unmap: impl FnOnce() + 'a) -> Self {
        let mut mapped = Self::new(planes);
        mapped.unmap = Some(Box::new(unmap));
        mapped
    }

    /// Number of mapped planes.
    pub fn plane_count(&self) -> usize {
        self.count
    }

    /// Returns plane `index`.
    ///
    /// Panics if `index` is out of range.
    pub fn plane(&self, index: usize) -> Plane<'a> {
        assert!(index < self.count, "plane {} out of range", index);
        self.planes[index]
    }

    /// Iterates over the mapped planes in layout order.
    pub fn planes(&self) -> impl Iterator<Item = Plane<'a>> + '_ {
        self.planes[..self.count].iter().copied()
    }
}

impl Drop for MappedFrame<'_> {
    fn drop(&mut self) {
        if let Some(unmap) = self.unmap.take() {
            unmap();
        }
    }
}

// ============================================
// VIDEO FRAME TRAIT
// ============================================

/// A decoded video frame as the texture cache sees it.
///
/// The cache never inspects pixel values; it needs geometry, identity,
/// and plane access. Frame sources (decoder wrappers, capture
/// pipelines, test fixtures) implement this.
pub trait VideoFrame {
    /// Frame width in pixels.
    fn width(&self) -> u32;

    /// Frame height in pixels.
    fn height(&self) -> u32;

    /// The pixel layout of the plane memory.
    fn pixel_format(&self) -> PixelFormat;

    /// Stable identity of the backing buffer. See [`BufferId`].
    fn buffer_id(&self) -> BufferId;

    /// Grants read-only access to the plane memory.
    ///
    /// A frame may legitimately refuse (the buffer is gone, or the
    /// platform denies CPU access); the caller skips that frame.
    fn map(&self) -> std::result::Result<MappedFrame<'_>, FrameError>;
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_counts() {
        assert_eq!(PixelFormat::Rgb32.plane_count(), 1);
        assert_eq!(PixelFormat::Yuyv.plane_count(), 1);
        assert_eq!(PixelFormat::Nv12.plane_count(), 2);
        assert_eq!(PixelFormat::Yuv420p.plane_count(), 3);
        assert_eq!(PixelFormat::Yv12.plane_count(), 3);
    }

    #[test]
    fn test_copy_rows_per_plane() {
        // Luma always transfers at full height.
        assert_eq!(PixelFormat::Yuv420p.plane_copy_rows(480, 0), 480);
        assert_eq!(PixelFormat::Nv12.plane_copy_rows(480, 0), 480);
        assert_eq!(PixelFormat::Rgb32.plane_copy_rows(480, 0), 480);

        // 4:2:0 chroma planes hold half the rows.
        assert_eq!(PixelFormat::Yuv420p.plane_copy_rows(480, 1), 240);
        assert_eq!(PixelFormat::Yv12.plane_copy_rows(480, 2), 240);
        assert_eq!(PixelFormat::Nv12.plane_copy_rows(480, 1), 240);
        assert_eq!(PixelFormat::Nv21.plane_copy_rows(480, 1), 240);
    }

    #[test]
    fn test_plane_sizes() {
        assert_eq!(PixelFormat::Rgb32.plane_sizes(8, 4), [128, 0, 0]);
        assert_eq!(PixelFormat::Nv12.plane_sizes(8, 4), [32, 16, 0]);
        assert_eq!(PixelFormat::Yuv420p.plane_sizes(8, 4), [32, 8, 8]);
    }

    #[test]
    fn test_mapped_frame_unmap_hook_runs_on_drop() {
        use std::cell::Cell;

        let unmapped = Cell::new(false);
        let bytes = [0u8; 16];
        {
            let plane = Plane {
                data: &bytes,
                stride: 4,
            };
            let _mapped = MappedFrame::with_unmap(&[plane], || unmapped.set(true));
            assert!(!unmapped.get());
        }
        assert!(unmapped.get());
    }

    #[test]
    fn test_mapped_frame_plane_access() {
        let y = [1u8; 8];
        let uv = [2u8; 4];
        let mapped = MappedFrame::new(&[
            Plane {
                data: &y,
                stride: 4,
            },
            Plane {
                data: &uv,
                stride: 4,
            },
        ]);

        assert_eq!(mapped.plane_count(), 2);
        assert_eq!(mapped.plane(0).data.len(), 8);
        assert_eq!(mapped.plane(1).data[0], 2);
        assert_eq!(mapped.planes().count(), 2);
    }
}
