//! # Software Frame
//!
//! A heap-backed [`VideoFrame`] implementation for tests, demos, and
//! software decode pipelines.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::FrameError;

use super::{BufferId, MappedFrame, PixelFormat, Plane, VideoFrame, MAX_PLANES};

// ============================================
// SOFTWARE FRAME
// ============================================

/// A frame that owns its plane memory on the heap.
///
/// ## Plain English
///
/// Real frames come out of decoders and capture pipelines with their
/// bytes in exotic places. This one just keeps them in ordinary
/// vectors, laid out tightly (stride = row width, no padding). That
/// makes it the stand-in of choice anywhere a real pipeline isn't
/// available: unit tests, the demo binary, and pure-software decode
/// paths.
pub struct SoftwareFrame {
    id: BufferId,
    width: u32,
    height: u32,
    format: PixelFormat,
    planes: Vec<Vec<u8>>,
    strides: Vec<usize>,

    /// When set, `map()` refuses, for exercising the skip path.
    deny_mapping: AtomicBool,
}

impl SoftwareFrame {
    /// Allocates a zero-filled frame with tight strides.
    ///
    /// ## Parameters
    /// - `id`: stable buffer identity (the caller's pool is in charge
    ///   of keeping this honest)
    /// - `width`, `height`: frame dimensions in pixels
    /// - `format`: the plane layout to allocate
    ///
    /// Fails if a 4:2:0 format is asked for odd dimensions.
    pub fn new(
        id: BufferId,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, FrameError> {
        if format.is_subsampled() && (width % 2 != 0 || height % 2 != 0) {
            return Err(FrameError::InvalidDimensions {
                width,
                height,
                format,
            });
        }

        let (w, h) = (width as usize, height as usize);
        let (planes, strides): (Vec<Vec<u8>>, Vec<usize>) = match format {
            // One packed plane.
            PixelFormat::Rgb32
            | PixelFormat::Bgr32
            | PixelFormat::Rgb565
            | PixelFormat::Yuyv
            | PixelFormat::Uyvy => {
                let stride = w * format.packed_bytes_per_pixel().unwrap();
                (vec![vec![0u8; stride * h]], vec![stride])
            }
            // Full-height luma plus half-height interleaved chroma.
            PixelFormat::Nv12 | PixelFormat::Nv21 => (
                vec![vec![0u8; w * h], vec![0u8; w * h / 2]],
                vec![w, w],
            ),
            // Three planes; chroma at quarter size with half stride.
            PixelFormat::Yuv420p | PixelFormat::Yv12 => (
                vec![
                    vec![0u8; w * h],
                    vec![0u8; (w / 2) * (h / 2)],
                    vec![0u8; (w / 2) * (h / 2)],
                ],
                vec![w, w / 2, w / 2],
            ),
        };

        Ok(Self {
            id,
            width,
            height,
            format,
            planes,
            strides,
            deny_mapping: AtomicBool::new(false),
        })
    }

    /// Mutable access to plane `index`, for filling in pixel data.
    pub fn plane_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.planes[index]
    }

    /// Fills every plane with `value`. Handy for making frames
    /// distinguishable in tests.
    pub fn fill(&mut self, value: u8) {
        for plane in &mut self.planes {
            plane.fill(value);
        }
    }

    /// Makes subsequent `map()` calls fail, simulating a frame whose
    /// memory has become inaccessible.
    pub fn deny_mapping(&self, deny: bool) {
        self.deny_mapping.store(deny, Ordering::Relaxed);
    }
}

impl VideoFrame for SoftwareFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn buffer_id(&self) -> BufferId {
        self.id
    }

    fn map(&self) -> Result<MappedFrame<'_>, FrameError> {
        if self.deny_mapping.load(Ordering::Relaxed) {
            return Err(FrameError::MapFailed);
        }

        let mut planes = [Plane::default(); MAX_PLANES];
        for (i, (data, &stride)) in self.planes.iter().zip(&self.strides).enumerate() {
            planes[i] = Plane {
                data: data.as_slice(),
                stride,
            };
        }
        Ok(MappedFrame::new(&planes[..self.planes.len()]))
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_layout() {
        let frame = SoftwareFrame::new(BufferId(1), 8, 4, PixelFormat::Rgb32).unwrap();
        let mapped = frame.map().unwrap();

        assert_eq!(mapped.plane_count(), 1);
        assert_eq!(mapped.plane(0).stride, 32);
        assert_eq!(mapped.plane(0).data.len(), 128);
    }

    #[test]
    fn test_yuv420p_layout() {
        let frame = SoftwareFrame::new(BufferId(2), 8, 4, PixelFormat::Yuv420p).unwrap();
        let mapped = frame.map().unwrap();

        assert_eq!(mapped.plane_count(), 3);
        assert_eq!(mapped.plane(0).data.len(), 32);
        assert_eq!(mapped.plane(1).data.len(), 8);
        assert_eq!(mapped.plane(2).stride, 4);
    }

    #[test]
    fn test_nv12_layout() {
        let frame = SoftwareFrame::new(BufferId(3), 8, 4, PixelFormat::Nv12).unwrap();
        let mapped = frame.map().unwrap();

        assert_eq!(mapped.plane_count(), 2);
        assert_eq!(mapped.plane(0).data.len(), 32);
        // Interleaved chroma: full stride, half height.
        assert_eq!(mapped.plane(1).data.len(), 16);
        assert_eq!(mapped.plane(1).stride, 8);
    }

    #[test]
    fn test_odd_dimensions_rejected_for_subsampled() {
        let result = SoftwareFrame::new(BufferId(4), 7, 4, PixelFormat::Nv12);
        assert!(matches!(
            result,
            Err(FrameError::InvalidDimensions { width: 7, .. })
        ));

        // Packed formats don't care.
        assert!(SoftwareFrame::new(BufferId(5), 7, 3, PixelFormat::Rgb565).is_ok());
    }

    #[test]
    fn test_deny_mapping() {
        let frame = SoftwareFrame::new(BufferId(6), 4, 4, PixelFormat::Rgb32).unwrap();
        assert!(frame.map().is_ok());

        frame.deny_mapping(true);
        assert_eq!(frame.map().err(), Some(FrameError::MapFailed));

        frame.deny_mapping(false);
        assert!(frame.map().is_ok());
    }
}
