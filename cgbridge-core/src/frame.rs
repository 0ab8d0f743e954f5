//! Decoded video frame types.
//!
//! A [`VideoFrame`] is what the media subsystem hands to the bridge after
//! decoding. The bridge never looks at pixels itself; it only stores the
//! latest frame and passes it to the image encoder on demand.

// ── PixelFormat ──────────────────────────────────────────────────

/// Pixel layout of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 3 bytes per pixel: Red, Green, Blue.
    Rgb8,
    /// 4 bytes per pixel: Red, Green, Blue, Alpha.
    Rgba8,
    /// 4 bytes per pixel: Blue, Green, Red, Alpha.
    Bgra8,
}

impl PixelFormat {
    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Rgb8 => 3,
        }
    }
}

// ── ImageFormat ──────────────────────────────────────────────────

/// Still-image container produced by an [`ImageEncoder`](crate::collab::ImageEncoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    #[default]
    Jpeg,
}

impl ImageFormat {
    /// HTTP content type for this format.
    pub const fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

// ── VideoFrame ───────────────────────────────────────────────────

/// A decoded video frame.
///
/// The `data` buffer holds `height` rows of `stride` bytes each.
/// `stride` may be larger than `width * bytes_per_pixel` when the
/// decoder pads rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Row pitch in **bytes**.
    pub stride: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Pixel data, `stride * height` bytes.
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Build a tightly packed frame (`stride == width * bpp`).
    pub fn packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width * format.bytes_per_pixel() as u32,
            format,
            data,
        }
    }

    /// Total byte size the bitmap should occupy.
    pub fn byte_len(&self) -> usize {
        self.stride as usize * self.height as usize
    }

    /// Whether `data` is large enough for the declared geometry.
    pub fn is_well_formed(&self) -> bool {
        let min_stride = self.width as usize * self.format.bytes_per_pixel();
        self.stride as usize >= min_stride && self.data.len() >= self.byte_len()
    }

    /// The visible pixel bytes of row `y`, without padding.
    ///
    /// Returns `None` if the row is out of bounds.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.stride as usize;
        let end = start + self.width as usize * self.format.bytes_per_pixel();
        self.data.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_frame_geometry() {
        let frame = VideoFrame::packed(4, 2, PixelFormat::Rgb8, vec![0; 24]);
        assert_eq!(frame.stride, 12);
        assert_eq!(frame.byte_len(), 24);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn row_skips_padding() {
        let mut data = vec![0u8; 2 * 16];
        data[16..24].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let frame = VideoFrame {
            width: 2,
            height: 2,
            stride: 16,
            format: PixelFormat::Bgra8,
            data,
        };
        assert_eq!(frame.row(1), Some(&[1, 2, 3, 4, 5, 6, 7, 8][..]));
        assert_eq!(frame.row(2), None);
    }

    #[test]
    fn short_buffer_is_malformed() {
        let frame = VideoFrame::packed(10, 10, PixelFormat::Rgba8, vec![0; 10]);
        assert!(!frame.is_well_formed());
    }
}
