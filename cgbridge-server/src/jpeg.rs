//! JPEG snapshot encoder backed by the `image` crate.

use image::ColorType;
use image::codecs::jpeg::JpegEncoder;

use cgbridge_core::{BridgeError, ImageEncoder, ImageFormat, PixelFormat, VideoFrame};

pub struct JpegImages {
    quality: u8,
}

impl JpegImages {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

/// Repack any supported layout into tight RGB rows, dropping row padding
/// and alpha.
fn to_rgb(frame: &VideoFrame) -> Result<Vec<u8>, BridgeError> {
    if !frame.is_well_formed() {
        return Err(BridgeError::Encode(format!(
            "frame buffer too small for {}x{} {:?}",
            frame.width, frame.height, frame.format
        )));
    }
    let mut rgb = Vec::with_capacity(frame.width as usize * frame.height as usize * 3);
    for y in 0..frame.height {
        let row = frame
            .row(y)
            .ok_or_else(|| BridgeError::Encode(format!("missing row {y}")))?;
        match frame.format {
            PixelFormat::Rgb8 => rgb.extend_from_slice(row),
            PixelFormat::Rgba8 => {
                for px in row.chunks_exact(4) {
                    rgb.extend_from_slice(&px[..3]);
                }
            }
            PixelFormat::Bgra8 => {
                for px in row.chunks_exact(4) {
                    rgb.extend_from_slice(&[px[2], px[1], px[0]]);
                }
            }
        }
    }
    Ok(rgb)
}

impl ImageEncoder for JpegImages {
    fn encode(&self, frame: &VideoFrame, format: ImageFormat) -> Result<Vec<u8>, BridgeError> {
        match format {
            ImageFormat::Jpeg => {
                let rgb = to_rgb(frame)?;
                let mut out = Vec::new();
                JpegEncoder::new_with_quality(&mut out, self.quality)
                    .encode(&rgb, frame.width, frame.height, ColorType::Rgb8)
                    .map_err(|e| BridgeError::Encode(e.to_string()))?;
                Ok(out)
            }
        }
    }
}
