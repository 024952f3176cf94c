//! JPEG encoding of decoded frames

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::{Error, Result};
use crate::registry::{EncodedFrame, Frame};

/// Quality used when the configuration doesn't set one
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Encodes RGB8 frames to baseline JPEG at a fixed quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// Create an encoder; quality is clamped to 1..=100
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode one frame
    pub fn encode(&self, frame: &Frame) -> Result<EncodedFrame> {
        let expected = frame.width as usize * frame.height as usize * 3;
        if frame.pixels.len() != expected {
            return Err(Error::Encode(format!(
                "frame {} has {} bytes, expected {} for {}x{}",
                frame.seq,
                frame.pixels.len(),
                expected,
                frame.width,
                frame.height
            )));
        }

        // Rough pre-size: JPEG at high quality is well under a tenth of RGB
        let mut buffer = Vec::with_capacity(expected / 8);
        ImageJpegEncoder::new_with_quality(&mut buffer, self.quality)
            .write_image(
                &frame.pixels,
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| Error::Encode(e.to_string()))?;

        Ok(EncodedFrame::new(frame.seq, Bytes::from(buffer)))
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}
