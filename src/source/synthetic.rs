//! Synthetic test-pattern source (`stub://`)
//!
//! Every position always renders the same image, so looping output is
//! bit-identical from one pass to the next.

use bytes::Bytes;

use super::capture::{DecodedImage, VideoCapture};
use crate::error::{Error, Result};

const DEFAULT_FRAMES: u64 = 30;
const DEFAULT_FPS: f64 = 10.0;
const DEFAULT_WIDTH: u32 = 320;
const DEFAULT_HEIGHT: u32 = 240;

/// Deterministic gradient frames, one tint per position
#[derive(Debug, Clone)]
pub struct SyntheticCapture {
    name: String,
    /// 0 = endless live source
    frames: u64,
    /// 0 = unpaced
    fps: f64,
    width: u32,
    height: u32,
    position: u64,
}

impl SyntheticCapture {
    /// Build from the part of the path after `stub://`
    pub fn parse(pattern: &str) -> Result<Self> {
        let (name, query) = pattern.split_once('?').unwrap_or((pattern, ""));
        let mut capture = Self {
            name: name.to_string(),
            frames: DEFAULT_FRAMES,
            fps: DEFAULT_FPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            position: 0,
        };

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let invalid = || {
                Error::SourceUnavailable(format!("stub://{}: invalid {}={}", name, key, value))
            };
            match key {
                "frames" => capture.frames = value.parse().map_err(|_| invalid())?,
                "fps" => {
                    capture.fps = value.parse().map_err(|_| invalid())?;
                    if !capture.fps.is_finite() || capture.fps < 0.0 {
                        return Err(invalid());
                    }
                }
                "width" => capture.width = value.parse().map_err(|_| invalid())?,
                "height" => capture.height = value.parse().map_err(|_| invalid())?,
                _ => {
                    return Err(Error::SourceUnavailable(format!(
                        "stub://{}: unknown option '{}'",
                        name, key
                    )))
                }
            }
        }

        if capture.width == 0 || capture.height == 0 {
            return Err(Error::SourceUnavailable(format!(
                "stub://{}: frame size must be non-zero",
                name
            )));
        }

        Ok(capture)
    }

    /// Render the image for a position
    pub fn render(&self, position: u64) -> DecodedImage {
        let (w, h) = (self.width as usize, self.height as usize);
        let (x_span, y_span) = ((w - 1).max(1), (h - 1).max(1));
        let tint = (position.wrapping_mul(73) % 256) as u8;
        let mut pixels = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                pixels.push((x * 255 / x_span) as u8);
                pixels.push((y * 255 / y_span) as u8);
                pixels.push(tint);
            }
        }

        DecodedImage {
            width: self.width,
            height: self.height,
            pixels: Bytes::from(pixels),
        }
    }
}

impl VideoCapture for SyntheticCapture {
    fn fps(&self) -> Option<f64> {
        (self.fps > 0.0).then_some(self.fps)
    }

    fn frame_count(&self) -> Option<u64> {
        (self.frames > 0).then_some(self.frames)
    }

    fn read(&mut self) -> Result<Option<DecodedImage>> {
        if self.frames > 0 && self.position >= self.frames {
            return Ok(None);
        }
        let image = self.render(self.position);
        self.position += 1;
        Ok(Some(image))
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "stub://{} ({}x{}, {} frames @ {} fps)",
            self.name, self.width, self.height, self.frames, self.fps
        )
    }
}
