//! Capture backends
//!
//! A `VideoCapture` decodes frames one at a time from a file, directory or
//! device. `open_capture` picks the backend from the source path:
//! - `stub://name?frames=N&fps=F&width=W&height=H` - synthetic test pattern
//! - a directory - image sequence, files sorted by name
//! - anything else - FFmpeg (feature: ffmpeg)

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{Error, Result};

#[cfg(feature = "ffmpeg")]
use super::ffmpeg::FfmpegCapture;
use super::sequence::ImageSequence;
use super::synthetic::SyntheticCapture;

/// A decoded RGB8 image, not yet stamped with a sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

/// Frame-at-a-time video decoder
pub trait VideoCapture: Send {
    /// Declared frame rate, if the source has one
    fn fps(&self) -> Option<f64>;

    /// Declared number of frames; `None` for live sources
    fn frame_count(&self) -> Option<u64>;

    /// Decode the next frame
    ///
    /// `Ok(None)` means no frame is ready (or the end of the asset was
    /// reached). `Error::TransientDecode` means one frame was lost and the
    /// next call may succeed. Any other error is fatal.
    fn read(&mut self) -> Result<Option<DecodedImage>>;

    /// Seek back to the first frame
    fn rewind(&mut self) -> Result<()>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Options that apply to backends without a declared frame rate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureOptions {
    /// Frame rate for image sequences
    pub source_fps: Option<f64>,
}

/// Open the capture backend for `path`
///
/// Fails with `Error::SourceUnavailable` when the asset is missing or cannot
/// be opened.
pub fn open_capture(path: &str, options: &CaptureOptions) -> Result<Box<dyn VideoCapture>> {
    if let Some(pattern) = path.strip_prefix("stub://") {
        return Ok(Box::new(SyntheticCapture::parse(pattern)?));
    }

    let resolved = expand_home(path);
    if resolved.is_dir() {
        return Ok(Box::new(ImageSequence::open(&resolved, options)?));
    }

    if !path.contains("://") && !resolved.exists() {
        tracing::error!(path = %resolved.display(), "Video source does not exist");
        return Err(Error::SourceUnavailable(format!(
            "{} does not exist",
            resolved.display()
        )));
    }

    open_ffmpeg(&resolved)
}

#[cfg(feature = "ffmpeg")]
fn open_ffmpeg(path: &Path) -> Result<Box<dyn VideoCapture>> {
    Ok(Box::new(FfmpegCapture::open(path)?))
}

#[cfg(not(feature = "ffmpeg"))]
fn open_ffmpeg(path: &Path) -> Result<Box<dyn VideoCapture>> {
    Err(Error::SourceUnavailable(format!(
        "{}: video decoding requires the ffmpeg feature",
        path.display()
    )))
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    let home = std::env::var_os("HOME");
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            let mut expanded = PathBuf::from(home);
            let rest = rest.trim_start_matches('/');
            if !rest.is_empty() {
                expanded.push(rest);
            }
            expanded
        }
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_stub() {
        let capture = open_capture("stub://test?frames=3&fps=10", &CaptureOptions::default())
            .unwrap();
        assert_eq!(capture.frame_count(), Some(3));
        assert_eq!(capture.fps(), Some(10.0));
    }

    #[test]
    fn test_open_missing_file() {
        let result = open_capture(
            "/nonexistent/liveview/video.mp4",
            &CaptureOptions::default(),
        );
        assert!(matches!(result, Err(Error::SourceUnavailable(_))));
    }

    #[test]
    fn test_open_directory() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::from_pixel(4, 4, image::Rgb([9, 9, 9]))
            .save(dir.path().join("0001.png"))
            .unwrap();

        let capture = open_capture(
            dir.path().to_str().unwrap(),
            &CaptureOptions {
                source_fps: Some(5.0),
            },
        )
        .unwrap();
        assert_eq!(capture.frame_count(), Some(1));
        assert_eq!(capture.fps(), Some(5.0));
    }

    #[test]
    fn test_expand_home() {
        let Some(home) = std::env::var_os("HOME") else {
            return;
        };
        let home = PathBuf::from(home);

        assert_eq!(expand_home("~"), home);
        assert_eq!(expand_home("~/videos/a.mp4"), home.join("videos/a.mp4"));
        assert_eq!(expand_home("/tmp/a.mp4"), PathBuf::from("/tmp/a.mp4"));
        assert_eq!(expand_home("~other/a.mp4"), PathBuf::from("~other/a.mp4"));
    }
}
