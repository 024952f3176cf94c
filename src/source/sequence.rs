//! Image-sequence source
//!
//! Plays a directory of still images (JPEG or PNG) as a video, in file-name
//! order. Images carry no frame rate, so it comes from the configuration.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::capture::{CaptureOptions, DecodedImage, VideoCapture};
use crate::error::{Error, Result};

const DEFAULT_SEQUENCE_FPS: f64 = 10.0;
const EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Directory of numbered stills
pub struct ImageSequence {
    dir: PathBuf,
    files: Vec<PathBuf>,
    fps: f64,
    index: usize,
}

impl ImageSequence {
    /// List and sort the images in `dir`
    pub fn open(dir: &Path, options: &CaptureOptions) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            Error::SourceUnavailable(format!("cannot list {}: {}", dir.display(), e))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Error::SourceUnavailable(format!(
                "{} contains no images",
                dir.display()
            )));
        }

        let fps = options
            .source_fps
            .filter(|fps| fps.is_finite() && *fps >= 0.0)
            .unwrap_or(DEFAULT_SEQUENCE_FPS);

        tracing::debug!(
            dir = %dir.display(),
            images = files.len(),
            fps = fps,
            "Image sequence opened"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            fps,
            index: 0,
        })
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

impl VideoCapture for ImageSequence {
    fn fps(&self) -> Option<f64> {
        (self.fps > 0.0).then_some(self.fps)
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.files.len() as u64)
    }

    fn read(&mut self) -> Result<Option<DecodedImage>> {
        let Some(path) = self.files.get(self.index) else {
            return Ok(None);
        };
        self.index += 1;

        let image = image::open(path)
            .map_err(|e| Error::TransientDecode(format!("{}: {}", path.display(), e)))?
            .to_rgb8();

        let (width, height) = image.dimensions();
        Ok(Some(DecodedImage {
            width,
            height,
            pixels: Bytes::from(image.into_raw()),
        }))
    }

    fn rewind(&mut self) -> Result<()> {
        self.index = 0;
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "{} ({} images @ {} fps)",
            self.dir.display(),
            self.files.len(),
            self.fps
        )
    }
}
