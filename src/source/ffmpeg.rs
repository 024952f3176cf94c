//! FFmpeg-backed capture for video files and camera URLs

use std::path::{Path, PathBuf};

use bytes::Bytes;
use ffmpeg_next as ffmpeg;

use super::capture::{DecodedImage, VideoCapture};
use crate::error::{Error, Result};

pub(crate) struct FfmpegCapture {
    path: PathBuf,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::context::Context,
    fps: Option<f64>,
    frame_count: Option<u64>,
    draining: bool,
}

// SAFETY: the capture exclusively owns its format, codec and scaler contexts.
// It is moved onto the frame source thread once and never shared; no
// thread-affine callbacks (custom AVIO, interrupt handlers) are registered.
unsafe impl Send for FfmpegCapture {}

impl FfmpegCapture {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let unavailable = |what: &str, e: ffmpeg::Error| {
            Error::SourceUnavailable(format!("{}: {}: {}", path.display(), what, e))
        };

        ffmpeg::init().map_err(|e| unavailable("initialize ffmpeg", e))?;
        let input = ffmpeg::format::input(&path).map_err(|e| unavailable("open input", e))?;

        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| {
                Error::SourceUnavailable(format!("{}: no video track", path.display()))
            })?;
        let stream_index = stream.index();

        let rate = stream.avg_frame_rate();
        let fps = (rate.numerator() > 0 && rate.denominator() > 0).then(|| f64::from(rate));
        let frame_count = u64::try_from(stream.frames()).ok().filter(|n| *n > 0);

        let context = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| unavailable("load decoder parameters", e))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| unavailable("open video decoder", e))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| unavailable("create scaler", e))?;

        tracing::info!(
            path = %path.display(),
            width = decoder.width(),
            height = decoder.height(),
            fps = ?fps,
            frames = ?frame_count,
            "Video source opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            stream_index,
            decoder,
            scaler,
            fps,
            frame_count,
            draining: false,
        })
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<DecodedImage> {
        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb)
            .map_err(|e| Error::TransientDecode(format!("scale frame to RGB: {}", e)))?;

        let width = rgb.width();
        let height = rgb.height();
        let row_bytes = width as usize * 3;
        let stride = rgb.stride(0);
        let data = rgb.data(0);

        let pixels = if stride == row_bytes {
            Bytes::copy_from_slice(&data[..row_bytes * height as usize])
        } else {
            let mut packed = Vec::with_capacity(row_bytes * height as usize);
            for row in 0..height as usize {
                let start = row * stride;
                let line = data.get(start..start + row_bytes).ok_or_else(|| {
                    Error::TransientDecode("decoded row out of bounds".to_string())
                })?;
                packed.extend_from_slice(line);
            }
            Bytes::from(packed)
        };

        Ok(DecodedImage {
            width,
            height,
            pixels,
        })
    }
}

impl VideoCapture for FfmpegCapture {
    fn fps(&self) -> Option<f64> {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        self.frame_count
    }

    fn read(&mut self) -> Result<Option<DecodedImage>> {
        let mut decoded = ffmpeg::frame::Video::empty();

        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded).map(Some);
            }
            if self.draining {
                return Ok(None);
            }

            match self.input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .send_packet(&packet)
                        .map_err(|e| Error::TransientDecode(format!("send packet: {}", e)))?;
                }
                None => {
                    // Flush frames buffered inside the decoder
                    let _ = self.decoder.send_eof();
                    self.draining = true;
                }
            }
        }
    }

    fn rewind(&mut self) -> Result<()> {
        self.input
            .seek(0, ..)
            .map_err(|e| Error::Decode(format!("{}: seek to start: {}", self.path.display(), e)))?;
        self.decoder.flush();
        self.draining = false;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{} (ffmpeg)", self.path.display())
    }
}
