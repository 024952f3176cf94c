//! Frame source
//!
//! This module provides:
//! - Capture backends (synthetic pattern, image sequence, FFmpeg)
//! - The paced producer that fans frames out to every device
//!
//! Decoding happens on a dedicated thread; the producer never waits on a
//! consumer because device slots overwrite instead of queueing.

pub mod capture;
#[cfg(feature = "ffmpeg")]
mod ffmpeg;
pub mod producer;
pub mod sequence;
pub mod synthetic;

pub use capture::{expand_home, open_capture, CaptureOptions, DecodedImage, VideoCapture};
pub use producer::FrameSource;
pub use sequence::ImageSequence;
pub use synthetic::SyntheticCapture;
