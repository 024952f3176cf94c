//! Media encoding
//!
//! This module provides:
//! - JPEG encoding of decoded RGB frames
//! - MJPEG multipart part framing

pub mod jpeg;
pub mod mjpeg;

pub use jpeg::{JpegEncoder, DEFAULT_JPEG_QUALITY};
pub use mjpeg::{build_part, BOUNDARY, CONTENT_TYPE};
