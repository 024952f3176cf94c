//! Frame types routed through the device table
//!
//! Pixel and JPEG payloads are `Bytes`, so handing the same frame to several
//! devices or several viewers only bumps a reference count.

use bytes::Bytes;

/// Logical identifier of a device that receives frames (e.g. "cam0")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new device id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One decoded image from the video source
///
/// Pixels are tightly packed RGB8, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Production order, strictly increasing for the life of the source
    pub seq: u64,
    /// Zero-based position inside the asset; resets when the source loops
    pub position: u64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGB8 pixel data
    pub pixels: Bytes,
}

impl Frame {
    /// Create a frame, returning `None` if the buffer doesn't match the dimensions
    pub fn rgb(seq: u64, position: u64, width: u32, height: u32, pixels: Bytes) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(3)?;
        if pixels.len() != expected || expected == 0 {
            return None;
        }
        Some(Self {
            seq,
            position,
            width,
            height,
            pixels,
        })
    }
}

/// JPEG-compressed frame, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Sequence number of the frame this was encoded from
    pub seq: u64,
    /// Complete JPEG byte sequence
    pub jpeg: Bytes,
}

impl EncodedFrame {
    pub fn new(seq: u64, jpeg: Bytes) -> Self {
        Self { seq, jpeg }
    }

    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_dimension_check() {
        let pixels = Bytes::from(vec![0u8; 2 * 2 * 3]);
        assert!(Frame::rgb(1, 0, 2, 2, pixels.clone()).is_some());
        assert!(Frame::rgb(1, 0, 3, 2, pixels).is_none());
        assert!(Frame::rgb(1, 0, 0, 0, Bytes::new()).is_none());
    }

    #[test]
    fn test_device_id_display() {
        let id = DeviceId::from("cam0");
        assert_eq!(id.to_string(), "cam0");
        assert_eq!(id.as_str(), "cam0");
    }
}
