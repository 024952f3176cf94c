//! MJPEG multipart framing
//!
//! Each part is `--frame`, one `Content-Type` header, a blank line, the raw
//! JPEG and a trailing CRLF. Browsers replace the displayed image with every
//! part they receive.

use bytes::{BufMut, Bytes, BytesMut};

/// Multipart boundary token
pub const BOUNDARY: &str = "frame";

/// Response content type for the stream
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const PART_HEADER: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";

/// Build one multipart part around a JPEG payload
pub fn build_part(jpeg: &[u8], buf: &mut BytesMut) -> Bytes {
    buf.clear();
    buf.reserve(PART_HEADER.len() + jpeg.len() + 2);
    buf.put_slice(PART_HEADER);
    buf.put_slice(jpeg);
    buf.put_slice(b"\r\n");
    buf.split().freeze()
}
