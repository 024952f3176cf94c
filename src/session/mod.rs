//! Viewer sessions

pub mod stream;

pub use stream::{SessionEnd, StreamSession};
