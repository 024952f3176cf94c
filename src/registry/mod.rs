//! Device fan-out table and latest-frame cache
//!
//! # Architecture
//!
//! ```text
//!   [FrameSource thread]
//!          │ distribute()
//!          ▼
//!   DeviceTable { cam0: FrameSlot, cam1: FrameSlot, ... }
//!          │ recv()            (one writer task per device)
//!          ▼
//!   JPEG encode ──► FrameCache (watch, newest seq wins)
//!                        │ next_frame()
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!     [Session]      [Session]     [Session] ──► TCP
//! ```
//!
//! Slots are depth one: the producer overwrites a pending frame instead of
//! queueing it, so memory stays bounded and consumers are at most one frame
//! behind. The cache is shared by every viewer; only the `Bytes` handle is
//! cloned under its lock.

pub mod cache;
pub mod error;
pub mod frame;
pub mod slot;
pub mod store;

pub use cache::{CacheReader, FrameCache};
pub use error::RegistryError;
pub use frame::{DeviceId, EncodedFrame, Frame};
pub use slot::FrameSlot;
pub use store::{DeviceStats, DeviceTable};
