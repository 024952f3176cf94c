//! Latest-frame cache
//!
//! Holds the most recent JPEG for the served stream. Writers replace the
//! whole `EncodedFrame` under the channel's lock; readers clone the `Bytes`
//! handle out and drop the lock before touching the network, so a slow
//! viewer never holds up a writer.

use tokio::sync::watch;

use super::frame::EncodedFrame;

/// Single-slot shared state read by every streaming session
#[derive(Debug)]
pub struct FrameCache {
    tx: watch::Sender<Option<EncodedFrame>>,
}

impl FrameCache {
    /// Create an empty cache
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Replace the current frame if `frame` is newer
    ///
    /// Returns `false` (and leaves the cache untouched) when the cache already
    /// holds a frame with an equal or higher sequence number.
    pub fn publish(&self, frame: EncodedFrame) -> bool {
        self.tx.send_if_modified(|current| match current {
            Some(existing) if existing.seq >= frame.seq => false,
            _ => {
                *current = Some(frame);
                true
            }
        })
    }

    /// Whether a frame with this sequence number would be rejected
    pub fn is_stale(&self, seq: u64) -> bool {
        self.latest_seq().is_some_and(|current| current >= seq)
    }

    /// Sequence number of the current frame
    pub fn latest_seq(&self) -> Option<u64> {
        self.tx.borrow().as_ref().map(|f| f.seq)
    }

    /// Copy out the current frame, if any has been produced
    pub fn current(&self) -> Option<EncodedFrame> {
        self.tx.borrow().clone()
    }

    /// Create a reader that waits for frames newer than the ones it served
    pub fn reader(&self) -> CacheReader {
        CacheReader {
            rx: self.tx.subscribe(),
            last_seq: None,
        }
    }

    /// Number of live readers
    pub fn reader_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FrameCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-session view of the cache
#[derive(Debug)]
pub struct CacheReader {
    rx: watch::Receiver<Option<EncodedFrame>>,
    last_seq: Option<u64>,
}

impl CacheReader {
    /// Wait for a frame newer than the last one returned
    ///
    /// Returns the current frame immediately on the first call if the cache
    /// is populated. Returns `None` if the cache is dropped.
    pub async fn next_frame(&mut self) -> Option<EncodedFrame> {
        loop {
            {
                let current = self.rx.borrow_and_update();
                if let Some(frame) = current.as_ref() {
                    if self.last_seq.map_or(true, |last| frame.seq > last) {
                        self.last_seq = Some(frame.seq);
                        return Some(frame.clone());
                    }
                }
            }

            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Sequence number of the last frame returned
    pub fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }

    /// Current frame without marking it seen
    pub fn current(&self) -> Option<EncodedFrame> {
        self.rx.borrow().clone()
    }
}
