//! Single-slot latest-wins hand-off
//!
//! Each device owns one `FrameSlot`. The producer overwrites whatever is
//! pending and never waits; the single consumer takes the frame out and
//! waits when the slot is empty.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use super::frame::Frame;

#[derive(Debug, Default)]
struct SlotState {
    pending: Option<Frame>,
    closed: bool,
}

/// Depth-one overwrite cell between the frame source and one consumer
#[derive(Debug, Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
    notify: Notify,
    pushed: AtomicU64,
    discarded: AtomicU64,
}

impl FrameSlot {
    /// Create an empty, open slot
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a frame into the slot, replacing any unconsumed one
    ///
    /// Returns the displaced frame, if any. Pushing into a closed slot drops
    /// the frame and returns it.
    pub fn push(&self, frame: Frame) -> Option<Frame> {
        let displaced = {
            let mut state = self.lock();
            if state.closed {
                return Some(frame);
            }
            state.pending.replace(frame)
        };

        self.pushed.fetch_add(1, Ordering::Relaxed);
        if displaced.is_some() {
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }

        // Single consumer: a stored permit covers a push that lands between
        // the consumer's check and its wait.
        self.notify.notify_one();
        displaced
    }

    /// Take the pending frame without waiting
    pub fn try_take(&self) -> Option<Frame> {
        self.lock().pending.take()
    }

    /// Wait for the next frame
    ///
    /// Returns `None` once the slot is closed.
    pub async fn recv(&self) -> Option<Frame> {
        loop {
            {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if let Some(frame) = state.pending.take() {
                    return Some(frame);
                }
            }
            self.notify.notified().await;
        }
    }

    /// Close the slot, dropping any pending frame and waking the consumer
    pub fn close(&self) {
        {
            let mut state = self.lock();
            state.closed = true;
            state.pending = None;
        }
        self.notify.notify_one();
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Total frames pushed
    pub fn pushed(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Frames overwritten before the consumer took them
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}
