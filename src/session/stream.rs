//! Per-viewer MJPEG stream
//!
//! Each viewer gets its own `StreamSession` reading the shared cache through a
//! private `CacheReader`. The session is turned into the response body stream;
//! the HTTP layer writes each part and drops the stream once a write fails,
//! so a slow or dead viewer only stalls its own connection.
//!
//! While no new frame arrives the current one is re-sent every keepalive
//! interval. That write is what notices a viewer that left during a pause.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream};
use tokio::sync::OwnedSemaphorePermit;

use crate::error::Error;
use crate::media::build_part;
use crate::registry::{CacheReader, EncodedFrame};
use crate::shutdown::ShutdownSignal;
use crate::stats::SessionStats;

/// Why a session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server is shutting down
    Shutdown,
    /// The cache was dropped
    SourceGone,
}

/// One viewer's stream
#[derive(Debug)]
pub struct StreamSession {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    reader: CacheReader,
    keepalive: Duration,
    stats: SessionStats,
    started_at: Instant,
    buf: BytesMut,
    end: Option<SessionEnd>,
    /// Viewer slot, released when the session is dropped
    _permit: Option<OwnedSemaphorePermit>,
}

impl StreamSession {
    pub fn new(id: u64, peer_addr: SocketAddr, reader: CacheReader, keepalive: Duration) -> Self {
        Self {
            id,
            peer_addr,
            reader,
            keepalive,
            stats: SessionStats::new(),
            started_at: Instant::now(),
            buf: BytesMut::with_capacity(64 * 1024),
            end: None,
            _permit: None,
        }
    }

    /// Hold a connection-limit permit for the session's lifetime
    pub fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self._permit = Some(permit);
        self
    }

    /// Next complete multipart part
    ///
    /// Returns `None` once shutdown fires or the cache is gone; later calls
    /// keep returning `None`. Shutdown only interrupts the wait for a frame,
    /// never a part that has already been handed out.
    pub async fn next_part(&mut self, shutdown: &mut ShutdownSignal) -> Option<Bytes> {
        if self.end.is_some() {
            return None;
        }

        let waited = tokio::select! {
            biased;
            _ = shutdown.wait() => None,
            frame = self.next_or_repeat() => Some(frame),
        };
        let frame = match waited {
            Some(Some(frame)) => frame,
            Some(None) => {
                self.end = Some(SessionEnd::SourceGone);
                return None;
            }
            None => {
                self.end = Some(SessionEnd::Shutdown);
                return None;
            }
        };

        let part = build_part(&frame.jpeg, &mut self.buf);
        self.stats.record_frame(part.len());
        tracing::trace!(
            session_id = self.id,
            seq = frame.seq,
            bytes = part.len(),
            "Part sent"
        );
        Some(part)
    }

    /// Wait for a newer frame; fall back to the current one after `keepalive`
    async fn next_or_repeat(&mut self) -> Option<EncodedFrame> {
        loop {
            match tokio::time::timeout(self.keepalive, self.reader.next_frame()).await {
                Ok(frame) => return frame,
                Err(_) => {
                    if let Some(frame) = self.reader.current() {
                        return Some(frame);
                    }
                }
            }
        }
    }

    /// Response body: one item per part, ending on shutdown or source end
    pub fn into_stream(
        self,
        shutdown: ShutdownSignal,
    ) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        stream::unfold((self, shutdown), |(mut session, mut shutdown)| async move {
            let part = session.next_part(&mut shutdown).await?;
            Some((Ok(part), (session, shutdown)))
        })
    }

    /// How the session ended, if it has
    pub fn end(&self) -> Option<SessionEnd> {
        self.end
    }

    /// Statistics so far
    pub fn stats(&self) -> SessionStats {
        let mut stats = self.stats.clone();
        stats.duration = self.started_at.elapsed();
        stats.calculate_bitrate();
        stats
    }

    /// Sequence number of the last new frame sent
    pub fn last_seq(&self) -> Option<u64> {
        self.reader.last_seq()
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        let stats = self.stats();
        match self.end {
            Some(end) => tracing::info!(
                session_id = self.id,
                peer = %self.peer_addr,
                end = ?end,
                frames = stats.frames_sent,
                bytes = stats.bytes_sent,
                "Viewer stream ended"
            ),
            // Body dropped mid-stream: the connection failed or closed
            None => tracing::info!(
                session_id = self.id,
                peer = %self.peer_addr,
                frames = stats.frames_sent,
                bytes = stats.bytes_sent,
                duration_secs = stats.duration.as_secs(),
                bitrate = stats.bitrate,
                reason = %Error::ClientDisconnected { session_id: self.id },
                "Viewer left"
            ),
        }
    }
}
