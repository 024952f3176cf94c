//! Statistics for the frame source and viewer sessions

use std::time::{Duration, Instant};

/// Viewer session statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Multipart parts written
    pub frames_sent: u64,
    /// Body bytes written (framing included)
    pub bytes_sent: u64,
    /// Time the session was open
    pub duration: Duration,
    /// Average bitrate (bits/sec)
    pub bitrate: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one written part
    pub fn record_frame(&mut self, bytes: usize) {
        self.frames_sent += 1;
        self.bytes_sent += bytes as u64;
    }

    /// Calculate bitrate from bytes and duration
    pub fn calculate_bitrate(&mut self) {
        let secs = self.duration.as_secs();
        if secs > 0 {
            self.bitrate = (self.bytes_sent * 8) / secs;
        }
    }
}

/// Frame source statistics
#[derive(Debug, Clone)]
pub struct SourceStats {
    /// When the source loop started
    pub started_at: Instant,
    /// Frames decoded and distributed
    pub frames_produced: u64,
    /// Frames lost to transient decode failures or empty reads
    pub transient_failures: u64,
    /// Times the asset was rewound
    pub restarts: u64,
    /// Pending frames overwritten across all devices
    pub frames_overwritten: u64,
}

impl SourceStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_produced: 0,
            transient_failures: 0,
            restarts: 0,
            frames_overwritten: 0,
        }
    }

    /// Get duration since the source started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average production rate
    pub fn calculated_framerate(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.frames_produced as f64 / secs
        } else {
            0.0
        }
    }
}

impl Default for SourceStats {
    fn default() -> Self {
        Self::new()
    }
}
