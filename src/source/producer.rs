//! Paced frame producer
//!
//! Decodes frames at the capture's native rate and distributes each one to
//! every device slot. Runs on its own OS thread because decoding blocks.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use super::capture::VideoCapture;
use crate::error::{Error, Result};
use crate::registry::{DeviceTable, Frame};
use crate::shutdown::ShutdownSignal;
use crate::stats::SourceStats;

/// Back-off after an empty read when the source has no frame rate
const UNPACED_RETRY: Duration = Duration::from_millis(10);

/// Reads a capture and fans frames out to the device table
pub struct FrameSource {
    capture: Box<dyn VideoCapture>,
    devices: Arc<DeviceTable>,
    looping: bool,
    /// Target interval between frames; `None` when unpaced
    period: Option<Duration>,
    /// Declared asset length; `None` for live sources
    max_frames: Option<u64>,
    position: u64,
    next_seq: u64,
    at_end: bool,
    stats: SourceStats,
}

impl FrameSource {
    /// Create a producer for an opened capture
    pub fn new(capture: Box<dyn VideoCapture>, devices: Arc<DeviceTable>, looping: bool) -> Self {
        let period = capture
            .fps()
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f64(1.0 / fps));
        let max_frames = capture.frame_count().filter(|n| *n > 0);

        Self {
            capture,
            devices,
            looping,
            period,
            max_frames,
            position: 0,
            next_seq: 1,
            at_end: false,
            stats: SourceStats::new(),
        }
    }

    /// Interval between frames, if paced
    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Statistics so far
    pub fn stats(&self) -> &SourceStats {
        &self.stats
    }

    /// Run until the stop signal fires or a fatal error occurs
    pub fn run(mut self, shutdown: ShutdownSignal) -> Result<SourceStats> {
        tracing::info!(
            source = %self.capture.describe(),
            devices = self.devices.len(),
            looping = self.looping,
            period_ms = ?self.period.map(|p| p.as_secs_f64() * 1000.0),
            max_frames = ?self.max_frames,
            "Frame source started"
        );

        while !shutdown.is_triggered() {
            let started = Instant::now();
            if let Err(e) = self.step(started) {
                tracing::error!(error = %e, "Frame source failed");
                return Err(e);
            }
        }

        tracing::info!(
            frames = self.stats.frames_produced,
            restarts = self.stats.restarts,
            transient_failures = self.stats.transient_failures,
            overwritten = self.stats.frames_overwritten,
            fps = self.stats.calculated_framerate(),
            "Frame source stopped"
        );
        Ok(self.stats)
    }

    /// Produce at most one frame, then pace
    fn step(&mut self, started: Instant) -> Result<()> {
        self.restart_if_due()?;

        let image = match self.capture.read() {
            Ok(Some(image)) => image,
            Ok(None) => {
                if self.at_end {
                    tracing::debug!(position = self.position, "No frame received");
                } else {
                    tracing::warn!(position = self.position, "No frame received");
                }
                self.at_end = true;
                self.stats.transient_failures += 1;
                self.back_off();
                return Ok(());
            }
            Err(e) if e.is_transient() => {
                self.position += 1;
                self.stats.transient_failures += 1;
                tracing::warn!(position = self.position, error = %e, "Skipping undecodable frame");
                self.back_off();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let frame = Frame::rgb(
            self.next_seq,
            self.position,
            image.width,
            image.height,
            image.pixels,
        )
        .ok_or_else(|| {
            Error::Decode(format!(
                "capture returned a buffer that doesn't match {}x{} RGB",
                image.width, image.height
            ))
        })?;

        self.at_end = false;
        self.next_seq += 1;
        self.position += 1;
        self.stats.frames_produced += 1;
        self.stats.frames_overwritten += self.devices.distribute(&frame) as u64;

        if let Some(period) = self.period {
            thread::sleep(period.saturating_sub(started.elapsed()));
        }
        Ok(())
    }

    /// Rewind when the declared length is reached, or the asset ended early
    fn restart_if_due(&mut self) -> Result<()> {
        let Some(max_frames) = self.max_frames else {
            return Ok(());
        };
        if !self.looping || (self.position < max_frames && !self.at_end) {
            return Ok(());
        }

        tracing::info!(position = self.position, "Restarting video");
        self.capture.rewind()?;
        self.position = 0;
        self.at_end = false;
        self.stats.restarts += 1;
        Ok(())
    }

    fn back_off(&self) {
        thread::sleep(self.period.unwrap_or(UNPACED_RETRY));
    }

    /// Run on a dedicated thread
    ///
    /// The returned receiver resolves with the loop's outcome.
    pub fn spawn(
        self,
        shutdown: ShutdownSignal,
    ) -> std::io::Result<(thread::JoinHandle<()>, oneshot::Receiver<Result<SourceStats>>)> {
        let (tx, rx) = oneshot::channel();
        let handle = thread::Builder::new()
            .name("frame-source".into())
            .spawn(move || {
                let _ = tx.send(self.run(shutdown));
            })?;
        Ok((handle, rx))
    }
}
