//! Frame pipeline wiring
//!
//! Owns the device table and the frame cache, runs the frame source on its
//! own thread and one cache writer task per device. Each writer drains its
//! device's slot, encodes to JPEG off the async workers and publishes to the
//! shared cache; the cache keeps whichever frame is newest.

use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::LiveviewConfig;
use crate::error::{Error, Result};
use crate::media::JpegEncoder;
use crate::registry::{DeviceId, DeviceTable, FrameCache, FrameSlot};
use crate::shutdown::Shutdown;
use crate::source::{open_capture, FrameSource, VideoCapture};
use crate::stats::SourceStats;

/// Opened but not yet running pipeline
pub struct Pipeline {
    source: FrameSource,
    devices: Arc<DeviceTable>,
    cache: Arc<FrameCache>,
    encoder: JpegEncoder,
}

impl Pipeline {
    /// Open the configured source and build the device table
    ///
    /// Fails with `Error::SourceUnavailable` if the asset can't be opened.
    pub fn open(config: &LiveviewConfig) -> Result<Self> {
        let capture = open_capture(&config.source_path, &config.capture_options())?;
        Self::with_capture(
            capture,
            config.device_ids.iter().cloned(),
            config.looping,
            JpegEncoder::new(config.jpeg_quality),
        )
    }

    /// Build around an already opened capture
    pub fn with_capture<I>(
        capture: Box<dyn VideoCapture>,
        devices: I,
        looping: bool,
        encoder: JpegEncoder,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = DeviceId>,
    {
        let devices = Arc::new(DeviceTable::new(devices)?);
        let source = FrameSource::new(capture, Arc::clone(&devices), looping);

        Ok(Self {
            source,
            devices,
            cache: Arc::new(FrameCache::new()),
            encoder,
        })
    }

    /// Shared cache read by viewer sessions
    pub fn cache(&self) -> &Arc<FrameCache> {
        &self.cache
    }

    pub fn devices(&self) -> &Arc<DeviceTable> {
        &self.devices
    }

    /// Spawn the frame source thread and the cache writers
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self, shutdown: &Shutdown) -> Result<RunningPipeline> {
        let writers = self
            .devices
            .iter()
            .map(|(device, slot)| {
                tokio::spawn(cache_writer(
                    device.clone(),
                    Arc::clone(slot),
                    Arc::clone(&self.cache),
                    self.encoder,
                ))
            })
            .collect();

        let (source_thread, source_result) = self.source.spawn(shutdown.signal())?;

        tracing::info!(
            devices = self.devices.len(),
            jpeg_quality = self.encoder.quality(),
            "Pipeline started"
        );

        Ok(RunningPipeline {
            devices: self.devices,
            cache: self.cache,
            shutdown: shutdown.clone(),
            writers,
            source_thread: Some(source_thread),
            source_result: Some(source_result),
        })
    }
}

/// Handle to a running pipeline
pub struct RunningPipeline {
    devices: Arc<DeviceTable>,
    cache: Arc<FrameCache>,
    shutdown: Shutdown,
    writers: Vec<JoinHandle<()>>,
    source_thread: Option<thread::JoinHandle<()>>,
    source_result: Option<oneshot::Receiver<Result<SourceStats>>>,
}

impl RunningPipeline {
    pub fn cache(&self) -> &Arc<FrameCache> {
        &self.cache
    }

    pub fn devices(&self) -> &Arc<DeviceTable> {
        &self.devices
    }

    /// Resolve when the frame source stops on its own
    ///
    /// Never resolves a second time.
    pub async fn source_finished(&mut self) -> Result<SourceStats> {
        let Some(rx) = self.source_result.as_mut() else {
            return std::future::pending().await;
        };
        let result = rx
            .await
            .unwrap_or_else(|_| Err(Error::Decode("frame source thread panicked".into())));
        self.source_result = None;
        result
    }

    /// Stop the source and writers and wait for them
    ///
    /// Returns the source's outcome if `source_finished` hasn't consumed it.
    pub async fn stop(mut self) -> Option<Result<SourceStats>> {
        self.shutdown.trigger();
        self.devices.close_all();

        for writer in self.writers.drain(..) {
            if let Err(e) = writer.await {
                tracing::error!(error = %e, "Cache writer task failed");
            }
        }

        if let Some(handle) = self.source_thread.take() {
            let joined = tokio::task::spawn_blocking(move || handle.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                tracing::error!("Frame source thread panicked");
            }
        }

        for stats in self.devices.stats() {
            tracing::info!(
                device = %stats.device,
                pushed = stats.pushed,
                discarded = stats.discarded,
                "Device stats"
            );
        }

        let mut rx = self.source_result.take()?;
        rx.try_recv().ok()
    }
}

/// Drain one device's slot into the shared cache
async fn cache_writer(
    device: DeviceId,
    slot: Arc<FrameSlot>,
    cache: Arc<FrameCache>,
    encoder: JpegEncoder,
) {
    tracing::debug!(device = %device, "Cache writer started");

    while let Some(frame) = slot.recv().await {
        let seq = frame.seq;
        if cache.is_stale(seq) {
            tracing::trace!(device = %device, seq = seq, "Skipping stale frame");
            continue;
        }

        let encoded = match tokio::task::spawn_blocking(move || encoder.encode(&frame)).await {
            Ok(Ok(encoded)) => encoded,
            Ok(Err(e)) => {
                tracing::warn!(device = %device, seq = seq, error = %e, "Dropping frame");
                continue;
            }
            Err(e) => {
                tracing::error!(device = %device, seq = seq, error = %e, "Encoder task failed");
                continue;
            }
        };

        if !cache.publish(encoded) {
            tracing::trace!(device = %device, seq = seq, "Newer frame already cached");
        }
    }

    tracing::debug!(device = %device, "Cache writer stopped");
}
