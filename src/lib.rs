//! liveview: paced video frame fan-out with a live MJPEG viewer
//!
//! A single frame source decodes a video asset at its native rate and hands
//! every frame to a fixed set of devices through latest-wins slots. Frames
//! are JPEG-encoded into a shared cache and served to browsers at
//! `/video_feed` as `multipart/x-mixed-replace`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use liveview::{LiveviewConfig, LiveviewServer, Pipeline, ServerConfig, Shutdown};
//!
//! #[tokio::main]
//! async fn main() -> liveview::Result<()> {
//!     let config = LiveviewConfig::load("liveview.yaml".as_ref())?;
//!     let pipeline = Pipeline::open(&config)?;
//!     let server = LiveviewServer::bind(
//!         ServerConfig::from_liveview(&config)?,
//!         Arc::clone(pipeline.cache()),
//!     )
//!     .await?;
//!
//!     let shutdown = Shutdown::new();
//!     let running = pipeline.start(&shutdown)?;
//!     tokio::spawn(server.run(shutdown.signal()));
//!
//!     tokio::signal::ctrl_c().await?;
//!     running.stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod registry;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod source;
pub mod stats;

pub use config::LiveviewConfig;
pub use error::{ConfigError, Error, Result};
pub use pipeline::{Pipeline, RunningPipeline};
pub use registry::{DeviceId, DeviceTable, EncodedFrame, Frame, FrameCache};
pub use server::{LiveviewServer, ServerConfig};
pub use shutdown::{Shutdown, ShutdownSignal};
