//! Live view server
//!
//! Run with: liveview --config liveview.yaml [--frame-count N]
//!
//! Then open http://<liveview_url>:<liveview_port>/ in a browser.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use liveview::config::DEFAULT_FRAME_BUDGET;
use liveview::{LiveviewConfig, LiveviewServer, Pipeline, ServerConfig, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "liveview", about = "Paced video fan-out with a live MJPEG view")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long)]
    config: PathBuf,

    /// Frames for background-model consumers (passed through, unused here)
    #[arg(long, default_value_t = DEFAULT_FRAME_BUDGET)]
    frame_count: u32,
}

/// `RUST_LOG` wins; otherwise honour `LOGLEVEL` (Python-style names), then `info`
fn env_filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = std::env::var("LOGLEVEL")
        .map(|level| match level.to_ascii_lowercase().as_str() {
            "critical" | "fatal" => "error".to_string(),
            "warning" => "warn".to_string(),
            "notset" => "trace".to_string(),
            other => other.to_string(),
        })
        .unwrap_or_else(|_| "info".to_string());

    EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> liveview::Result<()> {
    let config = LiveviewConfig::load(&args.config)?.frame_budget(args.frame_count);
    tracing::info!(
        config = %args.config.display(),
        devices = ?config.device_ids,
        source = %config.source_path,
        looping = config.looping,
        frame_budget = config.frame_budget,
        "Configuration loaded"
    );

    let pipeline = Pipeline::open(&config)?;
    let server = LiveviewServer::bind(
        ServerConfig::from_liveview(&config)?,
        Arc::clone(pipeline.cache()),
    )
    .await?;

    let shutdown = Shutdown::new();
    let mut running = pipeline.start(&shutdown)?;
    let server_task = tokio::spawn(server.run(shutdown.signal()));

    let source_failure = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down...");
            None
        }
        result = running.source_finished() => match result {
            Ok(stats) => {
                tracing::info!(frames = stats.frames_produced, "Frame source finished");
                None
            }
            Err(e) => Some(e),
        },
    };

    running.stop().await;
    match server_task.await {
        Ok(Err(e)) => tracing::error!(error = %e, "Server failed"),
        Err(e) => tracing::error!(error = %e, "Server task failed"),
        Ok(Ok(())) => {}
    }

    match source_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
