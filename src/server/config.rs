//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;

use crate::config::LiveviewConfig;
use crate::error::ConfigError;

/// Page served at `/` when no `index_page` is configured
pub const DEFAULT_INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Live view</title>
    <style>
      body { margin: 0; background: #111; color: #ddd; font-family: sans-serif; }
      h1 { font-size: 1.1em; font-weight: normal; padding: 0.5em 1em; margin: 0; }
      img { display: block; max-width: 100%; margin: 0 auto; }
    </style>
  </head>
  <body>
    <h1>Live view</h1>
    <img src="/video_feed" alt="live stream">
  </body>
</html>
"#;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent stream viewers (0 = unlimited)
    pub max_connections: usize,

    /// Re-send the current frame after this long without a new one
    pub keepalive_interval: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// HTML served at `/`
    pub index_page: Bytes,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            max_connections: 0, // Unlimited
            keepalive_interval: Duration::from_secs(2),
            tcp_nodelay: true, // Frames should leave as soon as they're written
            index_page: Bytes::from_static(DEFAULT_INDEX_PAGE.as_bytes()),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build from the application configuration
    ///
    /// Resolves the bind address and reads the custom index page, if any.
    pub fn from_liveview(config: &LiveviewConfig) -> Result<Self, ConfigError> {
        let mut server = Self::with_addr(config.bind_addr()?).max_connections(config.max_connections);

        if let Some(path) = &config.index_page {
            let html = std::fs::read(path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            server = server.index_page(html);
        }

        Ok(server)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the idle re-send interval
    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Replace the index page
    pub fn index_page(mut self, html: impl Into<Bytes>) -> Self {
        self.index_page = html.into();
        self
    }
}
