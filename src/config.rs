//! Application configuration
//!
//! Loaded once from a YAML file at startup and immutable afterwards.
//!
//! ```yaml
//! device_ids: [cam0]
//! liveview_url: 0.0.0.0
//! liveview_port: 5000
//! source_path: ~/videos/demo.mp4   # optional
//! loop: true                       # optional
//! ```

use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::media::DEFAULT_JPEG_QUALITY;
use crate::registry::DeviceId;
use crate::source::{expand_home, CaptureOptions};

/// Source played when the file doesn't name one
pub const DEFAULT_SOURCE_PATH: &str = "Big_Buck_Bunny_1080_10s_1MB.mp4";

/// Frames handed to background-model consumers when the CLI doesn't say
pub const DEFAULT_FRAME_BUDGET: u32 = 32;

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    device_ids: Option<Vec<DeviceIdValue>>,
    liveview_url: Option<String>,
    liveview_port: Option<u16>,
    source_path: Option<String>,
    #[serde(rename = "loop")]
    looping: Option<bool>,
    source_fps: Option<f64>,
    jpeg_quality: Option<u8>,
    index_page: Option<String>,
    max_connections: Option<usize>,
}

/// Device ids are usually strings but bare YAML numbers are accepted too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeviceIdValue {
    Text(String),
    Number(i64),
}

impl DeviceIdValue {
    fn into_id(self) -> DeviceId {
        match self {
            DeviceIdValue::Text(s) => DeviceId::new(s),
            DeviceIdValue::Number(n) => DeviceId::new(n.to_string()),
        }
    }
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LiveviewConfig {
    /// Devices that receive every frame
    pub device_ids: BTreeSet<DeviceId>,
    /// Host the HTTP listener binds to
    pub liveview_host: String,
    /// Port the HTTP listener binds to
    pub liveview_port: u16,
    /// Video file, image directory, camera URL or `stub://` pattern
    pub source_path: String,
    /// Restart the asset when it ends
    pub looping: bool,
    /// Frames for downstream background-model bookkeeping; not used here
    pub frame_budget: u32,
    /// Frame rate for sources that don't declare one
    pub source_fps: Option<f64>,
    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
    /// HTML file served at `/` instead of the built-in page
    pub index_page: Option<PathBuf>,
    /// Concurrent HTTP connections (0 = unlimited)
    pub max_connections: usize,
}

impl LiveviewConfig {
    /// Read and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = if text.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str::<Option<ConfigFile>>(text)?.unwrap_or_default()
        };
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let device_ids: BTreeSet<DeviceId> = file
            .device_ids
            .ok_or(ConfigError::MissingKey("device_ids"))?
            .into_iter()
            .map(DeviceIdValue::into_id)
            .collect();
        if device_ids.is_empty() {
            return Err(ConfigError::Invalid {
                key: "device_ids",
                reason: "at least one device is required".into(),
            });
        }

        let liveview_host = file
            .liveview_url
            .ok_or(ConfigError::MissingKey("liveview_url"))?;
        if liveview_host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "liveview_url",
                reason: "host is empty".into(),
            });
        }
        let liveview_port = file
            .liveview_port
            .ok_or(ConfigError::MissingKey("liveview_port"))?;

        if let Some(fps) = file.source_fps {
            if !fps.is_finite() || fps < 0.0 {
                return Err(ConfigError::Invalid {
                    key: "source_fps",
                    reason: format!("{} is not a usable frame rate", fps),
                });
            }
        }

        let jpeg_quality = file.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY);
        if !(1..=100).contains(&jpeg_quality) {
            return Err(ConfigError::Invalid {
                key: "jpeg_quality",
                reason: format!("{} is outside 1-100", jpeg_quality),
            });
        }

        Ok(Self {
            device_ids,
            liveview_host,
            liveview_port,
            source_path: file
                .source_path
                .unwrap_or_else(|| DEFAULT_SOURCE_PATH.to_string()),
            looping: file.looping.unwrap_or(true),
            frame_budget: DEFAULT_FRAME_BUDGET,
            source_fps: file.source_fps,
            jpeg_quality,
            index_page: file.index_page.map(|p| expand_home(&p)),
            max_connections: file.max_connections.unwrap_or(0),
        })
    }

    /// Set the frame budget passed through from the command line
    pub fn frame_budget(mut self, frames: u32) -> Self {
        self.frame_budget = frames;
        self
    }

    /// Resolve `liveview_host:liveview_port` to a socket address
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = self.liveview_host.trim();
        if let Ok(ip) = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.liveview_port));
        }

        (host, self.liveview_port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ConfigError::Invalid {
                key: "liveview_url",
                reason: format!("cannot resolve host '{}'", host),
            })
    }

    /// Options forwarded to the capture backend
    pub fn capture_options(&self) -> CaptureOptions {
        CaptureOptions {
            source_fps: self.source_fps,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = "
device_ids: [cam0]
liveview_url: 127.0.0.1
liveview_port: 5000
";

    #[test]
    fn test_minimal_config_defaults() {
        let config = LiveviewConfig::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.device_ids.len(), 1);
        assert!(config.device_ids.contains(&DeviceId::from("cam0")));
        assert_eq!(config.liveview_host, "127.0.0.1");
        assert_eq!(config.liveview_port, 5000);
        assert_eq!(config.source_path, DEFAULT_SOURCE_PATH);
        assert!(config.looping);
        assert_eq!(config.frame_budget, DEFAULT_FRAME_BUDGET);
        assert_eq!(config.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(config.max_connections, 0);
    }

    #[test]
    fn test_full_config() {
        let yaml = "
device_ids:
  - cam0
  - 7
  - cam0
liveview_url: 0.0.0.0
liveview_port: 8080
source_path: stub://demo
loop: false
source_fps: 12.5
jpeg_quality: 70
max_connections: 4
plugin_type: flask
";
        let config = LiveviewConfig::from_yaml(yaml).unwrap().frame_budget(64);

        let ids: Vec<&str> = config.device_ids.iter().map(|d| d.as_str()).collect();
        assert_eq!(ids, vec!["7", "cam0"]);
        assert_eq!(config.source_path, "stub://demo");
        assert!(!config.looping);
        assert_eq!(config.source_fps, Some(12.5));
        assert_eq!(config.jpeg_quality, 70);
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.frame_budget, 64);
        assert_eq!(config.capture_options().source_fps, Some(12.5));
    }

    #[test]
    fn test_missing_required_keys() {
        let cases = [
            ("liveview_url: a\nliveview_port: 1\n", "device_ids"),
            ("device_ids: [a]\nliveview_port: 1\n", "liveview_url"),
            ("device_ids: [a]\nliveview_url: a\n", "liveview_port"),
            ("", "device_ids"),
        ];
        for (yaml, key) in cases {
            match LiveviewConfig::from_yaml(yaml) {
                Err(ConfigError::MissingKey(missing)) => assert_eq!(missing, key),
                other => panic!("expected missing {}, got {:?}", key, other),
            }
        }
    }

    #[test]
    fn test_invalid_values() {
        let empty_devices = "device_ids: []\nliveview_url: a\nliveview_port: 1\n";
        assert!(matches!(
            LiveviewConfig::from_yaml(empty_devices),
            Err(ConfigError::Invalid { key: "device_ids", .. })
        ));

        let bad_quality = format!("{}jpeg_quality: 0\n", MINIMAL);
        assert!(matches!(
            LiveviewConfig::from_yaml(&bad_quality),
            Err(ConfigError::Invalid { key: "jpeg_quality", .. })
        ));

        let bad_port = "device_ids: [a]\nliveview_url: a\nliveview_port: 70000\n";
        assert!(matches!(
            LiveviewConfig::from_yaml(bad_port),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = LiveviewConfig::load(file.path()).unwrap();
        assert_eq!(config.liveview_port, 5000);
    }

    #[test]
    fn test_load_missing_file() {
        let err = LiveviewConfig::load(Path::new("/nonexistent/liveview.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_bind_addr() {
        let config = LiveviewConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(
            config.bind_addr().unwrap(),
            "127.0.0.1:5000".parse::<SocketAddr>().unwrap()
        );

        let mut v6 = config.clone();
        v6.liveview_host = "[::1]".into();
        assert_eq!(v6.bind_addr().unwrap().port(), 5000);
        assert!(v6.bind_addr().unwrap().is_ipv6());
    }
}
