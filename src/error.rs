//! Error types
//!
//! Fatal errors (`Config`, `SourceUnavailable`, `Decode`, `Bind`) end the process
//! at startup or stop the frame source. The others are contained to the task
//! that hit them.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Configuration file unreadable, malformed or incomplete
    Config(ConfigError),
    /// Video asset missing or unreadable when opened
    SourceUnavailable(String),
    /// A single frame could not be decoded; the source keeps going
    TransientDecode(String),
    /// The source cannot produce any more frames
    Decode(String),
    /// JPEG encoding of a frame failed
    Encode(String),
    /// A viewer's connection went away mid-stream
    ClientDisconnected { session_id: u64 },
    /// The HTTP listener could not bind
    Bind { addr: SocketAddr, source: io::Error },
    /// Device table lookup failed
    Registry(RegistryError),
    /// Other I/O failure
    Io(io::Error),
}

impl Error {
    /// Whether the frame source should skip this error and keep producing
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransientDecode(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::SourceUnavailable(msg) => write!(f, "Video source unavailable: {}", msg),
            Error::TransientDecode(msg) => write!(f, "Frame decode failed: {}", msg),
            Error::Decode(msg) => write!(f, "Video source failed: {}", msg),
            Error::Encode(msg) => write!(f, "JPEG encode failed: {}", msg),
            Error::ClientDisconnected { session_id } => {
                write!(f, "Client disconnected (session {})", session_id)
            }
            Error::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
            Error::Registry(e) => write!(f, "{}", e),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Bind { source, .. } => Some(source),
            Error::Registry(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Error::Registry(e)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// File could not be read
    Read { path: PathBuf, source: io::Error },
    /// File is not valid YAML for the expected shape
    Parse(serde_yaml::Error),
    /// A required key is absent
    MissingKey(&'static str),
    /// A key is present but its value is unusable
    Invalid { key: &'static str, reason: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "cannot read {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "invalid YAML: {}", e),
            ConfigError::MissingKey(key) => write!(f, "missing required key '{}'", key),
            ConfigError::Invalid { key, reason } => write!(f, "invalid '{}': {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e)
    }
}
