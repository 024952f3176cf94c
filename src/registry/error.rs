//! Registry error types
//!
//! Error types for device table operations.

use super::frame::DeviceId;

/// Error type for device table operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Device was not configured at startup
    DeviceNotFound(DeviceId),
    /// No devices were configured
    NoDevices,
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DeviceNotFound(id) => write!(f, "Device not found: {}", id),
            RegistryError::NoDevices => write!(f, "No devices configured"),
        }
    }
}

impl std::error::Error for RegistryError {}
