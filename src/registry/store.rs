//! Device fan-out table
//!
//! Fixed map of device id to `FrameSlot`, built once at startup. The frame
//! source pushes every frame to every slot; each slot has exactly one reader.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::RegistryError;
use super::frame::{DeviceId, Frame};
use super::slot::FrameSlot;

/// Per-device counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStats {
    /// Device id
    pub device: DeviceId,
    /// Frames pushed to the device
    pub pushed: u64,
    /// Frames overwritten before being consumed
    pub discarded: u64,
}

/// Table of per-device hand-off slots
#[derive(Debug)]
pub struct DeviceTable {
    slots: BTreeMap<DeviceId, Arc<FrameSlot>>,
}

impl DeviceTable {
    /// Create one slot per device
    ///
    /// Duplicate ids collapse into one slot.
    pub fn new<I>(devices: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = DeviceId>,
    {
        let slots: BTreeMap<_, _> = devices
            .into_iter()
            .map(|id| (id, Arc::new(FrameSlot::new())))
            .collect();

        if slots.is_empty() {
            return Err(RegistryError::NoDevices);
        }

        Ok(Self { slots })
    }

    /// Get a device's slot
    pub fn slot(&self, device: &DeviceId) -> Result<Arc<FrameSlot>, RegistryError> {
        self.slots
            .get(device)
            .cloned()
            .ok_or_else(|| RegistryError::DeviceNotFound(device.clone()))
    }

    /// Iterate over devices and their slots in id order
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &Arc<FrameSlot>)> {
        self.slots.iter()
    }

    /// Configured device ids in id order
    pub fn devices(&self) -> impl Iterator<Item = &DeviceId> {
        self.slots.keys()
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Push a frame to every device
    ///
    /// Never blocks. Returns how many pending frames were overwritten.
    pub fn distribute(&self, frame: &Frame) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.push(frame.clone()).is_some())
            .count()
    }

    /// Close every slot, waking all readers
    pub fn close_all(&self) {
        for (device, slot) in &self.slots {
            slot.close();
            tracing::debug!(device = %device, "Device slot closed");
        }
    }

    /// Counters for every device
    pub fn stats(&self) -> Vec<DeviceStats> {
        self.slots
            .iter()
            .map(|(device, slot)| DeviceStats {
                device: device.clone(),
                pushed: slot.pushed(),
                discarded: slot.discarded(),
            })
            .collect()
    }
}
