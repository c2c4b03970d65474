// Copy-on-read device registry
//
// The sync layer writes through this registry; generate/identify calls take a
// snapshot so no lock is held while EIDs are derived.

use crate::model::RemoteDevice;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Immutable view of the registry at one instant
pub type RegistrySnapshot = Arc<Vec<RemoteDevice>>;

/// Ordered set of known remote devices, keyed by device id.
///
/// Order is insertion order and is the candidate order the matcher uses.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<RegistrySnapshot>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_devices(devices: Vec<RemoteDevice>) -> Self {
        let registry = Self::new();
        registry.replace_all(devices);
        registry
    }

    /// Current contents; cheap, and unaffected by later writes
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.devices.read().clone()
    }

    /// Insert a device, or replace the one with the same id in place
    pub fn upsert(&self, device: RemoteDevice) {
        let mut guard = self.devices.write();
        let devices = Arc::make_mut(&mut guard);
        match devices
            .iter_mut()
            .find(|existing| existing.device_id() == device.device_id())
        {
            Some(existing) => *existing = device,
            None => devices.push(device),
        }
    }

    /// Remove a device; returns whether it was present
    pub fn remove(&self, device_id: &str) -> bool {
        let mut guard = self.devices.write();
        if !guard.iter().any(|d| d.device_id() == device_id) {
            return false;
        }
        Arc::make_mut(&mut guard).retain(|d| d.device_id() != device_id);
        true
    }

    /// Replace the whole registry, keeping the first entry for duplicate ids
    pub fn replace_all(&self, devices: Vec<RemoteDevice>) {
        let mut unique: Vec<RemoteDevice> = Vec::with_capacity(devices.len());
        for device in devices {
            if unique.iter().any(|d| d.device_id() == device.device_id()) {
                debug!(device_id = device.device_id(), "Dropping duplicate device id");
                continue;
            }
            unique.push(device);
        }
        *self.devices.write() = Arc::new(unique);
    }

    pub fn get(&self, device_id: &str) -> Option<RemoteDevice> {
        self.devices
            .read()
            .iter()
            .find(|d| d.device_id() == device_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }
}
