// Device registry file for the proxid CLI
//
// Stores the known remote devices, with their beacon seeds, as a JSON array.
// Array order is the candidate order used when matching advertisements.

use anyhow::{Context, Result};
use proxid_core::{DeviceRegistry, RemoteDevice};
use std::path::PathBuf;

pub struct DeviceFile {
    path: PathBuf,
    registry: DeviceRegistry,
}

impl DeviceFile {
    /// Open a registry file; a missing file is an empty registry
    pub fn open(path: PathBuf) -> Result<Self> {
        let devices: Vec<RemoteDevice> = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read device registry")?;
            serde_json::from_str(&contents).context("Failed to parse device registry")?
        } else {
            Vec::new()
        };

        let registry = DeviceRegistry::new();
        registry.replace_all(devices);
        tracing::debug!(path = %path.display(), devices = registry.len(), "Opened device registry");

        Ok(Self { path, registry })
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Add or replace a device and persist the registry
    pub fn add(&self, device: RemoteDevice) -> Result<()> {
        self.registry.upsert(device);
        self.save()
    }

    /// Remove a device; returns false when it was not registered
    pub fn remove(&self, device_id: &str) -> Result<bool> {
        let removed = self.registry.remove(device_id);
        if removed {
            self.save()?;
        }
        Ok(removed)
    }

    pub fn get(&self, device_id: &str) -> Option<RemoteDevice> {
        self.registry.get(device_id)
    }

    /// Look up a device by id, failing with a readable error
    pub fn require(&self, device_id: &str) -> Result<RemoteDevice> {
        self.get(device_id)
            .with_context(|| format!("Unknown device: {}", device_id))
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create registry directory")?;
        }
        let snapshot = self.registry.snapshot();
        let contents = serde_json::to_string_pretty(snapshot.as_slice())
            .context("Failed to serialize device registry")?;
        std::fs::write(&self.path, contents).context("Failed to write device registry")?;
        Ok(())
    }
}
