//! Concurrency-safe registry of last-known device state
//!
//! The registry is the only resource mutated from more than one execution
//! context: the ingestion pipeline replaces its contents on every decoded
//! message while the interactive loop reads snapshots. Both operations go
//! through an internal lock; a snapshot observes either entirely the state
//! before or entirely the state after a concurrent replace, never a mix.

use crate::telemetry::Device;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory store of last-known device state, keyed by device address.
///
/// Ordering is first-seen order within a batch, matching the order the
/// gateway reported the devices in.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<Vec<Device>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically discard all current entries and install the given devices.
    ///
    /// Entries with an empty address are skipped. Within one batch, a later
    /// duplicate of an address overwrites the earlier entry while keeping its
    /// first-seen position (last write wins, at most one entry per address).
    pub fn replace(&self, devices: Vec<Device>) {
        let mut deduped: Vec<Device> = Vec::with_capacity(devices.len());
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(devices.len());

        for device in devices {
            if device.address.is_empty() {
                continue;
            }
            match positions.get(&device.address) {
                Some(&index) => deduped[index] = device,
                None => {
                    positions.insert(device.address.clone(), deduped.len());
                    deduped.push(device);
                }
            }
        }

        // Single assignment under the write lock keeps replace atomic with
        // respect to concurrent snapshots.
        let mut guard = self.devices.write().expect("device registry lock poisoned");
        *guard = deduped;
    }

    /// Return a consistent point-in-time copy of the registry contents.
    pub fn snapshot(&self) -> Vec<Device> {
        self.devices
            .read()
            .expect("device registry lock poisoned")
            .clone()
    }

    /// Number of devices currently stored.
    pub fn len(&self) -> usize {
        self.devices
            .read()
            .expect("device registry lock poisoned")
            .len()
    }

    /// True when no device has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
