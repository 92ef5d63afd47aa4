//! Telemetry ingestion pipeline
//!
//! Drains raw payloads forwarded by the transport, decodes them, and replaces
//! the device registry wholesale on every valid message. Decode failures are
//! logged and dropped; they never disturb the registry or the pipeline.

use crate::registry::DeviceRegistry;
use crate::telemetry::{self, DecodeError};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Decodes inbound telemetry and updates the device registry.
pub struct IngestionPipeline {
    registry: Arc<DeviceRegistry>,
    /// Live console display toggle. Written by the interactive loop while it
    /// is prompting; affects output only, never ingestion.
    display_enabled: Arc<AtomicBool>,
}

impl IngestionPipeline {
    pub fn new(registry: Arc<DeviceRegistry>, display_enabled: Arc<AtomicBool>) -> Self {
        Self {
            registry,
            display_enabled,
        }
    }

    /// Handle one raw inbound payload.
    ///
    /// Resolves synchronously and cheaply: decode, then a single registry
    /// replace. Every failure mode is terminal for this message only.
    pub fn handle_payload(&self, payload: &[u8]) {
        match telemetry::decode_device_list(payload) {
            Ok(devices) => {
                debug!(count = devices.len(), "device batch decoded");
                self.registry.replace(devices);
                if self.display_enabled.load(Ordering::Relaxed) {
                    self.render_live();
                }
            }
            Err(DecodeError::MissingDeviceList) => {
                warn!("no device list available in telemetry message, registry unchanged");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "failed to decode telemetry message, dropping it"
                );
            }
        }
    }

    fn render_live(&self) {
        let snapshot = self.registry.snapshot();
        println!("Telemetry update:");
        for device in &snapshot {
            println!("{}, {}, {}", device.address, device.model, device.rssi);
        }
    }

    /// Spawn the long-running ingestion task draining the payload channel.
    ///
    /// The task ends when the transport side of the channel is dropped.
    pub fn spawn(self, mut payload_rx: mpsc::Receiver<Bytes>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(payload) = payload_rx.recv().await {
                self.handle_payload(&payload);
            }
            debug!("telemetry channel closed, ingestion pipeline stopped");
        })
    }
}
