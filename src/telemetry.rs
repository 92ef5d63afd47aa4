//! Wire format for gateway telemetry messages
//!
//! The gateway publishes a JSON envelope with the observed device list nested
//! under `data.value.device_list`. Decoding is tolerant: optional fields get
//! defaults and a malformed payload is a non-fatal decode failure handled by
//! the ingestion pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Placeholder model label applied when the wire payload omits `modelstr`.
pub const UNKNOWN_MODEL: &str = "Unknown Model";

/// One observed BLE device at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Stable unique identifier (MAC-style address).
    pub address: String,
    /// Human-readable model label.
    pub model: String,
    /// Raw radio signal metric as reported by the gateway. No range validation.
    pub rssi: i32,
}

/// Telemetry decoding failures. Resolved inside the ingestion pipeline,
/// never propagated to callers.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed telemetry payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("telemetry message carries no device list")]
    MissingDeviceList,
}

#[derive(Debug, Deserialize)]
struct TelemetryMessage {
    #[serde(default)]
    data: Option<DataSection>,
}

#[derive(Debug, Deserialize)]
struct DataSection {
    #[serde(default)]
    value: Option<DataValue>,
}

#[derive(Debug, Deserialize)]
struct DataValue {
    #[serde(default)]
    device_list: Option<Vec<WireDevice>>,
}

#[derive(Debug, Deserialize)]
struct WireDevice {
    #[serde(rename = "modelstr", default)]
    model: Option<String>,
    #[serde(rename = "ble_addr", default)]
    address: Option<String>,
    #[serde(rename = "scan_rssi", default)]
    rssi: i32,
}

/// Decode a raw telemetry payload into the reported device list.
///
/// Devices without an address are kept here (with an empty address) and
/// filtered by the registry; the decoder logs them so the operator gets a
/// signal about the dropped entries.
pub fn decode_device_list(payload: &[u8]) -> Result<Vec<Device>, DecodeError> {
    let message: TelemetryMessage = serde_json::from_slice(payload)?;

    let wire_devices = message
        .data
        .and_then(|d| d.value)
        .and_then(|v| v.device_list)
        .ok_or(DecodeError::MissingDeviceList)?;

    let devices = wire_devices
        .into_iter()
        .map(|wire| {
            if wire.address.is_none() {
                warn!(
                    model = wire.model.as_deref().unwrap_or(UNKNOWN_MODEL),
                    rssi = wire.rssi,
                    "telemetry entry without device address will not be stored"
                );
            }
            Device {
                address: wire.address.unwrap_or_default(),
                model: wire.model.unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
                rssi: wire.rssi,
            }
        })
        .collect();

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_payload() {
        let payload = br#"{
            "data": {
                "value": {
                    "device_list": [
                        {"modelstr": "iBS03T", "ble_addr": "AA:BB:CC:DD:EE:01", "scan_rssi": -61},
                        {"modelstr": "iBS05", "ble_addr": "AA:BB:CC:DD:EE:02", "scan_rssi": -74}
                    ]
                }
            }
        }"#;

        let devices = decode_device_list(payload).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].address, "AA:BB:CC:DD:EE:01");
        assert_eq!(devices[0].model, "iBS03T");
        assert_eq!(devices[0].rssi, -61);
        assert_eq!(devices[1].address, "AA:BB:CC:DD:EE:02");
    }

    #[test]
    fn test_decode_applies_model_default() {
        let payload = br#"{
            "data": {"value": {"device_list": [
                {"ble_addr": "AA:BB:CC:DD:EE:03", "scan_rssi": -80}
            ]}}
        }"#;

        let devices = decode_device_list(payload).unwrap();
        assert_eq!(devices[0].model, UNKNOWN_MODEL);
    }

    #[test]
    fn test_decode_keeps_addressless_entry_with_empty_address() {
        // The registry filters these out; the decoder only reports them.
        let payload = br#"{
            "data": {"value": {"device_list": [
                {"modelstr": "iBS03T", "scan_rssi": -55}
            ]}}
        }"#;

        let devices = decode_device_list(payload).unwrap();
        assert_eq!(devices.len(), 1);
        assert!(devices[0].address.is_empty());
    }

    #[test]
    fn test_decode_missing_device_list() {
        let cases: Vec<&[u8]> = vec![
            br#"{}"#,
            br#"{"data": {}}"#,
            br#"{"data": {"value": {}}}"#,
            br#"{"data": {"value": {"device_list": null}}}"#,
        ];

        for payload in cases {
            let result = decode_device_list(payload);
            assert!(
                matches!(result, Err(DecodeError::MissingDeviceList)),
                "expected MissingDeviceList for {}",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn test_decode_malformed_payload() {
        let result = decode_device_list(b"not json at all");
        assert!(matches!(result, Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_decode_missing_rssi_defaults_to_zero() {
        let payload = br#"{
            "data": {"value": {"device_list": [
                {"modelstr": "iBS05", "ble_addr": "AA:BB:CC:DD:EE:04"}
            ]}}
        }"#;

        let devices = decode_device_list(payload).unwrap();
        assert_eq!(devices[0].rssi, 0);
    }
}
