//! Beaconwatch - resilient BLE gateway telemetry subscriber
//!
//! Subscribes to a gateway's MQTT telemetry topic, keeps an in-memory registry
//! of the most recently seen BLE devices, and exports operator-selected
//! devices to CSV on demand.
//!
//! # Overview
//!
//! The crate is organized around a small set of components:
//! - MQTT transport with an explicit connection state machine
//! - Connection supervisor: startup retry with linear backoff plus a
//!   reconnect watchdog
//! - Ingestion pipeline decoding gateway JSON into device batches
//! - Concurrent device registry with whole-batch replacement
//! - CSV exporter for 1-based operator selections
//!
//! # Quick Start
//!
//! ```rust
//! use beaconwatch::export::SelectionExporter;
//! use beaconwatch::telemetry::Device;
//!
//! let snapshot = vec![
//!     Device {
//!         address: "C3:00:00:12:34:56".to_string(),
//!         model: "iBS03T".to_string(),
//!         rssi: -61,
//!     },
//!     Device {
//!         address: "C3:00:00:65:43:21".to_string(),
//!         model: "Unknown Model".to_string(),
//!         rssi: -78,
//!     },
//! ];
//!
//! // "2,1" selects the second then the first device; junk tokens are dropped.
//! let selected = SelectionExporter::resolve_selection("2,1,oops", &snapshot);
//! assert_eq!(selected.len(), 2);
//! assert_eq!(selected[0].address, "C3:00:00:65:43:21");
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod menu;
pub mod observability;
pub mod registry;
pub mod supervisor;
pub mod telemetry;
pub mod testing;
pub mod transport;

pub use app::SubscriberApp;
pub use config::SubscriberConfig;
pub use error::{ClientError, ClientResult};
pub use export::{ExportOutcome, SelectionExporter};
pub use registry::DeviceRegistry;
pub use supervisor::{ConnectionSupervisor, RetryPolicy};
pub use telemetry::Device;
pub use transport::mqtt::MqttClient;
