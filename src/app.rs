//! Application orchestrator
//!
//! Wires the transport, supervisor, ingestion pipeline, and exporter together
//! and owns the long-lived tasks. The interactive menu sits on top of this and
//! only ever calls the methods exposed here.

use crate::config::SubscriberConfig;
use crate::error::ClientResult;
use crate::export::{ExportOutcome, SelectionExporter};
use crate::ingest::IngestionPipeline;
use crate::registry::DeviceRegistry;
use crate::supervisor::{ConnectionSupervisor, RetryPolicy};
use crate::telemetry::Device;
use crate::transport::{MqttTransport, Transport};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, instrument};

/// Capacity of the transport-to-ingestion payload channel.
const INGESTION_QUEUE_DEPTH: usize = 64;

/// The telemetry subscriber application.
///
/// Generic over the transport so the lifecycle can be tested against a mock;
/// production code uses [`SubscriberApp::connect`] with the MQTT transport.
pub struct SubscriberApp<T: Transport + 'static> {
    config: SubscriberConfig,
    registry: Arc<DeviceRegistry>,
    supervisor: ConnectionSupervisor<T>,
    exporter: SelectionExporter,
    display_enabled: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    ingestion_task: Option<JoinHandle<()>>,
    watchdog_task: Option<JoinHandle<()>>,
}

impl SubscriberApp<MqttTransport> {
    /// Build the production application and establish the broker connection.
    ///
    /// Runs the full startup sequence: connect with retry, subscribe to the
    /// telemetry topic, then spawn the ingestion pipeline and the reconnect
    /// watchdog. Fails only when the retry budget is exhausted or the
    /// subscription is refused.
    #[instrument(skip_all, fields(broker = %config.broker.url))]
    pub async fn connect(config: SubscriberConfig) -> ClientResult<Self> {
        let (payload_tx, payload_rx) = mpsc::channel::<Bytes>(INGESTION_QUEUE_DEPTH);
        let transport = Arc::new(MqttTransport::new(config.broker.clone(), payload_tx));
        let mut app = Self::with_transport(config, transport);
        app.start(payload_rx).await?;
        Ok(app)
    }
}

impl<T: Transport + 'static> SubscriberApp<T> {
    /// Assemble the application around an existing transport without
    /// connecting. Tests drive the lifecycle from here.
    pub fn with_transport(config: SubscriberConfig, transport: Arc<T>) -> Self {
        let display_enabled = Arc::new(AtomicBool::new(config.telemetry.display_live));
        let (shutdown_tx, _) = watch::channel(false);
        let exporter = SelectionExporter::new(&config.export.path);
        SubscriberApp {
            config,
            registry: Arc::new(DeviceRegistry::new()),
            supervisor: ConnectionSupervisor::new(transport),
            exporter,
            display_enabled,
            shutdown_tx,
            ingestion_task: None,
            watchdog_task: None,
        }
    }

    /// Run the startup sequence against the assembled transport.
    pub async fn start(&mut self, payload_rx: mpsc::Receiver<Bytes>) -> ClientResult<()> {
        let policy = RetryPolicy {
            max_attempts: self.config.connection.max_attempts,
            backoff_unit: Duration::from_secs(self.config.connection.backoff_unit_secs),
        };
        self.supervisor.connect_with_retry(&policy).await?;

        self.supervisor
            .transport()
            .subscribe(&self.config.telemetry.topic)
            .await
            .map_err(crate::error::ClientError::transport)?;

        let pipeline = IngestionPipeline::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.display_enabled),
        );
        self.ingestion_task = Some(pipeline.spawn(payload_rx));

        let watchdog_interval =
            Duration::from_secs(self.config.connection.watchdog_interval_secs);
        self.watchdog_task = Some(
            self.supervisor
                .spawn_watchdog(watchdog_interval, self.shutdown_tx.subscribe()),
        );

        info!(topic = %self.config.telemetry.topic, "subscriber running");
        Ok(())
    }

    /// Point-in-time copy of the device registry.
    pub fn snapshot(&self) -> Vec<Device> {
        self.registry.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.supervisor.transport().is_connected()
    }

    /// Toggle the live console display of incoming batches.
    pub fn set_display_enabled(&self, enabled: bool) {
        self.display_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Restore the display toggle to its configured setting.
    pub fn restore_display(&self) {
        self.set_display_enabled(self.config.telemetry.display_live);
    }

    /// Export the devices named by a raw selection string out of `snapshot`.
    pub fn export_selection(
        &self,
        snapshot: &[Device],
        input: &str,
    ) -> ClientResult<ExportOutcome> {
        self.exporter.export(snapshot, input)
    }

    pub fn export_path(&self) -> &std::path::Path {
        self.exporter.path()
    }

    /// Stop the watchdog and ingestion tasks.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.watchdog_task.take() {
            let _ = task.await;
        }
        if let Some(task) = self.ingestion_task.take() {
            task.abort();
        }
        info!("subscriber stopped");
    }
}
