//! MQTT client built on rumqttc's v5 async client
//!
//! One `connect` call performs exactly one broker connection attempt: it
//! spawns a fresh event-loop task and waits for the ConnAck (or a failure)
//! before returning. Retry policy and reconnect scheduling live in the
//! [`ConnectionSupervisor`](crate::supervisor::ConnectionSupervisor); the
//! event-loop task stops itself when the link drops so the watchdog observes
//! a disconnected transport on its next tick.

use super::connection::{configure_mqtt_options, ConnectionState, MqttError};
use crate::config::BrokerSection;
use crate::transport::Transport;
use async_trait::async_trait;
use bytes::Bytes;
use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, Event, EventLoop};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// MQTT transport for the telemetry subscriber.
pub struct MqttClient {
    broker: BrokerSection,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    message_tx: mpsc::Sender<Bytes>,
    // Serializes connection attempts; the supervisor holds its own guard too.
    inner: Mutex<Inner>,
    ever_connected: AtomicBool,
    reconnects: AtomicU32,
}

#[derive(Default)]
struct Inner {
    client: Option<AsyncClient>,
    poll_task: Option<JoinHandle<()>>,
    subscribed_topic: Option<String>,
}

impl MqttClient {
    /// Create a client that forwards raw telemetry payloads into `message_tx`.
    pub fn new(broker: BrokerSection, message_tx: mpsc::Sender<Bytes>) -> Self {
        let (state_tx, state_rx) =
            watch::channel(ConnectionState::Disconnected("not yet connected".to_string()));
        MqttClient {
            broker,
            state_tx,
            state_rx,
            message_tx,
            inner: Mutex::new(Inner::default()),
            ever_connected: AtomicBool::new(false),
            reconnects: AtomicU32::new(0),
        }
    }

    /// Wait until the state channel reports Connected, or fail on a reported
    /// disconnect or on timeout.
    async fn wait_for_connection(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let timeout_result = tokio::time::timeout(timeout, async {
            loop {
                {
                    let state = state_rx.borrow_and_update();
                    match &*state {
                        ConnectionState::Connected => return Ok(()),
                        ConnectionState::Disconnected(reason) => {
                            return Err(MqttError::ConnectionFailed(reason.clone()));
                        }
                        ConnectionState::Connecting | ConnectionState::Reconnecting(_) => {}
                    }
                }
                if state_rx.changed().await.is_err() {
                    return Err(MqttError::ConnectionFailed(
                        "state channel closed".to_string(),
                    ));
                }
            }
        })
        .await;

        match timeout_result {
            Ok(result) => result,
            Err(_) => Err(MqttError::ConnectionFailed(
                "no ConnAck from broker before timeout".to_string(),
            )),
        }
    }

    async fn connect_once(&self) -> Result<(), MqttError> {
        let mut inner = self.inner.lock().await;

        // A stale event-loop task from a failed or dropped connection must
        // not race the new one.
        if let Some(task) = inner.poll_task.take() {
            task.abort();
        }

        let state = if self.ever_connected.load(Ordering::Relaxed) {
            ConnectionState::Reconnecting(self.reconnects.fetch_add(1, Ordering::Relaxed) + 1)
        } else {
            ConnectionState::Connecting
        };
        let _ = self.state_tx.send(state);

        let mqtt_options = configure_mqtt_options(&self.broker)?;
        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let task = tokio::spawn(run_event_loop(
            event_loop,
            client.clone(),
            self.state_tx.clone(),
            self.message_tx.clone(),
            inner.subscribed_topic.clone(),
        ));
        inner.client = Some(client);
        inner.poll_task = Some(task);

        let timeout = Duration::from_secs(self.broker.connect_timeout_secs);
        match Self::wait_for_connection(self.state_rx.clone(), timeout).await {
            Ok(()) => {
                self.ever_connected.store(true, Ordering::Relaxed);
                info!(broker = %self.broker.url, "connected to MQTT broker");
                Ok(())
            }
            Err(e) => {
                if let Some(task) = inner.poll_task.take() {
                    task.abort();
                }
                inner.client = None;
                let _ = self
                    .state_tx
                    .send(ConnectionState::Disconnected(e.to_string()));
                Err(e)
            }
        }
    }
}

/// Poll the event loop until the link drops.
///
/// ConnAck re-establishes the telemetry subscription (empty on the initial
/// connect, populated on reconnects). Publish payloads are forwarded through
/// a bounded channel with `try_send` so a slow ingestion pipeline can never
/// stall message delivery.
async fn run_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    state_tx: watch::Sender<ConnectionState>,
    message_tx: mpsc::Sender<Bytes>,
    resubscribe_topic: Option<String>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                let _ = state_tx.send(ConnectionState::Connected);
                if let Some(topic) = &resubscribe_topic {
                    match client.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                        Ok(()) => debug!(topic = %topic, "re-subscribed after reconnect"),
                        Err(e) => error!(topic = %topic, error = %e, "re-subscription failed"),
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!(
                    topic = %String::from_utf8_lossy(&publish.topic),
                    bytes = publish.payload.len(),
                    "telemetry message received"
                );
                match message_tx.try_send(publish.payload) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!("ingestion queue full, dropping telemetry message");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        warn!("ingestion pipeline gone, dropping telemetry message");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect(_))) => {
                warn!("broker sent disconnect");
                let _ = state_tx.send(ConnectionState::Disconnected(
                    "broker sent disconnect".to_string(),
                ));
                break;
            }
            Ok(other) => {
                debug!(event = ?other, "mqtt event");
            }
            Err(e) => {
                warn!(error = %e, "MQTT event loop error, connection lost");
                let _ = state_tx.send(ConnectionState::Disconnected(e.to_string()));
                break;
            }
        }
    }
}

#[async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn connect(&self) -> Result<(), Self::Error> {
        self.connect_once().await
    }

    async fn subscribe(&self, topic: &str) -> Result<(), Self::Error> {
        let mut inner = self.inner.lock().await;
        let client = inner.client.as_ref().ok_or_else(|| MqttError::NotConnected {
            state: self.connection_state(),
        })?;

        client
            .subscribe(topic.to_string(), QoS::AtLeastOnce)
            .await
            .map_err(|e| MqttError::SubscriptionFailed(Box::new(e)))?;

        inner.subscribed_topic = Some(topic.to_string());
        info!(topic = %topic, "subscribed to telemetry topic");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        matches!(*self.state_rx.borrow(), ConnectionState::Connected)
    }

    fn connection_state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // No async in Drop; aborting the poll task closes the link.
        if let Ok(mut inner) = self.inner.try_lock() {
            if let Some(task) = inner.poll_task.take() {
                task.abort();
            }
        }
    }
}
