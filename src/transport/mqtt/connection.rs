//! Pure connection state and option handling for the MQTT client

use crate::config::BrokerSection;
use rumqttc::v5::MqttOptions;
use rumqttc::Transport as RumqttcTransport;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Connection state of the broker link.
///
/// Lifecycle: `Connecting -> Connected -> Disconnected` on a drop, then
/// `Reconnecting -> Connected` once the watchdog repairs the link. Exhaustion
/// of the startup retry budget is not a stored state; it surfaces as
/// [`ClientError::ConnectionExhausted`](crate::error::ClientError).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial connection attempt in flight.
    Connecting,
    /// Connected and receiving telemetry.
    Connected,
    /// Link lost, with reason.
    Disconnected(String),
    /// Reconnection attempt in flight (attempt count since startup).
    Reconnecting(u32),
}

/// MQTT transport errors.
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("subscription failed")]
    SubscriptionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    #[error("not connected - current state: {state:?}")]
    NotConnected { state: ConnectionState },
}

/// Build rumqttc options from the broker section of the configuration.
///
/// Each connection attempt gets a fresh unique client id so a half-open
/// session on the broker never rejects the reconnect.
pub fn configure_mqtt_options(broker: &BrokerSection) -> Result<MqttOptions, MqttError> {
    let url = Url::parse(&broker.url).map_err(|_| MqttError::InvalidBrokerUrl(broker.url.clone()))?;

    let host = url
        .host_str()
        .ok_or_else(|| MqttError::InvalidBrokerUrl(broker.url.clone()))?;
    let port = url
        .port()
        .unwrap_or(if url.scheme() == "mqtts" { 8883 } else { 1883 });

    let client_id = format!("beaconwatch-{}", uuid::Uuid::new_v4());
    let mut mqtt_options = MqttOptions::new(client_id, host, port);

    if url.scheme() == "mqtts" {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    if let Some(username) = broker.username() {
        let password = broker.password().unwrap_or_default();
        mqtt_options.set_credentials(username, password);
    }

    mqtt_options.set_keep_alive(Duration::from_secs(60));

    Ok(mqtt_options)
}
