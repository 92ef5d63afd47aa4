//! Transport layer for broker communication
//!
//! This module provides a transport abstraction and the MQTT implementation,
//! so the connection supervisor and the application can be driven by mocks in
//! tests.

pub mod mqtt;

/// Transport trait for the subscriber's broker connection.
///
/// `connect` performs exactly one connection attempt; retry policy lives in
/// the [`ConnectionSupervisor`](crate::supervisor::ConnectionSupervisor).
/// Implementations must serialize concurrent `connect` calls internally.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Perform a single connection attempt against the broker.
    async fn connect(&self) -> Result<(), Self::Error>;

    /// Subscribe to a topic filter. The subscription is re-established
    /// automatically after a reconnect.
    async fn subscribe(&self, topic: &str) -> Result<(), Self::Error>;

    /// Check if the transport is currently connected.
    fn is_connected(&self) -> bool;

    /// Get the current connection state.
    fn connection_state(&self) -> mqtt::ConnectionState;
}

/// Type alias for the MQTT transport.
pub type MqttTransport = mqtt::MqttClient;
