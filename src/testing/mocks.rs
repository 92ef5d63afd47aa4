//! Mock transport for lifecycle testing

use crate::transport::mqtt::ConnectionState;
use crate::transport::Transport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Error returned by scripted mock failures.
#[derive(Debug, Error)]
#[error("mock connect failure")]
pub struct MockTransportError;

/// In-memory transport with scripted connect outcomes.
///
/// By default every connect succeeds. `failing_times(n)` makes the first `n`
/// attempts fail, `always_failing()` makes every attempt fail. A successful
/// connect flips the transport to connected; tests simulate a dropped link
/// with [`set_connected`](MockTransport::set_connected).
#[derive(Debug, Default)]
pub struct MockTransport {
    connected: AtomicBool,
    connect_calls: AtomicU32,
    failures_remaining: Mutex<u32>,
    always_fail: AtomicBool,
    subscriptions: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` connect attempts, then succeed.
    pub fn failing_times(n: u32) -> Self {
        Self {
            failures_remaining: Mutex::new(n),
            ..Default::default()
        }
    }

    /// Fail every connect attempt.
    pub fn always_failing() -> Self {
        let transport = Self::new();
        transport.always_fail.store(true, Ordering::Relaxed);
        transport
    }

    /// Number of connect attempts made so far.
    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::Relaxed)
    }

    /// Force the reported link state, e.g. to simulate a dropped connection.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Topics subscribed so far.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = MockTransportError;

    async fn connect(&self) -> Result<(), Self::Error> {
        self.connect_calls.fetch_add(1, Ordering::Relaxed);

        if self.always_fail.load(Ordering::Relaxed) {
            return Err(MockTransportError);
        }

        {
            let mut remaining = self.failures_remaining.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(MockTransportError);
            }
        }

        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), Self::Error> {
        self.subscriptions.lock().unwrap().push(topic.to_string());
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn connection_state(&self) -> ConnectionState {
        if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected("mock".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_default_succeeds() {
        let transport = MockTransport::new();
        assert!(!transport.is_connected());
        assert!(transport.connect().await.is_ok());
        assert!(transport.is_connected());
        assert_eq!(transport.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_transport_scripted_failures() {
        let transport = MockTransport::failing_times(2);
        assert!(transport.connect().await.is_err());
        assert!(transport.connect().await.is_err());
        assert!(transport.connect().await.is_ok());
        assert_eq!(transport.connect_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_transport_records_subscriptions() {
        let transport = MockTransport::new();
        transport.subscribe("/test").await.unwrap();
        assert_eq!(transport.subscriptions(), vec!["/test"]);
    }
}
