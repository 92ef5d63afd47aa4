//! Integration tests for the connection lifecycle
//!
//! Drives the application against a mock transport: startup retry with linear
//! backoff, fatal exhaustion, and watchdog-driven reconnection after a
//! dropped link.

use beaconwatch::config::SubscriberConfig;
use beaconwatch::error::ClientError;
use beaconwatch::supervisor::{ConnectionSupervisor, RetryPolicy};
use beaconwatch::testing::mocks::MockTransport;
use beaconwatch::SubscriberApp;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

fn test_config() -> SubscriberConfig {
    toml::from_str(
        r#"
[broker]
url = "mqtt://localhost:1883"

[telemetry]
topic = "/gateway/telemetry"
display_live = false

[connection]
max_attempts = 3
backoff_unit_secs = 1
watchdog_interval_secs = 1
"#,
    )
    .expect("test config should parse")
}

#[tokio::test(start_paused = true)]
async fn test_startup_retry_timing_is_linear() {
    let transport = Arc::new(MockTransport::failing_times(3));
    let supervisor = ConnectionSupervisor::new(Arc::clone(&transport));
    let start = Instant::now();

    supervisor
        .connect_with_retry(&RetryPolicy {
            max_attempts: 5,
            backoff_unit: Duration::from_secs(1),
        })
        .await
        .expect("fourth attempt should succeed");

    // Waits of 1s, 2s, 3s after the three failures.
    assert_eq!(start.elapsed(), Duration::from_secs(6));
    assert_eq!(transport.connect_calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_startup_exhaustion_is_fatal() {
    let transport = Arc::new(MockTransport::always_failing());
    let mut app = SubscriberApp::with_transport(test_config(), Arc::clone(&transport));
    let (_payload_tx, payload_rx) = mpsc::channel(8);

    let result = app.start(payload_rx).await;

    assert!(matches!(
        result,
        Err(ClientError::ConnectionExhausted { attempts: 3 })
    ));
    assert_eq!(transport.connect_calls(), 3);
    assert!(!app.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_recovers_dropped_link() {
    let transport = Arc::new(MockTransport::new());
    let mut app = SubscriberApp::with_transport(test_config(), Arc::clone(&transport));
    let (_payload_tx, payload_rx) = mpsc::channel(8);

    app.start(payload_rx).await.unwrap();
    assert!(app.is_connected());
    assert_eq!(transport.connect_calls(), 1);

    // Simulate the broker dropping the link.
    transport.set_connected(false);
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(app.is_connected(), "watchdog should have reconnected");
    assert_eq!(transport.connect_calls(), 2);

    app.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_keeps_polling_through_failed_reconnects() {
    let transport = Arc::new(MockTransport::always_failing());
    transport.set_connected(false);
    let supervisor = ConnectionSupervisor::new(Arc::clone(&transport));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = supervisor.spawn_watchdog(Duration::from_secs(1), shutdown_rx);

    tokio::time::sleep(Duration::from_millis(5500)).await;

    // One attempt per tick; the task is still alive.
    assert_eq!(transport.connect_calls(), 5);
    assert!(!handle.is_finished());

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}
