//! Connection supervision: startup retry and the reconnect watchdog
//!
//! The supervisor owns the retry policy around a [`Transport`]. Startup goes
//! through [`connect_with_retry`](ConnectionSupervisor::connect_with_retry)
//! with linear backoff; after that a watchdog task polls the link and repairs
//! it with single reconnect attempts. Both paths take the same attempt lock
//! so only one connection attempt is ever in flight against the transport.

use crate::error::{ClientError, ClientResult};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Startup retry policy: linear backoff, wait `attempt * backoff_unit`
/// after the Nth failed attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    /// Backoff delay after the given failed attempt (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

/// Supervises the connection lifecycle of a transport.
pub struct ConnectionSupervisor<T: Transport + 'static> {
    transport: Arc<T>,
    attempt_lock: Arc<Mutex<()>>,
}

impl<T: Transport + 'static> ConnectionSupervisor<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            attempt_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The supervised transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Establish the initial connection, retrying with linear backoff.
    ///
    /// Exhausting the budget is the one fatal error in the system: without a
    /// connection no telemetry can ever arrive, so startup must abort.
    pub async fn connect_with_retry(&self, policy: &RetryPolicy) -> ClientResult<()> {
        let _guard = self.attempt_lock.lock().await;

        for attempt in 1..=policy.max_attempts {
            match self.transport.connect().await {
                Ok(()) => {
                    info!(attempt, "broker connection established");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, error = %e, "connection attempt failed");
                    if attempt < policy.max_attempts {
                        let delay = policy.backoff_delay(attempt);
                        info!(delay_secs = delay.as_secs_f64(), "retrying after backoff");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(ClientError::ConnectionExhausted {
            attempts: policy.max_attempts,
        })
    }

    /// Spawn the reconnect watchdog.
    ///
    /// Each tick: if the transport reports disconnected, make exactly one
    /// reconnect attempt and log the outcome. There is no backoff here; the
    /// poll interval already throttles retries. The task never terminates on
    /// a reconnect failure, only through the shutdown channel.
    pub fn spawn_watchdog(
        &self,
        poll_interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let attempt_lock = Arc::clone(&self.attempt_lock);

        tokio::spawn(async move {
            info!(
                poll_interval_secs = poll_interval.as_secs_f64(),
                "connection watchdog started"
            );
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        if !transport.is_connected() {
                            warn!("broker connection lost, attempting reconnect");
                            let _guard = attempt_lock.lock().await;
                            match transport.connect().await {
                                Ok(()) => info!("reconnected to broker"),
                                Err(e) => {
                                    warn!(error = %e, "reconnect failed, will retry on next tick");
                                }
                            }
                        }
                    }
                }
            }
            info!("connection watchdog stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockTransport;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_succeeds_first_attempt() {
        let transport = Arc::new(MockTransport::new());
        let supervisor = ConnectionSupervisor::new(Arc::clone(&transport));

        let result = supervisor
            .connect_with_retry(&RetryPolicy::default())
            .await;
        assert!(result.is_ok());
        assert_eq!(transport.connect_calls(), 1);
        assert!(transport.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_recovers_after_failures() {
        let transport = Arc::new(MockTransport::failing_times(2));
        let supervisor = ConnectionSupervisor::new(Arc::clone(&transport));

        let result = supervisor
            .connect_with_retry(&RetryPolicy {
                max_attempts: 5,
                backoff_unit: Duration::from_secs(1),
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(transport.connect_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_with_retry_exhaustion_timing() {
        let transport = Arc::new(MockTransport::always_failing());
        let supervisor = ConnectionSupervisor::new(Arc::clone(&transport));
        let start = Instant::now();

        let result = supervisor
            .connect_with_retry(&RetryPolicy {
                max_attempts: 3,
                backoff_unit: Duration::from_secs(1),
            })
            .await;

        // Exactly 3 attempts with waits of 1 and 2 units between them.
        assert!(matches!(
            result,
            Err(ClientError::ConnectionExhausted { attempts: 3 })
        ));
        assert_eq!(transport.connect_calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_single_reconnect_attempt() {
        // Disconnected on the first tick, connected after the reconnect: the
        // following ticks observe a healthy link and stay idle.
        let transport = Arc::new(MockTransport::new());
        transport.set_connected(false);
        let supervisor = ConnectionSupervisor::new(Arc::clone(&transport));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = supervisor.spawn_watchdog(Duration::from_secs(1), shutdown_rx);

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(transport.connect_calls(), 1);
        assert!(transport.is_connected());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_survives_reconnect_failures() {
        let transport = Arc::new(MockTransport::always_failing());
        transport.set_connected(false);
        let supervisor = ConnectionSupervisor::new(Arc::clone(&transport));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = supervisor.spawn_watchdog(Duration::from_secs(1), shutdown_rx);

        tokio::time::sleep(Duration::from_millis(3500)).await;

        // One attempt per tick, no termination on failure.
        assert_eq!(transport.connect_calls(), 3);
        assert!(!handle.is_finished());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_idle_while_connected() {
        let transport = Arc::new(MockTransport::new());
        transport.set_connected(true);
        let supervisor = ConnectionSupervisor::new(Arc::clone(&transport));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = supervisor.spawn_watchdog(Duration::from_secs(1), shutdown_rx);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(transport.connect_calls(), 0);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_watchdog_stops_on_shutdown_signal() {
        let transport = Arc::new(MockTransport::new());
        let supervisor = ConnectionSupervisor::new(transport);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = supervisor.spawn_watchdog(Duration::from_secs(60), shutdown_rx);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watchdog should stop promptly")
            .unwrap();
    }

    #[test]
    fn test_backoff_delay_is_linear() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff_unit: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(400));
    }
}
