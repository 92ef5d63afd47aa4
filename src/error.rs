//! Top-level error types for subscriber operations
//!
//! Transient conditions (a failed connect attempt, a malformed message, an
//! invalid selection token) are handled where they occur and never reach this
//! type. What remains here is the startup-fatal retry exhaustion plus the
//! errors surfaced by the outer operations (subscribe, export, config).

use thiserror::Error;

/// Main error type for subscriber operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The initial connect retry budget ran out. The one unrecoverable error:
    /// without a connection no telemetry can ever be received.
    #[error("failed to reach broker after {attempts} connection attempts")]
    ConnectionExhausted { attempts: u32 },

    #[error("Transport error: {0}")]
    Transport(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("CSV export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Wrap a transport error for propagation.
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport(Box::new(error))
    }
}

/// Result type for subscriber operations.
pub type ClientResult<T> = Result<T, ClientError>;
