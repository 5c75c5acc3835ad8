//! Transport layer for the gateway.
//!
//! This module provides the two ways the registry is exposed:
//! - HTTP: JSON endpoints under a configurable base path
//! - Stdio: MCP tools over standard input/output for CLI integration

pub mod http;
pub mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use crate::error::{DbError, DbResult};
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tracing::info;

/// Trait for transport implementations.
///
/// Transports handle the low-level communication between the gateway and
/// clients, abstracting away the protocol details.
pub trait Transport: Send + Sync {
    /// Start the transport and begin handling requests.
    ///
    /// This method should block until the transport is shut down.
    fn run(&self) -> impl Future<Output = DbResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}

/// Bound a registry call by the caller-level timeout.
///
/// Blocking SQLite work keeps running on its thread after the deadline; only
/// the caller stops waiting.
pub async fn with_timeout<T>(
    limit: Duration,
    operation: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    tokio::time::timeout(limit, operation)
        .await
        .unwrap_or_else(|_| Err(DbError::timeout("query execution", limit.as_secs())))
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub(crate) async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_passes_result_through() {
        let value = with_timeout(Duration::from_secs(1), async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let err = with_timeout(Duration::from_secs(2), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DbError::Timeout { elapsed_secs: 2, .. }));
    }
}
