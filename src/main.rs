//! DB Query Gateway - Main entry point.
//!
//! Registers the configured databases (or the bundled sample) and serves them
//! over the selected transport.

use db_query_gateway::config::{Config, TransportMode};
use db_query_gateway::db::Registry;
use db_query_gateway::sample;
use db_query_gateway::transport::{HttpTransport, StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so stdout stays free for the stdio transport.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Register every configured database, falling back to the sample file.
fn build_registry(config: &Config) -> Result<Registry, Box<dyn std::error::Error>> {
    let mut descriptors = config.load_descriptors()?;

    if descriptors.is_empty() {
        let dir = config.sample_dir();
        info!(dir = %dir.display(), "No databases configured, serving the sample database");
        let path = sample::materialize(&dir)?;
        descriptors.push(sample::descriptor(&path));
    }

    let mut registry = Registry::new();
    for (index, descriptor) in descriptors.iter().enumerate() {
        let label = descriptor
            .alias
            .clone()
            .unwrap_or_else(|| format!("#{index}"));

        registry.add_database(descriptor).map_err(|e| {
            error!(database = %label, error = %e, "Failed to register database");
            format!("Failed to register database {label}: {e}")
        })?;
    }

    Ok(registry)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse_args();

    if config.logging_enabled() {
        init_tracing(&config);
    }

    info!(
        transport = %config.transport,
        "Starting DB Query Gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let registry = Arc::new(build_registry(&config)?);
    info!(count = registry.len(), "Databases registered");

    let result = match config.transport {
        TransportMode::Stdio => {
            let transport = StdioTransport::new(registry, config.query_timeout_duration());
            transport.run().await
        }
        TransportMode::Http => {
            let base_path = config.normalized_base_path();
            info!(
                addr = %config.http_bind_addr(),
                base_path = %base_path,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                registry,
                &config.http_host,
                config.http_port,
                base_path,
                config.query_timeout_duration(),
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
