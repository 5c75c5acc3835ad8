//! Driver catalog and engine construction.
//!
//! A driver is the library that talks to an engine family. `sqlx` drives every
//! supported family asynchronously; `rusqlite` is the blocking SQLite driver
//! and doubles as the fallback when no async driver can be used.
//!
//! Engine construction goes through the [`EngineFactory`] trait so tests can
//! substitute their own availability rules.

use crate::db::engine::AsyncEngine;
use crate::db::sync_engine::SyncEngine;
use crate::db::url::ConnectionUrl;
use thiserror::Error;

pub const SQLX: &str = "sqlx";
pub const RUSQLITE: &str = "rusqlite";

/// How a driver executes statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Async,
    /// Blocking calls, offloaded to the blocking thread pool
    Sync,
}

/// A driver known to this build.
#[derive(Debug)]
pub struct DriverInfo {
    pub name: &'static str,
    pub mode: ExecutionMode,
    /// Engine kinds this driver can open
    pub kinds: &'static [&'static str],
}

impl DriverInfo {
    pub fn supports(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k.eq_ignore_ascii_case(kind))
    }
}

const DRIVERS: &[DriverInfo] = &[
    DriverInfo {
        name: SQLX,
        mode: ExecutionMode::Async,
        kinds: &["sqlite", "postgres", "postgresql", "mysql", "mariadb"],
    },
    DriverInfo {
        name: RUSQLITE,
        mode: ExecutionMode::Sync,
        kinds: &["sqlite"],
    },
];

/// Look up a driver by name.
pub fn lookup(name: &str) -> Option<&'static DriverInfo> {
    DRIVERS.iter().find(|d| d.name.eq_ignore_ascii_case(name.trim()))
}

/// Async drivers to try for `kind`, in preference order.
pub fn async_candidates(kind: &str) -> Vec<&'static str> {
    DRIVERS
        .iter()
        .filter(|d| d.mode == ExecutionMode::Async && d.supports(kind))
        .map(|d| d.name)
        .collect()
}

/// Blocking driver used for `kind` when the URL names none.
pub fn default_sync_driver(kind: &str) -> Option<&'static str> {
    DRIVERS
        .iter()
        .find(|d| d.mode == ExecutionMode::Sync && d.supports(kind))
        .map(|d| d.name)
}

/// Why an engine could not be built for a URL.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver is unknown, or cannot open this kind of database.
    #[error("driver '{driver}' is not available for '{kind}' databases")]
    NotInstalled { kind: String, driver: String },

    #[error("driver '{driver}' does not support asynchronous execution")]
    NotAsyncCapable { driver: String },

    #[error("{message}")]
    Other { message: String },
}

impl DriverError {
    pub fn not_installed(url: &ConnectionUrl, driver: impl Into<String>) -> Self {
        Self::NotInstalled {
            kind: url.kind().to_string(),
            driver: driver.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Builds engines for connection URLs.
///
/// Implementations must not open connections here; engines connect on first use.
pub trait EngineFactory: Send + Sync {
    fn create_async_engine(&self, url: &ConnectionUrl) -> Result<AsyncEngine, DriverError>;

    fn create_sync_engine(&self, url: &ConnectionUrl) -> Result<SyncEngine, DriverError>;
}

/// Factory backed by the drivers compiled into this build.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEngineFactory;

impl DefaultEngineFactory {
    fn driver_for(
        url: &ConnectionUrl,
        mode: ExecutionMode,
    ) -> Result<&'static DriverInfo, DriverError> {
        let name = match (url.driver(), mode) {
            (Some(name), _) => name,
            (None, ExecutionMode::Sync) => default_sync_driver(url.kind())
                .ok_or_else(|| DriverError::not_installed(url, "<default sync>"))?,
            (None, ExecutionMode::Async) => {
                return Err(DriverError::not_installed(url, "<none>"));
            }
        };

        lookup(name)
            .filter(|info| info.supports(url.kind()))
            .ok_or_else(|| DriverError::not_installed(url, name))
    }
}

impl EngineFactory for DefaultEngineFactory {
    fn create_async_engine(&self, url: &ConnectionUrl) -> Result<AsyncEngine, DriverError> {
        let info = Self::driver_for(url, ExecutionMode::Async)?;
        if info.mode != ExecutionMode::Async {
            return Err(DriverError::NotAsyncCapable {
                driver: info.name.to_string(),
            });
        }
        AsyncEngine::connect_lazy(url)
    }

    fn create_sync_engine(&self, url: &ConnectionUrl) -> Result<SyncEngine, DriverError> {
        let info = Self::driver_for(url, ExecutionMode::Sync)?;
        if info.mode != ExecutionMode::Sync {
            return Err(DriverError::other(format!(
                "driver '{}' has no synchronous mode",
                info.name
            )));
        }
        SyncEngine::open(url)
    }
}
