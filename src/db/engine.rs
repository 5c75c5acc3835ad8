//! Execution engines.
//!
//! An engine is the live handle used to run statements against one registered
//! database. Async engines are database-specific sqlx pools (avoiding AnyPool
//! limitations); sync engines wrap blocking SQLite connections.
//!
//! Engines are built lazily: no connection is opened until the first query.

use crate::db::driver::DriverError;
use crate::db::sync_engine::SyncEngine;
use crate::db::url::ConnectionUrl;
use crate::models::DatabaseType;
use sqlx::{
    MySqlPool, PgPool, SqlitePool, mysql::MySqlConnectOptions, mysql::MySqlPoolOptions,
    postgres::PgConnectOptions, postgres::PgPoolOptions, sqlite::SqliteConnectOptions,
    sqlite::SqlitePoolOptions,
};
use std::time::Duration;

/// Default maximum pooled connections for server databases.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// SQLite serializes writers; keep its pool small.
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 2;

/// Default pool acquire timeout in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Live handle for one registered database.
#[derive(Debug, Clone)]
pub enum Engine {
    Async(AsyncEngine),
    Sync(SyncEngine),
}

impl Engine {
    pub fn is_async(&self) -> bool {
        matches!(self, Engine::Async(_))
    }

    pub async fn close(&self) {
        match self {
            Engine::Async(engine) => engine.close().await,
            Engine::Sync(engine) => engine.close(),
        }
    }
}

/// Database-specific async connection pool.
#[derive(Debug, Clone)]
pub enum AsyncEngine {
    MySql(MySqlPool),
    Postgres(PgPool),
    SQLite(SqlitePool),
}

impl AsyncEngine {
    /// Build a pool for `url` without connecting.
    ///
    /// Must be called from within a Tokio runtime: the pool spawns its
    /// idle-reaping task immediately.
    pub fn connect_lazy(url: &ConnectionUrl) -> Result<Self, DriverError> {
        let db_type = url
            .db_type()
            .ok_or_else(|| DriverError::not_installed(url, url.driver().unwrap_or("<none>")))?;

        if url.database().trim().is_empty() {
            return Err(DriverError::other(format!("{url}: database name is required")));
        }

        let acquire_timeout = Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS);
        let idle_timeout = Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS));

        match db_type {
            DatabaseType::MySQL => {
                let mut options = MySqlConnectOptions::new()
                    .host(url.host().unwrap_or("localhost"))
                    .port(url.port().or(db_type.default_port()).unwrap_or(3306))
                    .database(url.database())
                    .charset("utf8mb4");
                if let Some(user) = url.username() {
                    options = options.username(user);
                }
                if let Some(password) = url.password() {
                    options = options.password(password);
                }

                let pool = MySqlPoolOptions::new()
                    .min_connections(0)
                    .max_connections(DEFAULT_MAX_CONNECTIONS)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(idle_timeout)
                    .connect_lazy_with(options);
                Ok(AsyncEngine::MySql(pool))
            }
            DatabaseType::PostgreSQL => {
                let mut options = PgConnectOptions::new()
                    .host(url.host().unwrap_or("localhost"))
                    .port(url.port().or(db_type.default_port()).unwrap_or(5432))
                    .database(url.database());
                if let Some(user) = url.username() {
                    options = options.username(user);
                }
                if let Some(password) = url.password() {
                    options = options.password(password);
                }

                let pool = PgPoolOptions::new()
                    .min_connections(0)
                    .max_connections(DEFAULT_MAX_CONNECTIONS)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(idle_timeout)
                    .connect_lazy_with(options);
                Ok(AsyncEngine::Postgres(pool))
            }
            DatabaseType::SQLite => {
                if url.host().is_some() || url.port().is_some() {
                    return Err(DriverError::other(format!(
                        "{url}: SQLite databases are files; host and port are not supported"
                    )));
                }

                let options = SqliteConnectOptions::new()
                    .filename(url.database())
                    .create_if_missing(false);

                let pool = SqlitePoolOptions::new()
                    .min_connections(0)
                    .max_connections(DEFAULT_MAX_CONNECTIONS_SQLITE)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(idle_timeout)
                    .connect_lazy_with(options);
                Ok(AsyncEngine::SQLite(pool))
            }
        }
    }

    /// Close the connection pool.
    pub async fn close(&self) {
        impl_db_dispatch!(self, {
            MySql(pool) => pool.close().await,
            Postgres(pool) => pool.close().await,
            SQLite(pool) => pool.close().await,
        })
    }

    /// Get the database type for this engine.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            AsyncEngine::MySql(_) => DatabaseType::MySQL,
            AsyncEngine::Postgres(_) => DatabaseType::PostgreSQL,
            AsyncEngine::SQLite(_) => DatabaseType::SQLite,
        }
    }
}

/// Suggest a fix for a failed connection attempt.
pub fn connection_suggestion(db_type: DatabaseType, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!("Check that the {} server is running and accessible", db_type);
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the username and password for this database".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match db_type {
        DatabaseType::SQLite => "Verify the database file exists and is readable".to_string(),
        _ => format!("Verify the host, port and database name for this {} database", db_type),
    }
}
