//! Blocking SQLite engine.
//!
//! A small checkout/checkin pool of `rusqlite` connections. Every call on this
//! type blocks; async callers go through `tokio::task::spawn_blocking`.

use crate::db::driver::DriverError;
use crate::db::url::ConnectionUrl;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Idle connections kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 4;

/// How long a statement waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    idle: Mutex<Vec<Connection>>,
    max_idle: usize,
}

impl SyncEngine {
    /// Prepare an engine for the SQLite file named by `url`. Opens nothing.
    pub fn open(url: &ConnectionUrl) -> Result<Self, DriverError> {
        if url.db_type() != Some(DatabaseType::SQLite) {
            return Err(DriverError::not_installed(
                url,
                url.driver().unwrap_or("<default sync>"),
            ));
        }
        if url.host().is_some() || url.port().is_some() {
            return Err(DriverError::other(format!(
                "{url}: SQLite databases are files; host and port are not supported"
            )));
        }
        if url.database().trim().is_empty() {
            return Err(DriverError::other(format!("{url}: database path is required")));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                path: PathBuf::from(url.database()),
                idle: Mutex::new(Vec::new()),
                max_idle: DEFAULT_MAX_IDLE,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Run `f` with a pooled connection, returning it to the pool afterwards.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> DbResult<T>) -> DbResult<T> {
        let conn = match self.checkout() {
            Some(conn) => conn,
            None => self.connect()?,
        };
        let result = f(&conn);
        self.checkin(conn);
        result
    }

    /// Drop every idle connection.
    pub fn close(&self) {
        if let Ok(mut idle) = self.inner.idle.lock() {
            idle.clear();
        }
    }

    fn connect(&self) -> DbResult<Connection> {
        debug!(path = %self.inner.path.display(), "Opening SQLite connection");
        // No SQLITE_OPEN_CREATE: a missing file is an error, not a new database
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.inner.path, flags).map_err(|e| {
            DbError::connection(
                format!("Failed to open {}: {}", self.inner.path.display(), e),
                "Verify the database file exists and is readable",
            )
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    fn checkout(&self) -> Option<Connection> {
        self.inner.idle.lock().ok()?.pop()
    }

    fn checkin(&self, conn: Connection) {
        if let Ok(mut idle) = self.inner.idle.lock() {
            if idle.len() < self.inner.max_idle {
                idle.push(conn);
            }
        }
    }

    #[cfg(test)]
    fn idle_count(&self) -> usize {
        self.inner.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }
}

impl fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("path", &self.inner.path)
            .field("max_idle", &self.inner.max_idle)
            .finish()
    }
}
