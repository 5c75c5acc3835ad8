//! Bundled sample database.
//!
//! When no databases are configured the gateway serves a small SQLite file
//! holding the `world` table, so it is usable out of the box.

use crate::error::{DbError, DbResult};
use crate::models::DatabaseDescriptor;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Schema and rows of the sample database.
pub const WORLD_SQL: &str = include_str!("../data/world.sql");

pub const SAMPLE_FILE_NAME: &str = "world.sqlite";

pub const SAMPLE_ALIAS: &str = "default";

/// Default directory for the sample file.
pub fn default_dir() -> PathBuf {
    std::env::temp_dir().join("db-query-gateway")
}

/// Create `dir/world.sqlite` unless it already exists, and return its path.
pub fn materialize(dir: &Path) -> DbResult<PathBuf> {
    let path = dir.join(SAMPLE_FILE_NAME);
    if path.exists() {
        debug!(path = %path.display(), "Sample database already present");
        return Ok(path);
    }

    std::fs::create_dir_all(dir).map_err(|e| {
        DbError::configuration(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    // Built under a temporary name; world.sqlite only ever appears complete
    let partial = dir.join(format!("{SAMPLE_FILE_NAME}.partial"));
    if partial.exists() {
        std::fs::remove_file(&partial).map_err(|e| {
            DbError::configuration(format!("Failed to remove {}: {}", partial.display(), e))
        })?;
    }

    let conn = Connection::open(&partial)?;
    conn.execute_batch(WORLD_SQL)?;
    conn.close().map_err(|(_, e)| DbError::from(e))?;

    std::fs::rename(&partial, &path).map_err(|e| {
        DbError::configuration(format!("Failed to create {}: {}", path.display(), e))
    })?;

    info!(path = %path.display(), "Created sample database");
    Ok(path)
}

/// Descriptor registering the sample file under the "default" alias.
pub fn descriptor(path: &Path) -> DatabaseDescriptor {
    DatabaseDescriptor::new("sqlite", path.to_string_lossy()).with_alias(SAMPLE_ALIAS)
}
