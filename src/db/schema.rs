//! Schema introspection module.
//!
//! Lists table names and column names for SQLite, PostgreSQL and MySQL.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite, blocking), each providing the same interface.

use crate::db::engine::AsyncEngine;
use crate::db::sync_engine::SyncEngine;
use crate::error::{DbError, DbResult};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List base tables, ordered by name.
    pub async fn list_tables(engine: &AsyncEngine) -> DbResult<Vec<String>> {
        impl_db_dispatch!(engine, {
            MySql(p) => mysql::list_tables(p).await,
            Postgres(p) => postgres::list_tables(p).await,
            SQLite(p) => sqlite::list_tables(p).await,
        })
    }

    /// List the columns of `table`, sorted by name.
    pub async fn list_columns(engine: &AsyncEngine, table: &str) -> DbResult<Vec<String>> {
        let names = impl_db_dispatch!(engine, {
            MySql(p) => mysql::list_columns(p, table).await?,
            Postgres(p) => postgres::list_columns(p, table).await?,
            SQLite(p) => sqlite::list_columns(p, table).await?,
        });
        sorted_columns(table, names)
    }

    /// Blocking variant of [`SchemaInspector::list_tables`].
    pub fn list_tables_blocking(engine: &SyncEngine) -> DbResult<Vec<String>> {
        engine.with_connection(blocking::list_tables)
    }

    /// Blocking variant of [`SchemaInspector::list_columns`].
    pub fn list_columns_blocking(engine: &SyncEngine, table: &str) -> DbResult<Vec<String>> {
        let names = engine.with_connection(|conn| blocking::list_columns(conn, table))?;
        sorted_columns(table, names)
    }
}

/// Engines report no columns for a table that does not exist.
fn sorted_columns(table: &str, mut names: Vec<String>) -> DbResult<Vec<String>> {
    if names.is_empty() {
        return Err(DbError::schema(
            format!("Table '{}' not found or has no columns", table),
            table,
        ));
    }
    names.sort();
    debug!(table = %table, columns = names.len(), "Listed columns");
    Ok(names)
}

// =============================================================================
// SQL Queries
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_schema = current_schema()
            AND table_name = $1
            "#;
    }

    pub mod mysql {
        // CONVERT: information_schema reports names with binary collation on some servers
        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8mb4) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const LIST_COLUMNS: &str = r#"
            SELECT CONVERT(COLUMN_NAME USING utf8mb4) AS COLUMN_NAME
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_NAME = ?
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND substr(name, 1, 7) <> 'sqlite_'
            ORDER BY name
            "#;

        pub const LIST_COLUMNS: &str = "SELECT name FROM pragma_table_info(?1)";
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::PgPool;

    pub async fn list_tables(pool: &PgPool) -> DbResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?)
    }

    pub async fn list_columns(pool: &PgPool, table: &str) -> DbResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(queries::postgres::LIST_COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?)
    }
}

mod mysql {
    use super::*;
    use sqlx::MySqlPool;

    pub async fn list_tables(pool: &MySqlPool) -> DbResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?)
    }

    pub async fn list_columns(pool: &MySqlPool, table: &str) -> DbResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(queries::mysql::LIST_COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?)
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;

    pub async fn list_tables(pool: &SqlitePool) -> DbResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?)
    }

    pub async fn list_columns(pool: &SqlitePool, table: &str) -> DbResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(queries::sqlite::LIST_COLUMNS)
            .bind(table)
            .fetch_all(pool)
            .await?)
    }
}

mod blocking {
    use super::*;
    use rusqlite::Connection;

    pub fn list_tables(conn: &Connection) -> DbResult<Vec<String>> {
        let mut stmt = conn.prepare(queries::sqlite::LIST_TABLES)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn list_columns(conn: &Connection, table: &str) -> DbResult<Vec<String>> {
        let mut stmt = conn.prepare(queries::sqlite::LIST_COLUMNS)?;
        let names = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::url::ConnectionUrl;
    use crate::models::DatabaseDescriptor;

    fn seeded_file(dir: &std::path::Path) -> String {
        let path = dir.join("schema.sqlite");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE zebra (b TEXT, a TEXT, \"Z col\" INTEGER);
             CREATE TABLE apple (id INTEGER PRIMARY KEY);
             CREATE TABLE sqlite1 (id INTEGER);
             CREATE TABLE sqlitedata (id INTEGER);
             CREATE VIEW v_apple AS SELECT * FROM apple;",
        )
        .unwrap();
        path.to_string_lossy().into_owned()
    }

    fn url(path: &str, driver: &str) -> ConnectionUrl {
        ConnectionUrl::from_descriptor(&DatabaseDescriptor::new("sqlite", path), Some(driver))
    }

    #[test]
    fn test_blocking_tables_exclude_views() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SyncEngine::open(&url(&seeded_file(dir.path()), "rusqlite")).unwrap();

        let tables = SchemaInspector::list_tables_blocking(&engine).unwrap();
        assert_eq!(tables, ["apple", "sqlite1", "sqlitedata", "zebra"]);
    }

    #[test]
    fn test_blocking_tables_hide_only_reserved_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path());
        // AUTOINCREMENT creates the internal sqlite_sequence table
        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE counter (id INTEGER PRIMARY KEY AUTOINCREMENT)")
            .unwrap();
        let engine = SyncEngine::open(&url(&path, "rusqlite")).unwrap();

        let tables = SchemaInspector::list_tables_blocking(&engine).unwrap();
        assert!(tables.contains(&"sqlite1".to_string()));
        assert!(tables.contains(&"sqlitedata".to_string()));
        assert!(!tables.iter().any(|t| t.starts_with("sqlite_")));
    }

    #[test]
    fn test_blocking_columns_sorted_case_sensitively() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SyncEngine::open(&url(&seeded_file(dir.path()), "rusqlite")).unwrap();

        let columns = SchemaInspector::list_columns_blocking(&engine, "zebra").unwrap();
        assert_eq!(columns, ["Z col", "a", "b"]);
    }

    #[test]
    fn test_blocking_unknown_table_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = SyncEngine::open(&url(&seeded_file(dir.path()), "rusqlite")).unwrap();

        let err = SchemaInspector::list_columns_blocking(&engine, "missing").unwrap_err();
        assert!(matches!(err, DbError::Schema { .. }));
    }

    #[tokio::test]
    async fn test_async_schema_matches_blocking() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_file(dir.path());
        let async_engine = AsyncEngine::connect_lazy(&url(&path, "sqlx")).unwrap();
        let sync_engine = SyncEngine::open(&url(&path, "rusqlite")).unwrap();

        let tables = SchemaInspector::list_tables(&async_engine).await.unwrap();
        assert_eq!(tables, ["apple", "sqlite1", "sqlitedata", "zebra"]);
        assert_eq!(tables, SchemaInspector::list_tables_blocking(&sync_engine).unwrap());
        assert_eq!(
            SchemaInspector::list_columns(&async_engine, "zebra").await.unwrap(),
            SchemaInspector::list_columns_blocking(&sync_engine, "zebra").unwrap()
        );
        async_engine.close().await;
    }
}
