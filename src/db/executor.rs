//! Query execution.
//!
//! Runs caller SQL verbatim against a registered engine and normalizes the
//! result rows. Database-specific implementations live in submodules:
//! - `mysql`, `postgres`, `sqlite`: async sqlx pools
//! - `blocking`: rusqlite connections, called from the blocking thread pool
//!
//! Each call checks out one connection, runs the statement and returns the
//! connection to its pool, whether the statement succeeded or not.

use crate::db::engine::{AsyncEngine, connection_suggestion};
use crate::db::sync_engine::SyncEngine;
use crate::db::types::{RowToJson, sqlite_value_to_json};
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, Row};
use sqlx::Executor;

/// Executes caller SQL against engines.
pub struct QueryExecutor;

impl QueryExecutor {
    /// Execute `sql` on an async engine and collect every row.
    pub async fn fetch_all(engine: &AsyncEngine, sql: &str) -> DbResult<Vec<Row>> {
        impl_db_dispatch!(engine, {
            MySql(p) => mysql::fetch_rows(p, sql).await,
            Postgres(p) => postgres::fetch_rows(p, sql).await,
            SQLite(p) => sqlite::fetch_rows(p, sql).await,
        })
    }

    /// Execute `sql` on a blocking engine. Must not run on an async worker thread.
    pub fn fetch_all_blocking(engine: &SyncEngine, sql: &str) -> DbResult<Vec<Row>> {
        engine.with_connection(|conn| blocking::fetch_rows(conn, sql))
    }
}

fn acquire_error(db_type: DatabaseType, err: sqlx::Error) -> DbError {
    match err {
        sqlx::Error::PoolClosed => err.into(),
        err => DbError::connection(
            format!("Failed to connect: {}", err),
            connection_suggestion(db_type, &err),
        ),
    }
}

fn normalize<R: RowToJson>(rows: &[R]) -> Vec<Row> {
    rows.iter().map(RowToJson::to_json_map).collect()
}

mod mysql {
    use super::*;
    use sqlx::MySqlPool;

    pub async fn fetch_rows(pool: &MySqlPool, sql: &str) -> DbResult<Vec<Row>> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| acquire_error(DatabaseType::MySQL, e))?;
        let rows = (&mut *conn).fetch_all(sql).await?;
        Ok(normalize(&rows))
    }
}

mod postgres {
    use super::*;
    use sqlx::PgPool;

    pub async fn fetch_rows(pool: &PgPool, sql: &str) -> DbResult<Vec<Row>> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| acquire_error(DatabaseType::PostgreSQL, e))?;
        let rows = (&mut *conn).fetch_all(sql).await?;
        Ok(normalize(&rows))
    }
}

mod sqlite {
    use super::*;
    use sqlx::SqlitePool;

    pub async fn fetch_rows(pool: &SqlitePool, sql: &str) -> DbResult<Vec<Row>> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| acquire_error(DatabaseType::SQLite, e))?;
        let rows = (&mut *conn).fetch_all(sql).await?;
        Ok(normalize(&rows))
    }
}

mod blocking {
    use super::*;
    use rusqlite::Connection;

    pub fn fetch_rows(conn: &Connection, sql: &str) -> DbResult<Vec<Row>> {
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<(String, Option<String>)> = stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.decl_type().map(String::from)))
            .collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut map = Row::with_capacity(columns.len());
            for (idx, (name, decl_type)) in columns.iter().enumerate() {
                let value = sqlite_value_to_json(row.get_ref(idx)?, decl_type.as_deref());
                map.insert(name.clone(), value);
            }
            out.push(map);
        }
        Ok(out)
    }
}
