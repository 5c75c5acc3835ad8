//! Database registry.
//!
//! Registration happens once at startup; afterwards the registry is shared
//! read-only (`Arc<Registry>`) by every request handler. Ids are assigned
//! densely from 0 in registration order.

use crate::db::driver::EngineFactory;
use crate::db::engine::Engine;
use crate::db::executor::QueryExecutor;
use crate::db::resolver::DriverResolver;
use crate::db::schema::SchemaInspector;
use crate::db::url::ConnectionUrl;
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseDescriptor, Row, SchemaTarget};
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Public view of a registered database (no secrets exposed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DatabaseSummary {
    /// Database identifier. Use this value as `id` in execute and get_schema.
    pub id: usize,
    pub alias: String,
    /// Database name, or file path for SQLite
    pub database: String,
    /// Driver tag: "kind" or "kind+driver"
    pub driver: String,
    /// If false, queries run on the blocking thread pool
    pub is_async: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// One registered database and its engine.
#[derive(Debug)]
pub struct RegisteredDatabase {
    id: usize,
    alias: String,
    url: ConnectionUrl,
    engine: Engine,
}

impl RegisteredDatabase {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn is_async(&self) -> bool {
        self.engine.is_async()
    }

    pub fn summary(&self) -> DatabaseSummary {
        DatabaseSummary {
            id: self.id,
            alias: self.alias.clone(),
            database: self.url.database().to_string(),
            driver: self.url.driver_tag(),
            is_async: self.is_async(),
            host: self.url.host().map(String::from),
            port: self.url.port(),
        }
    }
}

/// Registered databases, indexed by id.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<RegisteredDatabase>,
    resolver: DriverResolver,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom engine factory for driver resolution.
    pub fn with_factory(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            entries: Vec::new(),
            resolver: DriverResolver::new(factory),
        }
    }

    /// Register a database and return its id.
    ///
    /// No connection is opened. Must be called within a Tokio runtime when the
    /// database resolves to an async engine.
    pub fn add_database(&mut self, descriptor: &DatabaseDescriptor) -> DbResult<usize> {
        descriptor
            .validate()
            .map_err(|e| DbError::configuration(e.to_string()))?;

        let resolution = self.resolver.resolve(descriptor)?;
        let id = self.entries.len();
        let alias = descriptor
            .alias
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("{}_{}", resolution.url.kind(), id));

        info!(
            id,
            alias = %alias,
            url = %resolution.url,
            is_async = resolution.is_async(),
            "Registered database"
        );

        self.entries.push(RegisteredDatabase {
            id,
            alias,
            url: resolution.url,
            engine: resolution.engine,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a registered database.
    pub fn get(&self, id: usize) -> DbResult<&RegisteredDatabase> {
        self.entries
            .get(id)
            .ok_or_else(|| DbError::database_not_found(id))
    }

    /// Summaries of every registered database, ordered by alias
    /// (case-insensitive), then id.
    pub fn list_databases(&self) -> Vec<DatabaseSummary> {
        let mut summaries: Vec<DatabaseSummary> =
            self.entries.iter().map(RegisteredDatabase::summary).collect();
        summaries.sort_by(|a, b| {
            a.alias
                .to_lowercase()
                .cmp(&b.alias.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        summaries
    }

    /// Reject blank query text. Checked before the id is looked up.
    pub fn validate_query(sql: &str) -> DbResult<()> {
        if sql.trim().is_empty() {
            return Err(DbError::invalid_input("Query text cannot be empty"));
        }
        Ok(())
    }

    /// The trimmed table a schema request targets: `None` for tables,
    /// a non-blank name for columns.
    pub fn schema_table(target: SchemaTarget, table: Option<&str>) -> DbResult<Option<&str>> {
        match target {
            SchemaTarget::Tables => Ok(None),
            SchemaTarget::Columns => table
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(Some)
                .ok_or_else(|| {
                    DbError::invalid_input("A table name is required when target is 'columns'")
                }),
        }
    }

    /// Run `sql` verbatim against database `id`.
    pub async fn execute(&self, id: usize, sql: &str) -> DbResult<Vec<Row>> {
        Self::validate_query(sql)?;
        let entry = self.get(id)?;

        debug!(id, alias = %entry.alias, is_async = entry.is_async(), "Executing query");
        match &entry.engine {
            Engine::Async(engine) => QueryExecutor::fetch_all(engine, sql).await,
            Engine::Sync(engine) => {
                let engine = engine.clone();
                let sql = sql.to_owned();
                run_blocking(move || QueryExecutor::fetch_all_blocking(&engine, &sql)).await
            }
        }
    }

    /// List tables, or the columns of `table`, for database `id`.
    pub async fn get_schema(
        &self,
        id: usize,
        target: SchemaTarget,
        table: Option<&str>,
    ) -> DbResult<Vec<String>> {
        let table = Self::schema_table(target, table)?.map(str::to_owned);
        let entry = self.get(id)?;

        debug!(id, alias = %entry.alias, target = %target, table = ?table, "Inspecting schema");
        match (&entry.engine, table) {
            (Engine::Async(engine), None) => SchemaInspector::list_tables(engine).await,
            (Engine::Async(engine), Some(table)) => {
                SchemaInspector::list_columns(engine, &table).await
            }
            (Engine::Sync(engine), table) => {
                let engine = engine.clone();
                run_blocking(move || match table {
                    None => SchemaInspector::list_tables_blocking(&engine),
                    Some(table) => SchemaInspector::list_columns_blocking(&engine, &table),
                })
                .await
            }
        }
    }

    /// Close every engine.
    pub async fn close_all(&self) {
        for entry in &self.entries {
            entry.engine.close().await;
        }
        info!(count = self.entries.len(), "Closed all database engines");
    }
}

/// Run blocking engine work off the async worker threads.
async fn run_blocking<T, F>(f: F) -> DbResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> DbResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DbError::internal(format!("Blocking task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_aliases_follow_kind_and_id() {
        let mut registry = Registry::new();
        let a = registry
            .add_database(&DatabaseDescriptor::new("sqlite", "a.db").with_driver("rusqlite"))
            .unwrap();
        let b = registry
            .add_database(&DatabaseDescriptor::new("SQLite", "b.db").with_driver("rusqlite"))
            .unwrap();

        assert_eq!((a, b), (0, 1));
        assert_eq!(registry.get(0).unwrap().alias(), "sqlite_0");
        assert_eq!(registry.get(1).unwrap().alias(), "sqlite_1");
    }

    #[test]
    fn test_list_sorted_by_alias_case_insensitive() {
        let mut registry = Registry::new();
        for alias in ["beta", "Alpha", "gamma", "alpha"] {
            registry
                .add_database(
                    &DatabaseDescriptor::new("sqlite", format!("{alias}.db"))
                        .with_driver("rusqlite")
                        .with_alias(alias),
                )
                .unwrap();
        }

        let order: Vec<(String, usize)> = registry
            .list_databases()
            .into_iter()
            .map(|s| (s.alias, s.id))
            .collect();
        assert_eq!(
            order,
            [
                ("Alpha".to_string(), 1),
                ("alpha".to_string(), 3),
                ("beta".to_string(), 0),
                ("gamma".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_duplicate_descriptors_get_distinct_ids() {
        let mut registry = Registry::new();
        let dup = DatabaseDescriptor::new("sqlite", "dup.db")
            .with_driver("rusqlite")
            .with_alias("dup");
        let ids: Vec<usize> = [&dup, &dup, &dup.clone().with_alias("other")]
            .into_iter()
            .map(|d| registry.add_database(d).unwrap())
            .collect();
        assert_eq!(ids, [0, 1, 2]);
        assert_eq!(registry.len(), 3);

        for id in [0, 1] {
            let entry = registry.get(id).unwrap();
            assert_eq!(entry.alias(), "dup");
            assert_eq!(entry.summary().id, id);
        }

        let order: Vec<(String, usize)> = registry
            .list_databases()
            .into_iter()
            .map(|s| (s.alias, s.id))
            .collect();
        assert_eq!(
            order,
            [
                ("dup".to_string(), 0),
                ("dup".to_string(), 1),
                ("other".to_string(), 2),
            ]
        );
    }

    #[test]
    fn test_failed_registration_consumes_no_id() {
        let mut registry = Registry::new();
        assert!(registry.add_database(&DatabaseDescriptor::new("oracle", "x")).is_err());
        assert!(registry.is_empty());

        let id = registry
            .add_database(&DatabaseDescriptor::new("sqlite", "a.db").with_driver("rusqlite"))
            .unwrap();
        assert_eq!(id, 0);
    }

    #[test]
    fn test_invalid_descriptor_is_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .add_database(&DatabaseDescriptor::new("sqlite", ""))
            .unwrap_err();
        assert!(matches!(err, DbError::Configuration { .. }));
    }

    #[test]
    fn test_summary_omits_absent_host_and_port() {
        let mut registry = Registry::new();
        registry
            .add_database(&DatabaseDescriptor::new("sqlite", "a.db").with_driver("rusqlite"))
            .unwrap();

        let json = serde_json::to_value(registry.list_databases()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "id": 0,
                "alias": "sqlite_0",
                "database": "a.db",
                "driver": "sqlite+rusqlite",
                "is_async": false
            }])
        );
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let registry = Registry::new();
        let err = registry.execute(3, "SELECT 1").await.unwrap_err();
        assert_eq!(err.to_string(), "no registered database with id 3");

        let err = registry
            .get_schema(3, SchemaTarget::Tables, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::DatabaseNotFound { id: 3 }));
    }

    #[tokio::test]
    async fn test_input_checked_before_id_lookup() {
        let registry = Registry::new();
        let err = registry.execute(9, "").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }), "{err:?}");

        let err = registry
            .get_schema(9, SchemaTarget::Columns, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }), "{err:?}");
    }

    #[test]
    fn test_schema_table_trims_and_ignores_tables_target() {
        assert_eq!(
            Registry::schema_table(SchemaTarget::Columns, Some(" world ")).unwrap(),
            Some("world")
        );
        assert_eq!(
            Registry::schema_table(SchemaTarget::Tables, Some("world")).unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_columns_target_requires_table() {
        let mut registry = Registry::new();
        registry
            .add_database(&DatabaseDescriptor::new("sqlite", "a.db").with_driver("rusqlite"))
            .unwrap();

        let err = registry
            .get_schema(0, SchemaTarget::Columns, Some("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_empty_query_is_invalid_input() {
        let mut registry = Registry::new();
        registry
            .add_database(&DatabaseDescriptor::new("sqlite", "a.db").with_driver("rusqlite"))
            .unwrap();

        let err = registry.execute(0, "   ").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }
}
