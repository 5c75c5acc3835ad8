//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Driver catalog and engine construction
//! - Async (sqlx) and blocking (rusqlite) engines
//! - The registry of databases served by the gateway
//! - Query execution and schema introspection
//! - Result-row normalization

#[macro_use]
pub mod macros;
pub mod driver;
pub mod engine;
pub mod executor;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod sync_engine;
pub mod types;
pub mod url;

pub use driver::{DefaultEngineFactory, DriverError, EngineFactory};
pub use engine::{AsyncEngine, Engine};
pub use executor::QueryExecutor;
pub use registry::{DatabaseSummary, RegisteredDatabase, Registry};
pub use resolver::{DriverResolver, Resolution};
pub use schema::SchemaInspector;
pub use sync_engine::SyncEngine;
pub use url::ConnectionUrl;
