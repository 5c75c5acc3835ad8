//! Data models for the query gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{DatabaseDescriptor, DatabaseType, DescriptorError};
pub use query::{DEFAULT_QUERY_TIMEOUT_SECS, ExecuteRequest, ExecuteResponse, Row};
pub use schema::{SchemaRequest, SchemaResponse, SchemaTarget};
