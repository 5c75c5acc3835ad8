//! DB Query Gateway Library
//!
//! Registers heterogeneous SQL databases (SQLite, PostgreSQL, MySQL) behind
//! numeric ids and serves query execution and schema introspection over HTTP
//! or as MCP tools over stdio.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod sample;
pub mod transport;

pub use config::Config;
pub use db::Registry;
pub use error::DbError;
pub use mcp::GatewayService;
