//! MCP server integration module.
//!
//! Binds the registry operations to MCP tools using the rmcp framework.

pub mod service;

pub use service::GatewayService;
