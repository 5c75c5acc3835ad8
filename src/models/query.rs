//! Query-related data models.
//!
//! Request and response shapes for SQL execution, shared by the HTTP and MCP
//! surfaces.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default caller-level query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

/// One result row: column name to value, in engine column order.
pub type Row = serde_json::Map<String, JsonValue>;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteRequest {
    /// Registered database id (see list_databases)
    pub id: usize,
    /// SQL statement to run
    pub query: String,
}

impl ExecuteRequest {
    pub fn new(id: usize, query: impl Into<String>) -> Self {
        Self {
            id,
            query: query.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecuteResponse {
    pub id: usize,
    pub alias: String,
    pub query: String,
    /// Result rows; empty for statements that return none
    pub data: Vec<Row>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_request_requires_id() {
        let err = serde_json::from_str::<ExecuteRequest>(r#"{"query": "SELECT 1"}"#).unwrap_err();
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_execute_response_serialization() {
        let mut row = Row::new();
        row.insert("Abbreviation".into(), JsonValue::String("FR".into()));
        let response = ExecuteResponse {
            id: 0,
            alias: "default".into(),
            query: "SELECT Abbreviation FROM world".into(),
            data: vec![row],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["alias"], "default");
        assert_eq!(json["data"][0]["Abbreviation"], "FR");
    }
}
