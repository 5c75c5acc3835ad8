//! Error types for the query gateway.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each variant maps onto an HTTP status and an MCP error code so both surfaces
//! report failures consistently.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Startup-time registration failure; fatal to the process.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("no registered database with id {id}")]
    DatabaseNotFound { id: usize },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn database_not_found(id: usize) -> Self {
        Self::DatabaseNotFound { id }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::DatabaseNotFound { .. } => Some("Call list_databases to see the registered ids"),
            Self::Timeout { .. } => Some("Consider increasing the timeout or optimizing the query"),
            _ => None,
        }
    }

    /// HTTP status for this error.
    ///
    /// Only malformed requests are the caller's fault; lookup and execution
    /// failures are reported as server errors.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection settings and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a pooled connection",
                "Check that the database server is reachable",
            ),
            sqlx::Error::PoolClosed => DbError::connection(
                "Connection pool is closed",
                "The gateway is shutting down",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Convert synchronous SQLite driver errors to DbError.
impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err {
            rusqlite::Error::SqliteFailure(failure, msg) => {
                let message = msg.unwrap_or_else(|| failure.to_string());
                match failure.code {
                    ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::PermissionDenied => {
                        DbError::connection(message, "Check that the database file exists and is readable")
                    }
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => DbError::connection(
                        message,
                        "Another connection holds a lock on the database; retry later",
                    ),
                    _ => DbError::database(
                        message,
                        Some(failure.extended_code.to_string()),
                        "Check the SQL syntax and referenced objects",
                    ),
                }
            }
            rusqlite::Error::InvalidPath(path) => DbError::connection(
                format!("Invalid database path: {}", path.display()),
                "Check the database file path",
            ),
            rusqlite::Error::MultipleStatement => DbError::invalid_input(
                "Only one SQL statement can be executed per request",
            ),
            other => DbError::internal(format!("SQLite error: {}", other)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        let data = suggestion_data(err.suggestion());
        match &err {
            DbError::InvalidInput { .. } | DbError::Schema { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), data)
            }

            DbError::DatabaseNotFound { .. } => {
                rmcp::ErrorData::resource_not_found(err.to_string(), data)
            }

            // Database errors -> invalid_params with sql_state in message
            DbError::Database {
                message, sql_state, ..
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, data)
            }

            DbError::Configuration { .. }
            | DbError::Connection { .. }
            | DbError::Timeout { .. }
            | DbError::Internal { .. } => rmcp::ErrorData::internal_error(err.to_string(), data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_not_found_names_the_id() {
        let err = DbError::database_not_found(7);
        assert_eq!(err.to_string(), "no registered database with id 7");
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database("Syntax error", Some("42601".to_string()), "Check SQL syntax");
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert_eq!(DbError::invalid_input("x").suggestion(), None);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(DbError::invalid_input("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            DbError::database_not_found(3).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DbError::database("boom", None, "").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(DbError::timeout("query", 5).status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_rusqlite_syntax_error_maps_to_database() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: DbError = conn.prepare("SELEC 1").unwrap_err().into();
        assert!(matches!(err, DbError::Database { .. }));
        assert!(err.to_string().contains("syntax error"));
    }

    #[test]
    fn test_invalid_input_maps_to_invalid_params() {
        let mcp_err: rmcp::ErrorData = DbError::invalid_input("bad input").into();
        // invalid_params uses -32602
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_database_not_found_maps_to_resource_not_found() {
        let mcp_err: rmcp::ErrorData = DbError::database_not_found(4).into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
        assert!(mcp_err.message.contains("id 4"));
    }

    #[test]
    fn test_timeout_maps_to_internal_error() {
        let mcp_err: rmcp::ErrorData = DbError::timeout("query", 30).into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_database_error_includes_sql_state_and_suggestion() {
        let err = DbError::database("syntax error", Some("42601".to_string()), "check syntax");
        let mcp_err: rmcp::ErrorData = err.into();
        assert!(mcp_err.message.contains("42601"));
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "check syntax");
    }
}
