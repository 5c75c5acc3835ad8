//! MCP service implementation using rmcp.
//!
//! Exposes the registry as three tools: `list_databases`, `execute` and
//! `get_schema`. Error mapping goes through `From<DbError> for ErrorData`.

use crate::db::{DatabaseSummary, Registry};
use crate::models::{
    DEFAULT_QUERY_TIMEOUT_SECS, ExecuteRequest, ExecuteResponse, SchemaRequest, SchemaResponse,
};
use crate::transport::with_timeout;
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    schemars::JsonSchema,
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Output for the list_databases tool.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ListDatabasesOutput {
    /// Registered databases, sorted by alias
    pub databases: Vec<DatabaseSummary>,
    pub count: usize,
}

#[derive(Clone)]
pub struct GatewayService {
    registry: Arc<Registry>,
    query_timeout: Duration,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl GatewayService {
    /// Create a new service over a shared registry.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_timeout(registry, Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS))
    }

    pub fn with_timeout(registry: Arc<Registry>, query_timeout: Duration) -> Self {
        Self {
            registry,
            query_timeout,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl GatewayService {
    #[tool(
        description = "List the registered databases.\nReturns the numeric id to use with `execute` and `get_schema`, plus alias, database, driver and whether the engine is async."
    )]
    pub async fn list_databases(&self) -> Json<ListDatabasesOutput> {
        let databases = self.registry.list_databases();
        let count = databases.len();
        Json(ListDatabasesOutput { databases, count })
    }

    #[tool(
        description = "Run a SQL statement against a registered database and return all rows.\nEach row is an object keyed by column name, in column order."
    )]
    pub async fn execute(
        &self,
        Parameters(input): Parameters<ExecuteRequest>,
    ) -> Result<Json<ExecuteResponse>, McpError> {
        let ExecuteRequest { id, query } = input;
        Registry::validate_query(&query)?;
        let alias = self.registry.get(id)?.alias().to_string();
        let data = with_timeout(self.query_timeout, self.registry.execute(id, &query)).await?;
        debug!(id, rows = data.len(), "Tool query succeeded");
        Ok(Json(ExecuteResponse {
            id,
            alias,
            query,
            data,
        }))
    }

    #[tool(
        description = "Inspect a registered database.\ntarget=tables (default) lists table names; target=columns lists the columns of `table`, sorted by name."
    )]
    pub async fn get_schema(
        &self,
        Parameters(input): Parameters<SchemaRequest>,
    ) -> Result<Json<SchemaResponse>, McpError> {
        let SchemaRequest { id, target, table } = input;
        let data = with_timeout(
            self.query_timeout,
            self.registry.get_schema(id, target, table.as_deref()),
        )
        .await?;
        Ok(Json(SchemaResponse {
            id,
            table,
            target,
            data,
        }))
    }
}

#[tool_handler]
impl ServerHandler for GatewayService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "db-query-gateway".to_owned(),
                title: Some("DB Query Gateway".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Query gateway for SQLite, PostgreSQL and MySQL databases.\n\
                \n\
                ## Workflow\n\
                1. Call `list_databases` to get the numeric database ids\n\
                2. Call `get_schema` with that id to discover tables, then columns\n\
                3. Call `execute` with the id and a SQL statement\n\
                \n\
                Results are returned verbatim; no row limit is applied."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SchemaTarget;
    use rmcp::model::ErrorCode;

    fn sample_service() -> (tempfile::TempDir, GatewayService) {
        let dir = tempfile::tempdir().unwrap();
        let path = crate::sample::materialize(dir.path()).unwrap();
        let mut registry = Registry::new();
        registry
            .add_database(&crate::sample::descriptor(&path).with_driver("rusqlite"))
            .unwrap();
        (dir, GatewayService::new(Arc::new(registry)))
    }

    #[test]
    fn test_server_info() {
        let service = GatewayService::new(Arc::new(Registry::new()));
        let info = service.get_info();
        assert_eq!(info.server_info.name, "db-query-gateway");
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn test_list_databases_tool() {
        let (_dir, service) = sample_service();
        let Json(output) = service.list_databases().await;
        assert_eq!(output.count, 1);
        assert_eq!(output.databases[0].alias, "default");
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let (_dir, service) = sample_service();
        let Json(output) = service
            .execute(Parameters(ExecuteRequest::new(
                0,
                "SELECT Abbreviation FROM world WHERE Country = 'France'",
            )))
            .await
            .unwrap();
        assert_eq!(output.alias, "default");
        assert_eq!(output.data[0]["Abbreviation"], "FR");
    }

    #[tokio::test]
    async fn test_execute_unknown_id_is_resource_not_found() {
        let (_dir, service) = sample_service();
        let err = service
            .execute(Parameters(ExecuteRequest::new(9, "SELECT 1")))
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
        assert!(err.message.contains("9"));
    }

    #[tokio::test]
    async fn test_execute_empty_query_checked_before_id() {
        let (_dir, service) = sample_service();
        let err = service
            .execute(Parameters(ExecuteRequest::new(9, "")))
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_get_schema_tool_requires_table_for_columns() {
        let (_dir, service) = sample_service();
        let err = service
            .get_schema(Parameters(SchemaRequest {
                id: 0,
                target: SchemaTarget::Columns,
                table: None,
            }))
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let err = service
            .get_schema(Parameters(SchemaRequest {
                id: 9,
                target: SchemaTarget::Columns,
                table: Some(" ".into()),
            }))
            .await
            .err()
            .unwrap();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);

        let Json(output) = service
            .get_schema(Parameters(SchemaRequest {
                id: 0,
                target: SchemaTarget::Tables,
                table: None,
            }))
            .await
            .unwrap();
        assert_eq!(output.data, vec!["world".to_string()]);
    }
}
