//! HTTP transport for the gateway.
//!
//! Serves three JSON endpoints under the configured base path:
//! - `GET  {base}/databases`: registered databases
//! - `POST {base}/execute`: run a query, body `{"id": .., "query": ".."}`
//! - `GET  {base}/schema?id=..&target=tables|columns&table=..`

use crate::db::{DatabaseSummary, Registry};
use crate::error::{DbError, DbResult};
use crate::models::{ExecuteRequest, ExecuteResponse, SchemaResponse, SchemaTarget};
use crate::transport::{Transport, wait_for_signal, with_timeout};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// HTTP transport implementation.
pub struct HttpTransport {
    registry: Arc<Registry>,
    /// Host to bind to
    host: String,
    /// Port to bind to
    port: u16,
    /// Path prefix, "" or "/segment[/segment...]"
    base_path: String,
    query_timeout: Duration,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Arguments
    ///
    /// * `registry` - Shared registry of databases
    /// * `host` - Host address to bind to
    /// * `port` - Port to bind to
    /// * `base_path` - Normalized path prefix (e.g., "/sql-gateway")
    /// * `query_timeout` - Caller-level timeout for execute and schema requests
    pub fn new(
        registry: Arc<Registry>,
        host: impl Into<String>,
        port: u16,
        base_path: impl Into<String>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            host: host.into(),
            port,
            base_path: base_path.into(),
            query_timeout,
        }
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn router(&self) -> Router {
        router(self.registry.clone(), &self.base_path, self.query_timeout)
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        info!("Starting gateway with HTTP transport on {}", bind_addr);

        let app = self.router();

        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::connection(
                format!("Failed to bind to {}: {}", bind_addr, e),
                "Check that the port is available",
            )
        })?;

        info!(base_path = %self.base_path, "HTTP endpoints ready");

        // Long-running queries may keep the server alive indefinitely,
        // so we force exit after a timeout once shutdown signal is received
        const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

        let shutdown_notify = Arc::new(tokio::sync::Notify::new());
        let shutdown_notify_clone = shutdown_notify.clone();

        let shutdown_signal = async move {
            wait_for_signal().await;
            shutdown_notify_clone.notify_one();
        };

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

        // Race between: server completing normally vs forced timeout/second signal after shutdown
        tokio::select! {
            result = server => {
                match result {
                    Ok(()) => info!("HTTP server stopped"),
                    Err(e) => {
                        error!(error = %e, "HTTP server error");
                        return Err(DbError::internal(format!("HTTP server error: {}", e)));
                    }
                }
            }
            _ = async {
                shutdown_notify.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for requests to finish (send signal again to force exit)..."
                );

                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing immediate exit");
                    }
                }
            } => {}
        }

        info!("Closing database engines");
        self.registry.close_all().await;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    query_timeout: Duration,
}

/// Build the gateway router. An empty `base_path` mounts the routes at the root.
pub fn router(registry: Arc<Registry>, base_path: &str, query_timeout: Duration) -> Router {
    let routes = Router::new()
        .route("/databases", get(list_databases))
        .route("/execute", post(execute))
        .route("/schema", get(get_schema))
        .with_state(AppState {
            registry,
            query_timeout,
        });

    if base_path.is_empty() {
        routes
    } else {
        Router::new().nest(base_path, routes)
    }
}

async fn list_databases(State(state): State<AppState>) -> Json<Vec<DatabaseSummary>> {
    Json(state.registry.list_databases())
}

async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Response {
    let ExecuteRequest { id, query } = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return error_body(StatusCode::BAD_REQUEST, rejection.body_text(), JsonValue::Null);
        }
    };
    let context = json!({ "id": id, "query": query });
    if let Err(err) = Registry::validate_query(&query) {
        return failure(err, context);
    }

    let alias = match state.registry.get(id) {
        Ok(entry) => entry.alias().to_string(),
        Err(err) => return failure(err, context),
    };

    match with_timeout(state.query_timeout, state.registry.execute(id, &query)).await {
        Ok(data) => {
            debug!(id, rows = data.len(), "Query succeeded");
            Json(ExecuteResponse {
                id,
                alias,
                query,
                data,
            })
            .into_response()
        }
        Err(err) => failure(err, context),
    }
}

#[derive(Debug, Deserialize)]
struct SchemaParams {
    id: Option<String>,
    target: Option<String>,
    table: Option<String>,
}

async fn get_schema(State(state): State<AppState>, Query(params): Query<SchemaParams>) -> Response {
    let context = json!({ "id": params.id, "target": params.target, "table": params.table });

    let id = match params.id.as_deref().map(str::trim) {
        None | Some("") => {
            return error_body(StatusCode::BAD_REQUEST, "Missing required parameter 'id'", context);
        }
        Some(raw) => match raw.parse::<usize>() {
            Ok(id) => id,
            Err(_) => {
                return error_body(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid id '{raw}': expected a non-negative integer"),
                    context,
                );
            }
        },
    };

    let target = match params.target.as_deref() {
        None => SchemaTarget::Tables,
        Some(raw) => match raw.parse::<SchemaTarget>() {
            Ok(target) => target,
            Err(message) => return error_body(StatusCode::BAD_REQUEST, message, context),
        },
    };

    if let Err(err) = Registry::schema_table(target, params.table.as_deref()) {
        return failure(err, context);
    }

    let result = with_timeout(
        state.query_timeout,
        state.registry.get_schema(id, target, params.table.as_deref()),
    )
    .await;

    match result {
        Ok(data) => Json(SchemaResponse {
            id,
            table: params.table,
            target,
            data,
        })
        .into_response(),
        Err(err) => failure(err, context),
    }
}

/// Map a failed registry call to a response, logging the full error.
fn failure(err: DbError, context: JsonValue) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = ?err, context = %context, "Request failed");
    } else {
        debug!(error = %err, "Rejected request");
    }

    let message = match &err {
        DbError::Internal { .. } | DbError::Configuration { .. } => {
            "Internal server error".to_string()
        }
        _ => err.to_string(),
    };

    let mut response = error_json(message, context);
    if let Some(suggestion) = err.suggestion() {
        response.insert("suggestion".into(), JsonValue::String(suggestion.to_string()));
    }
    (status, Json(JsonValue::Object(response))).into_response()
}

/// `{"message": .., ...context}` with the given status.
fn error_body(status: StatusCode, message: impl Into<String>, context: JsonValue) -> Response {
    (status, Json(JsonValue::Object(error_json(message, context)))).into_response()
}

fn error_json(message: impl Into<String>, context: JsonValue) -> serde_json::Map<String, JsonValue> {
    let mut body = serde_json::Map::new();
    body.insert("message".into(), JsonValue::String(message.into()));
    if let JsonValue::Object(fields) = context {
        body.extend(fields);
    }
    body
}
