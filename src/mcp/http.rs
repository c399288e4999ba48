//! Streamable-HTTP style transport: JSON-RPC 2.0 over `POST /mcp`.
//!
//! Each request is authenticated first; the resulting [`Caller`] is bound to
//! a clone of the server so tool handlers only ever see their own twin.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rmcp::{ErrorData as McpError, ServerHandler, model::ErrorCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::server::TwinMcpServer;
use crate::auth::Authenticator;
use crate::twin::Caller;

const JSONRPC_VERSION: &str = "2.0";

#[derive(Clone)]
pub struct AppState {
    pub server: TwinMcpServer,
    pub auth: Arc<Authenticator>,
}

impl AppState {
    pub fn new(server: TwinMcpServer, auth: Authenticator) -> Self {
        Self {
            server,
            auth: Arc::new(auth),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/mcp",
            post(handle_rpc)
                .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
                .get(server_info),
        )
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve_http(state: AppState, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        %addr,
        auth = state.auth.mode(),
        storage = state.server.twin().store_kind(),
        "serving MCP over HTTP"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn require_auth(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match state.auth.authenticate(request.headers()).await {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

async fn server_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.server.info("http", state.auth.mode()))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

impl RpcResponse {
    fn reply(id: Value, outcome: Result<Value, McpError>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(err) => (None, Some(err)),
        };
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
            error,
        }
    }

    fn failure(id: Value, error: McpError) -> Self {
        Self::reply(id, Err(error))
    }
}

impl IntoResponse for RpcResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

async fn handle_rpc(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Response {
    let message: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return RpcResponse::failure(
                Value::Null,
                McpError::new(ErrorCode::PARSE_ERROR, format!("Parse error: {}", e), None),
            )
            .into_response();
        }
    };

    let mut request = match message {
        Value::Object(request) => request,
        Value::Array(_) => {
            return RpcResponse::failure(
                Value::Null,
                McpError::new(ErrorCode::INVALID_REQUEST, "Batch requests are not supported", None),
            )
            .into_response();
        }
        _ => {
            return RpcResponse::failure(
                Value::Null,
                McpError::new(ErrorCode::INVALID_REQUEST, "Request must be a JSON object", None),
            )
            .into_response();
        }
    };

    let id = request.remove("id");
    let reply_id = id.clone().unwrap_or(Value::Null);

    if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return RpcResponse::failure(
            reply_id,
            McpError::new(ErrorCode::INVALID_REQUEST, "jsonrpc must be \"2.0\"", None),
        )
        .into_response();
    }

    let Some(Value::String(method)) = request.remove("method") else {
        return RpcResponse::failure(
            reply_id,
            McpError::new(ErrorCode::INVALID_REQUEST, "method must be a string", None),
        )
        .into_response();
    };

    if id.is_none() {
        tracing::debug!(%method, "notification acknowledged");
        return StatusCode::ACCEPTED.into_response();
    }

    let params = request.remove("params").unwrap_or(Value::Null);
    let server = state.server.with_caller(caller);
    let outcome = dispatch(&server, &method, params).await;
    if let Err(err) = &outcome {
        tracing::debug!(%method, code = err.code.0, "request failed: {}", err.message);
    }

    RpcResponse::reply(reply_id, outcome).into_response()
}

async fn dispatch(server: &TwinMcpServer, method: &str, params: Value) -> Result<Value, McpError> {
    match method {
        "initialize" => to_value(&server.get_info()),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": server.tools() })),
        "tools/call" => {
            let call: CallParams = serde_json::from_value(params)
                .map_err(|e| McpError::invalid_params(format!("Invalid tools/call params: {}", e), None))?;
            let result = server.call_tool(&call.name, call.arguments).await?;
            to_value(&result)
        }
        other => Err(McpError::new(
            ErrorCode::METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
            None,
        )),
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value)
        .map_err(|e| McpError::internal_error(format!("JSON serialization failed: {}", e), None))
}
