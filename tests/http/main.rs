use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use twin_mcp::{
    auth::Authenticator,
    config::{ApiKeyConfig, AuthConfig},
    mcp::{AppState, TwinMcpServer, router},
    metamodel::Metamodel,
    twin::{Caller, TwinService, access::Role, store::MemoryStore},
};

const USER_KEY: &str = "key-learner";
const SYSTEM_KEY: &str = "key-pipeline";

fn app() -> Router {
    let server = TwinMcpServer::new(
        Arc::new(TwinService::new(Arc::new(MemoryStore::new()))),
        Arc::new(Metamodel::embedded().unwrap()),
        Caller::new("nobody", Role::User),
    );
    let auth = Authenticator::from_config(&AuthConfig::ApiKey {
        keys: vec![
            ApiKeyConfig {
                key: USER_KEY.to_string(),
                user_id: "learner_042".to_string(),
                role: Role::User,
            },
            ApiKeyConfig {
                key: SYSTEM_KEY.to_string(),
                user_id: "learner_042".to_string(),
                role: Role::System,
            },
        ],
    })
    .unwrap();
    router(AppState::new(server, auth))
}

fn rpc_request(key: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/mcp")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    builder.body(body.into()).unwrap()
}

fn call(id: u64, method: &str, params: Value) -> String {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Parsed JSON payload of a `tools/call` response.
fn tool_payload(body: &Value) -> Value {
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_missing_credentials_is_401() {
    let response = app()
        .oneshot(rpc_request(None, call(1, "ping", json!({}))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::WWW_AUTHENTICATE],
        "Bearer realm=\"twin-mcp\""
    );
}

#[tokio::test]
async fn test_unknown_key_is_401() {
    let (status, body) = send(app(), rpc_request(Some("wrong"), call(1, "ping", json!({})))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

// ============================================================================
// JSON-RPC framing
// ============================================================================

#[tokio::test]
async fn test_ping() {
    let (status, body) = send(app(), rpc_request(Some(USER_KEY), call(7, "ping", json!({})))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"jsonrpc": "2.0", "id": 7, "result": {}}));
}

#[tokio::test]
async fn test_initialize() {
    let (_, body) = send(
        app(),
        rpc_request(Some(USER_KEY), call(1, "initialize", json!({}))),
    )
    .await;
    assert_eq!(body["result"]["serverInfo"]["name"], "twin-mcp");
    assert!(body["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn test_malformed_json_is_parse_error() {
    let (status, body) = send(app(), rpc_request(Some(USER_KEY), "{not json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn test_wrong_version_is_invalid_request() {
    let body = json!({"jsonrpc": "1.0", "id": 3, "method": "ping"}).to_string();
    let (_, body) = send(app(), rpc_request(Some(USER_KEY), body)).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 3);

    let (_, body) = send(app(), rpc_request(Some(USER_KEY), "\"ping\"")).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["error"]["message"], "Request must be a JSON object");
}

#[tokio::test]
async fn test_batch_is_invalid_request() {
    let batch = format!("[{}, {}]", call(1, "ping", json!({})), call(2, "tools/list", json!({})));
    let (status, body) = send(app(), rpc_request(Some(USER_KEY), batch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], Value::Null);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["error"]["message"], "Batch requests are not supported");
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_unknown_method() {
    let (_, body) = send(
        app(),
        rpc_request(Some(USER_KEY), call(2, "resources/list", json!({}))),
    )
    .await;
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["error"]["message"], "Method not found: resources/list");
}

#[tokio::test]
async fn test_notification_is_accepted() {
    let body = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
    let (status, body) = send(app(), rpc_request(Some(USER_KEY), body)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);
}

// ============================================================================
// Tools
// ============================================================================

#[tokio::test]
async fn test_tools_list() {
    let (_, body) = send(app(), rpc_request(Some(USER_KEY), call(1, "tools/list", json!({})))).await;
    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 11);

    let write = tools
        .iter()
        .find(|t| t["name"] == "write_digital_twin")
        .unwrap();
    assert_eq!(write["inputSchema"]["type"], "object");
    assert!(write["inputSchema"]["properties"]["path"].is_object());
}

#[tokio::test]
async fn test_tools_call_uses_authenticated_caller() {
    let app = app();

    let (_, body) = send(
        app.clone(),
        rpc_request(
            Some(USER_KEY),
            call(
                1,
                "tools/call",
                json!({"name": "write_digital_twin", "arguments": {"path": "1_declarative/notes", "data": "hi"}}),
            ),
        ),
    )
    .await;
    assert_eq!(tool_payload(&body)["success"], true);

    let (_, body) = send(
        app,
        rpc_request(
            Some(USER_KEY),
            call(
                2,
                "tools/call",
                json!({"name": "read_digital_twin", "arguments": {"path": "1_declarative.notes"}}),
            ),
        ),
    )
    .await;
    let payload = tool_payload(&body);
    assert_eq!(payload["found"], true);
    assert_eq!(payload["value"], "hi");
}

#[tokio::test]
async fn test_access_denied_is_rpc_error() {
    let app = app();
    let params = json!({
        "name": "write_digital_twin",
        "arguments": {"path": "2_collected/2_5_finance/01_Статус подписки", "data": "pro"}
    });

    let (status, body) = send(app.clone(), rpc_request(Some(USER_KEY), call(1, "tools/call", params.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"]["code"], -32003);
    assert_eq!(body["error"]["data"]["category"], "2_collected");

    let (_, body) = send(app, rpc_request(Some(SYSTEM_KEY), call(2, "tools/call", params))).await;
    assert_eq!(tool_payload(&body)["success"], true);
}

#[tokio::test]
async fn test_invalid_tools_call_params() {
    let (_, body) = send(
        app(),
        rpc_request(Some(USER_KEY), call(1, "tools/call", json!({"arguments": {}}))),
    )
    .await;
    assert_eq!(body["error"]["code"], -32602);
}

#[tokio::test]
async fn test_rejected_write_is_tool_error() {
    let (_, body) = send(
        app(),
        rpc_request(
            Some(USER_KEY),
            call(
                1,
                "tools/call",
                json!({"name": "write_digital_twin", "arguments": {"path": "1_declarative/1_4_context/02_Время отчёта за день", "data": 930}}),
            ),
        ),
    )
    .await;
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(tool_payload(&body)["validation"]["valid"], false);
}

// ============================================================================
// Info endpoints
// ============================================================================

#[tokio::test]
async fn test_server_info_needs_no_credentials() {
    let request = Request::builder().uri("/mcp").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "twin-mcp");
    assert_eq!(body["transport"], "http");
    assert_eq!(body["auth"], "apiKey");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["metamodel"]["indicators"], 64);
    assert_eq!(body["tools"].as_array().unwrap().len(), 11);
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}
