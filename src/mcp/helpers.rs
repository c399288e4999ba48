//! Helper functions for MCP server operations.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content, ErrorCode},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};

use crate::twin::TwinError;

/// JSON-RPC error code for calls the caller's role may not make.
pub const ACCESS_DENIED: ErrorCode = ErrorCode(-32003);

/// Serialize `value` as pretty JSON into a successful tool result.
pub fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("JSON serialization failed: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json_str)]))
}

/// Serialize `value` as pretty JSON into a tool result flagged as an error.
pub fn json_error_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("JSON serialization failed: {}", e), None))?;
    Ok(CallToolResult::error(vec![Content::text(json_str)]))
}

/// Map a twin error onto the JSON-RPC error the client sees.
pub fn twin_error(err: TwinError) -> McpError {
    match err {
        TwinError::AccessDenied(denied) => McpError::new(
            ACCESS_DENIED,
            denied.to_string(),
            Some(json!({
                "role": denied.role,
                "operation": denied.operation.as_str(),
                "category": denied.target,
            })),
        ),
        TwinError::InvalidPath(e) => McpError::invalid_params(e.to_string(), None),
        TwinError::Store(e) => {
            tracing::error!("twin store failure: {}", e);
            McpError::internal_error(format!("Storage error: {}", e), None)
        }
    }
}

/// Decode tool arguments, treating absent arguments as `{}`.
pub fn parse_arguments<T: DeserializeOwned>(
    tool: &str,
    arguments: Option<Map<String, Value>>,
) -> Result<T, McpError> {
    let value = Value::Object(arguments.unwrap_or_default());
    serde_json::from_value(value).map_err(|e| {
        McpError::invalid_params(format!("Invalid arguments for '{}': {}", tool, e), None)
    })
}
