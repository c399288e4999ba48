use std::{path::Path, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use tempfile::TempDir;
use twin_mcp::{
    mcp::TwinMcpServer,
    metamodel::Metamodel,
    twin::{
        Caller, TwinService,
        access::Role,
        store::{FileStore, MemoryStore, TwinStore},
    },
};

mod tools;

pub const LEARNER: &str = "learner_001";

/// Test fixture for MCP integration tests
///
/// Owns the twin store so several servers (one per role) can share it.
pub struct McpTestFixture {
    temp_dir: Option<TempDir>,
    twin: Arc<TwinService>,
    metamodel: Arc<Metamodel>,
}

impl McpTestFixture {
    /// In-memory store with no documents.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), None)
    }

    /// File-backed store under a fresh temporary directory.
    pub fn with_file_store() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let store = FileStore::new(temp_dir.path().canonicalize()?);
        Ok(Self::with_store(Arc::new(store), Some(temp_dir)))
    }

    fn with_store(store: Arc<dyn TwinStore>, temp_dir: Option<TempDir>) -> Self {
        Self {
            temp_dir,
            twin: Arc::new(TwinService::new(store)),
            metamodel: Arc::new(Metamodel::embedded().expect("built-in metamodel loads")),
        }
    }

    /// Server acting as `LEARNER` with the given role.
    pub fn server(&self, role: Role) -> TwinMcpServer {
        self.server_for(LEARNER, role)
    }

    pub fn server_for(&self, user_id: &str, role: Role) -> TwinMcpServer {
        TwinMcpServer::new(
            self.twin.clone(),
            self.metamodel.clone(),
            Caller::new(user_id, role),
        )
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(|dir| dir.path())
    }
}

/// Extract the JSON payload from a successful tool result.
pub fn extract_tool_result_json(result: &rmcp::model::CallToolResult) -> Value {
    if let Some(true) = result.is_error {
        panic!("Tool call returned an error: {:?}", result);
    }
    parse_content(result)
}

/// Extract the JSON payload from a tool result flagged as an error.
pub fn extract_tool_error_json(result: &rmcp::model::CallToolResult) -> Value {
    assert_eq!(result.is_error, Some(true), "Tool call should be flagged as an error");
    parse_content(result)
}

/// Plain text content of a tool result.
pub fn extract_tool_result_text(result: &rmcp::model::CallToolResult) -> String {
    assert!(!result.content.is_empty(), "Tool result should have content");
    result.content[0]
        .as_text()
        .expect("Tool result content should be text")
        .text
        .clone()
}

fn parse_content(result: &rmcp::model::CallToolResult) -> Value {
    let text = extract_tool_result_text(result);
    serde_json::from_str(&text).expect("Tool result should be valid JSON")
}
