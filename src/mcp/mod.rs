//! Model Context Protocol (MCP) server implementation.
//!
//! The same tool catalogue is served over two transports: stdio for local
//! agents and JSON-RPC over HTTP for remote ones.
//!
//! ## Module Structure
//!
//! - `helpers`: result and error conversion for tool handlers
//! - `http`: axum router, auth middleware and JSON-RPC dispatch
//! - `server`: tool handlers
//! - `types`: tool parameter and result types

mod helpers;
pub mod http;
mod server;
pub mod types;

pub use helpers::ACCESS_DENIED;
pub use http::{AppState, router, serve_http};
pub use server::{SERVER_NAME, TwinMcpServer, serve_stdio};
