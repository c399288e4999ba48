//! twin-mcp - MCP server for a learner's digital twin
//!
//! Exposes a per-user JSON "digital twin" document and the shared indicator
//! metamodel that describes it to AI agents over the Model Context Protocol.
//! Access to each of the four data categories depends on the caller's role.
//!
//! ## Module Structure
//!
//! - `auth`: Bearer authentication for the HTTP transport (none, API key, JWT)
//! - `cli`: Command-line interface layer
//! - `config`: Configuration file loading and parsing
//! - `logging`: Tracing subscriber set-up
//! - `mcp`: Model Context Protocol server and transports
//! - `metamodel`: Indicator catalogue, queries and value validation
//! - `twin`: Twin documents: paths, access control and storage

pub mod auth;
pub mod cli;
pub mod config;
pub mod logging;
pub mod mcp;
pub mod metamodel;
pub mod twin;
