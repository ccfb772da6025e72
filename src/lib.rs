//! mcp-template-server: a template Model Context Protocol server
//!
//! The server exposes three kinds of capabilities to MCP clients:
//!
//! - **Tools**: named functions with typed arguments (`add`, `echo`, `timestamp`)
//! - **Resources**: data addressed by literal or templated URIs
//!   (`info://server`, `greeting://{name}`, `data://{id}`)
//! - **Prompts**: named conversation templates (`analyze`, `code_review`, `summarize`)
//!
//! Capabilities are registered once on a [`host::CapabilityHost`] at
//! start-up; the host is then shared read-only and the MCP layer routes
//! requests to it.
//!
//! # Modules
//!
//! - [`builtin`] — The example tools, resources and prompts
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Start-up error types
//! - [`host`] — Capability registry and dispatch
//! - [`mcp`] — MCP protocol implementation

pub mod builtin;
pub mod config;
pub mod error;
pub mod host;
pub mod mcp;
