//! mcp-tool-server: an embeddable Model Context Protocol tool server
//!
//! An application registers tools, each with a name, a description and an
//! input schema, and this crate serves them to AI clients over JSON-RPC 2.0.
//!
//! # Architecture
//!
//! - **Registry**: case-insensitive tool catalog, filled explicitly or via
//!   discovery from a candidate list
//! - **Schema**: JSON Schema generated from an explicit field list
//! - **Transports**: newline-delimited stdio, or a single-session HTTP
//!   endpoint
//! - **Lifecycle**: the server loop runs as a background task that can be
//!   started, stopped and toggled
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol implementation
//! - [`tools`]: Built-in tools

pub mod config;
pub mod error;
pub mod mcp;
pub mod tools;
