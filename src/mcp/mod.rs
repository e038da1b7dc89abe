//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes application-defined tools to AI clients over
//! JSON-RPC 2.0, using either stdio or a single-session HTTP endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       ServerLifecycle                        │
//! │                     (start / stop / toggle)                  │
//! │                              │                               │
//! │   ┌─────────────┐    ┌───────▼─────┐    ┌─────────────┐      │
//! │   │  Transport  │───▶│  McpServer  │───▶│ToolRegistry │      │
//! │   │(stdio/http) │◀───│   (loop)    │    │ + Resolver  │      │
//! │   └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                                ▲             │
//! │                                         discovery/schema     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05 by default.

pub mod discovery;
pub mod lifecycle;
pub mod messages;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod server;
pub mod tool;
pub mod transport;

pub use lifecycle::{ServerLifecycle, StateChanged};
pub use messages::{ToolContent, ToolResult, MCP_PROTOCOL_VERSION};
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use registry::{ToolDescriptor, ToolRegistry};
pub use server::McpServer;
pub use tool::{Tool, ToolContext, ToolMetadata, TypedTool};
pub use transport::{HttpTransport, StdioTransport, Transport};
