//! Error types for mcp-tool-server.
//!
//! Three families are kept apart:
//!
//! - [`ConfigError`] for loading and validating the configuration file
//! - [`TransportError`] for stdio/HTTP I/O failures
//! - [`ToolError`] for failures raised by tool code, which the server turns
//!   into `isError` tool results rather than JSON-RPC errors

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Reading from or writing to the underlying stream failed.
    #[error("transport I/O error")]
    Io(#[from] std::io::Error),

    /// A message could not be serialised.
    #[error("failed to serialise message")]
    Serialise(#[from] serde_json::Error),

    /// The configured host name did not resolve to any address.
    #[error("could not resolve listen address {host}:{port}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },

    /// The HTTP listener could not be bound.
    #[error("failed to bind HTTP listener on {addr}")]
    Bind {
        /// Address that was tried last.
        addr: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP transport was started twice.
    #[error("HTTP transport already started")]
    AlreadyStarted,
}

/// Errors raised while resolving or executing a tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The call arguments do not match the tool's input type.
    #[error("invalid arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),

    /// The tool ran and failed.
    #[error("{0}")]
    Failed(String),

    /// No instance could be produced for the tool's implementation handle.
    #[error("tool implementation '{0}' could not be resolved")]
    Unresolved(String),
}

impl ToolError {
    /// Creates a [`ToolError::Failed`] from any message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
