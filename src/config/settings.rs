//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::mcp::messages::MCP_PROTOCOL_VERSION;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server identity, timeouts and HTTP settings.
    #[serde(default)]
    pub server: ServerOptions,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()
    }
}

/// Options for the MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerOptions {
    /// Name reported in `serverInfo`.
    pub server_name: String,

    /// Version reported in `serverInfo`.
    pub server_version: String,

    /// MCP protocol version reported by `initialize`.
    pub protocol_version: String,

    /// Upper bound on a single tool execution, in seconds.
    pub tool_timeout_secs: u64,

    /// Serve over HTTP instead of stdio.
    pub http_enabled: bool,

    /// Host the HTTP listener binds to.
    pub http_host: String,

    /// Port the HTTP listener binds to. The next port is tried once if busy.
    pub http_port: u16,

    /// Path of the HTTP endpoint.
    pub http_path: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            server_name: "mcp-tool-server".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            tool_timeout_secs: 60,
            http_enabled: false,
            http_host: "localhost".to_string(),
            http_port: 3333,
            http_path: "/mcp".to_string(),
        }
    }
}

impl ServerOptions {
    /// Tool execution timeout as a [`Duration`].
    #[must_use]
    pub const fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| -> Result<(), ConfigError> {
            Err(ConfigError::ValidationError {
                message: message.to_string(),
            })
        };

        if self.server_name.trim().is_empty() {
            return invalid("server.server_name must not be empty");
        }
        if self.server_version.trim().is_empty() {
            return invalid("server.server_version must not be empty");
        }
        if self.protocol_version.trim().is_empty() {
            return invalid("server.protocol_version must not be empty");
        }
        if self.tool_timeout_secs == 0 {
            return invalid("server.tool_timeout_secs must be greater than zero");
        }
        if self.http_host.trim().is_empty() {
            return invalid("server.http_host must not be empty");
        }
        if self.http_port == 0 {
            return invalid("server.http_port must not be zero");
        }
        if !self.http_path.starts_with('/') {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "server.http_path '{}' must start with '/'",
                    self.http_path
                ),
            });
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
