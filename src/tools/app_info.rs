//! `get_app_info`: reports the server's identity and the host platform.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ServerOptions;
use crate::error::ToolError;
use crate::mcp::messages::ToolResult;
use crate::mcp::tool::{Tool, ToolContext, ToolMetadata};

/// Returns application name, version and runtime details.
#[derive(Debug, Clone)]
pub struct AppInfoTool {
    name: String,
    version: String,
    protocol_version: String,
}

impl AppInfoTool {
    /// Reports the identity configured in `options`.
    #[must_use]
    pub fn new(options: &ServerOptions) -> Self {
        Self {
            name: options.server_name.clone(),
            version: options.server_version.clone(),
            protocol_version: options.protocol_version.clone(),
        }
    }

    fn report(&self) -> String {
        format!(
            "Application: {}\nVersion: {}\nProtocol: {}\nRuntime: Rust ({} {})\nOS: {} ({})",
            self.name,
            self.version,
            self.protocol_version,
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

impl Default for AppInfoTool {
    fn default() -> Self {
        Self::new(&ServerOptions::default())
    }
}

impl ToolMetadata for AppInfoTool {
    const NAME: &'static str = "get_app_info";
    const DESCRIPTION: &'static str =
        "Returns information about the application including name, version, and runtime details";
}

#[async_trait]
impl Tool for AppInfoTool {
    async fn execute(
        &self,
        _arguments: Option<Value>,
        _ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(self.report()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_configured_identity() {
        let options = ServerOptions {
            server_name: "my-app".to_string(),
            server_version: "1.2.3".to_string(),
            ..ServerOptions::default()
        };
        let result = AppInfoTool::new(&options)
            .execute(None, ToolContext::detached())
            .await
            .unwrap();

        let text = result.joined_text();
        assert!(text.contains("Application: my-app"));
        assert!(text.contains("Version: 1.2.3"));
        assert!(text.contains(std::env::consts::OS));
    }

    #[tokio::test]
    async fn ignores_arguments() {
        let result = AppInfoTool::default()
            .execute(Some(serde_json::json!({"unused": 1})), ToolContext::detached())
            .await
            .unwrap();
        assert!(!result.is_error);
        assert!(result.joined_text().contains("mcp-tool-server"));
    }
}
