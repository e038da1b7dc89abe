//! Built-in tools.
//!
//! - [`AppInfoTool`] (`get_app_info`): server identity and platform
//! - [`EchoTool`] (`echo`): returns `Echo: {message}`

mod app_info;
mod echo;

pub use app_info::AppInfoTool;
pub use echo::{EchoInput, EchoTool};

use std::sync::Arc;

use crate::config::ServerOptions;
use crate::mcp::discovery::{register_discovered, ToolCandidate};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::tool::ToolHandle;

/// Candidates for the built-in tools.
///
/// `get_app_info` shares one instance built from `options` so it reports
/// the configured identity.
#[must_use]
pub fn builtin_candidates(options: &ServerOptions) -> Vec<ToolCandidate> {
    let app_info = ToolHandle::shared(
        std::any::type_name::<AppInfoTool>(),
        Arc::new(AppInfoTool::new(options)),
    );
    vec![
        ToolCandidate::tool::<AppInfoTool>().with_handle(app_info),
        ToolCandidate::typed::<EchoTool>(),
    ]
}

/// Registers the built-in tools. Returns how many were registered.
pub fn register_builtin(registry: &mut ToolRegistry, options: &ServerOptions) -> usize {
    register_discovered(registry, builtin_candidates(options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::tool::{Tool, ToolContext};

    #[test]
    fn registers_both_tools() {
        let mut registry = ToolRegistry::new();
        assert_eq!(register_builtin(&mut registry, &ServerOptions::default()), 2);

        let names: Vec<_> = registry.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["get_app_info", "echo"]);
        assert_eq!(
            registry.get("get_app_info").unwrap().input_schema,
            serde_json::json!({"type": "object", "properties": {}})
        );
    }

    #[tokio::test]
    async fn app_info_uses_configured_name() {
        let options = ServerOptions {
            server_name: "configured".to_string(),
            ..ServerOptions::default()
        };
        let mut registry = ToolRegistry::new();
        register_builtin(&mut registry, &options);

        let tool = registry.get("get_app_info").unwrap().handle.instantiate();
        let result = tool.execute(None, ToolContext::detached()).await.unwrap();
        assert!(result.joined_text().contains("Application: configured"));
    }
}
