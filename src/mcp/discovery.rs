//! Discovery of tools from a list of candidate types.
//!
//! This is a convenience layer over [`ToolRegistry::register`]. The
//! application lists candidate types; discovery keeps those that carry
//! [`ToolMetadata`] and implement a tool contract, and builds a descriptor
//! for each from static declarations only.
//!
//! ```
//! use mcp_tool_server::mcp::discovery::{discover, ToolCandidate};
//! use mcp_tool_server::tools::{AppInfoTool, EchoTool};
//!
//! let tools = discover([ToolCandidate::typed::<EchoTool>(), ToolCandidate::tool::<AppInfoTool>()]);
//! assert_eq!(tools.len(), 2);
//! ```

use crate::mcp::registry::{ToolDescriptor, ToolRegistry};
use crate::mcp::schema::InputType;
use crate::mcp::tool::{Tool, ToolHandle, ToolMetadata, TypedTool};

/// A candidate type offered to discovery.
#[derive(Debug, Clone)]
pub struct ToolCandidate {
    type_name: &'static str,
    metadata: Option<(String, String)>,
    handle: Option<ToolHandle>,
    input_type: Option<InputType>,
}

impl ToolCandidate {
    /// Bare candidate with neither metadata nor an execution contract.
    #[must_use]
    pub const fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            metadata: None,
            handle: None,
            input_type: None,
        }
    }

    /// Input-less tool type carrying metadata.
    #[must_use]
    pub fn tool<T: Tool + ToolMetadata + Default + 'static>() -> Self {
        Self::new(std::any::type_name::<T>())
            .with_metadata(T::NAME, T::DESCRIPTION)
            .with_handle(ToolHandle::of::<T>())
    }

    /// Typed tool type carrying metadata; its input type is resolved from
    /// [`TypedTool::Input`].
    #[must_use]
    pub fn typed<T: TypedTool + ToolMetadata + Default>() -> Self {
        Self::new(std::any::type_name::<T>())
            .with_metadata(T::NAME, T::DESCRIPTION)
            .with_handle(ToolHandle::typed::<T>())
            .with_input(InputType::of::<T::Input>())
    }

    /// Tool type without metadata. Discovery skips it.
    #[must_use]
    pub fn unmarked<T: Tool + Default + 'static>() -> Self {
        Self::new(std::any::type_name::<T>()).with_handle(ToolHandle::of::<T>())
    }

    /// Type carrying metadata but no execution contract. Discovery skips it.
    #[must_use]
    pub fn metadata_only<T: ToolMetadata>() -> Self {
        Self::new(std::any::type_name::<T>()).with_metadata(T::NAME, T::DESCRIPTION)
    }

    /// Sets the tool name and description.
    #[must_use]
    pub fn with_metadata(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.metadata = Some((name.into(), description.into()));
        self
    }

    /// Sets the implementation handle.
    #[must_use]
    pub fn with_handle(mut self, handle: ToolHandle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Sets the declared input type.
    #[must_use]
    pub fn with_input(mut self, input_type: InputType) -> Self {
        self.input_type = Some(input_type);
        self
    }

    /// Name of the candidate type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn into_descriptor(self) -> Option<ToolDescriptor> {
        let Some((name, description)) = self.metadata else {
            tracing::debug!(type_name = self.type_name, "Skipping candidate without tool metadata");
            return None;
        };
        let Some(handle) = self.handle else {
            tracing::debug!(type_name = self.type_name, "Skipping candidate without tool contract");
            return None;
        };
        if name.trim().is_empty() || description.trim().is_empty() {
            tracing::warn!(
                type_name = self.type_name,
                "Skipping tool with empty name or description"
            );
            return None;
        }

        let descriptor = ToolDescriptor::new(name, description, handle);
        let descriptor = match self.input_type {
            Some(input_type) => descriptor.with_input(input_type),
            None => descriptor,
        };

        tracing::debug!(
            tool = %descriptor.name,
            type_name = self.type_name,
            "Discovered MCP tool"
        );
        Some(descriptor)
    }
}

/// Builds descriptors for every eligible candidate, in input order.
pub fn discover(candidates: impl IntoIterator<Item = ToolCandidate>) -> Vec<ToolDescriptor> {
    candidates
        .into_iter()
        .filter_map(ToolCandidate::into_descriptor)
        .collect()
}

/// Discovers tools and registers them. Returns how many were registered.
pub fn register_discovered(
    registry: &mut ToolRegistry,
    candidates: impl IntoIterator<Item = ToolCandidate>,
) -> usize {
    let descriptors = discover(candidates);
    let count = descriptors.len();
    for descriptor in descriptors {
        registry.register(descriptor);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::mcp::messages::ToolResult;
    use crate::mcp::schema::{InputField, ToolInput};
    use crate::mcp::tool::ToolContext;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Default)]
    struct TestTool;

    impl ToolMetadata for TestTool {
        const NAME: &'static str = "test_tool";
        const DESCRIPTION: &'static str = "A test tool";
    }

    #[async_trait]
    impl Tool for TestTool {
        async fn execute(&self, _: Option<Value>, _: ToolContext) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::text("Test result"))
        }
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    #[allow(dead_code)]
    struct QueryInput {
        query: String,
        limit: Option<i32>,
    }

    impl ToolInput for QueryInput {
        fn fields() -> Vec<InputField> {
            vec![
                InputField::new::<String>("query")
                    .describe("The search query")
                    .required(),
                InputField::new::<Option<i32>>("limit"),
            ]
        }
    }

    #[derive(Default)]
    struct QueryTool;

    impl ToolMetadata for QueryTool {
        const NAME: &'static str = "query_tool";
        const DESCRIPTION: &'static str = "A typed test tool";
    }

    #[async_trait]
    impl TypedTool for QueryTool {
        type Input = QueryInput;

        async fn call(&self, input: QueryInput, _: ToolContext) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::text(input.query))
        }
    }

    #[derive(Default)]
    struct WithoutMetadata;

    #[async_trait]
    impl Tool for WithoutMetadata {
        async fn execute(&self, _: Option<Value>, _: ToolContext) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::text("Should not be found"))
        }
    }

    struct NotATool;

    impl ToolMetadata for NotATool {
        const NAME: &'static str = "not_a_tool";
        const DESCRIPTION: &'static str = "Has metadata only";
    }

    fn candidates() -> Vec<ToolCandidate> {
        vec![
            ToolCandidate::tool::<TestTool>(),
            ToolCandidate::typed::<QueryTool>(),
            ToolCandidate::unmarked::<WithoutMetadata>(),
            ToolCandidate::metadata_only::<NotATool>(),
        ]
    }

    #[test]
    fn finds_tools_with_metadata() {
        let names: Vec<_> = discover(candidates()).into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["test_tool", "query_tool"]);
    }

    #[test]
    fn extracts_metadata() {
        let tools = discover(candidates());
        let tool = tools.iter().find(|d| d.name == "test_tool").unwrap();
        assert_eq!(tool.description, "A test tool");
        assert!(tool.handle.type_name().ends_with("TestTool"));
        assert!(tool.input_type.is_none());
        assert_eq!(tool.input_schema, json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn resolves_input_type_and_schema() {
        let tools = discover(candidates());
        let tool = tools.iter().find(|d| d.name == "query_tool").unwrap();

        let input = tool.input_type.as_ref().unwrap();
        assert!(input.type_name.ends_with("QueryInput"));
        assert_eq!(tool.input_schema["type"], "object");
        assert_eq!(tool.input_schema["properties"]["query"]["type"], "string");
        assert_eq!(tool.input_schema["properties"]["limit"]["type"], "integer");
        assert_eq!(tool.input_schema["required"], json!(["query"]));
    }

    #[test]
    fn skips_empty_metadata() {
        let candidate = ToolCandidate::unmarked::<WithoutMetadata>().with_metadata("  ", "desc");
        assert!(discover([candidate]).is_empty());
    }

    #[test]
    fn registers_discovered_tools() {
        let mut registry = ToolRegistry::new();
        let count = register_discovered(&mut registry, candidates());
        assert_eq!(count, 2);
        assert!(registry.contains("TEST_TOOL"));
        assert!(registry.contains("query_tool"));
        assert!(!registry.contains("not_a_tool"));
    }
}
