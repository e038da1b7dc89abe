//! Name-keyed catalog of callable tools.
//!
//! Names are matched case-insensitively. Registering a name that already
//! exists replaces the earlier descriptor (last write wins) and logs a
//! warning. Iteration follows first-registration order so `tools/list`
//! output is stable.
//!
//! The registry is populated at startup and then shared read-only with the
//! server loop; it performs no internal locking.

use indexmap::IndexMap;
use serde_json::Value;

use crate::mcp::messages::ToolDefinition;
use crate::mcp::schema::{empty_schema, InputType};
use crate::mcp::tool::{Tool, ToolHandle, TypedTool};

/// Runtime metadata about a registered tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Tool name, used in `tools/call`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Implementation handle passed to the resolver.
    pub handle: ToolHandle,
    /// Declared input type (`None` for input-less tools).
    pub input_type: Option<InputType>,
    /// JSON Schema for the input parameters.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Creates an input-less descriptor with the empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, handle: ToolHandle) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            handle,
            input_type: None,
            input_schema: empty_schema(),
        }
    }

    /// Describes an input-less tool type built with `Default`.
    #[must_use]
    pub fn untyped<T: Tool + Default + 'static>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, description, ToolHandle::of::<T>())
    }

    /// Describes a typed tool; the input schema is generated from its input type.
    #[must_use]
    pub fn typed<T: TypedTool + Default>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(name, description, ToolHandle::typed::<T>()).with_input(InputType::of::<T::Input>())
    }

    /// Sets the input type and regenerates the schema from it.
    #[must_use]
    pub fn with_input(mut self, input_type: InputType) -> Self {
        self.input_schema = input_type.schema();
        self.input_type = Some(input_type);
        self
    }

    /// Wire shape for `tools/list`.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// Runtime registry of available tools.
#[derive(Debug, Default, Clone)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    ///
    /// Returns the replaced descriptor, if any.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Option<ToolDescriptor> {
        let key = descriptor.name.to_lowercase();
        let name = descriptor.name.clone();
        let previous = self.tools.insert(key, descriptor);

        if previous.is_some() {
            tracing::warn!(tool = %name, "Tool already registered, overwriting");
        } else {
            tracing::debug!(tool = %name, "Registered MCP tool");
        }

        previous
    }

    /// Looks up a tool by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(&name.to_lowercase())
    }

    /// Returns `true` if a tool with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(&name.to_lowercase())
    }

    /// Returns a snapshot of all descriptors in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<ToolDescriptor> {
        self.tools.values().cloned().collect()
    }

    /// Iterates over the descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    /// Wire definitions for every registered tool.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.iter().map(ToolDescriptor::definition).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
