//! Tool execution contracts.
//!
//! A tool is anything implementing [`Tool`]. Tools with a declared input
//! type implement [`TypedTool`] instead and are adapted through [`Typed`],
//! which deserialises the call arguments before invoking them.
//!
//! The server never constructs tools itself: a descriptor carries a
//! [`ToolHandle`] and a [`ToolResolver`] turns that handle into a ready
//! instance for each call.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ToolError;
use crate::mcp::messages::ToolResult;
use crate::mcp::protocol::RequestId;
use crate::mcp::registry::ToolDescriptor;
use crate::mcp::schema::ToolInput;

/// Per-invocation context handed to a tool.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Id of the `tools/call` request being served.
    pub request_id: Option<RequestId>,
    /// Cancelled when the call times out or the server stops.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// Creates a context that is never cancelled, for direct invocations.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            request_id: None,
            cancellation: CancellationToken::new(),
        }
    }
}

/// The untyped tool execution contract.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Executes the tool with the raw call arguments.
    ///
    /// # Errors
    ///
    /// Any error is reported to the client as an `isError` tool result.
    async fn execute(
        &self,
        arguments: Option<Value>,
        ctx: ToolContext,
    ) -> Result<ToolResult, ToolError>;
}

/// A tool with a declared, strongly-typed input.
#[async_trait]
pub trait TypedTool: Send + Sync + 'static {
    /// The input type the call arguments are deserialised into.
    type Input: ToolInput;

    /// Executes the tool.
    ///
    /// # Errors
    ///
    /// Any error is reported to the client as an `isError` tool result.
    async fn call(&self, input: Self::Input, ctx: ToolContext) -> Result<ToolResult, ToolError>;
}

/// Static name and description of a tool type.
pub trait ToolMetadata {
    /// Unique tool name, conventionally `snake_case`.
    const NAME: &'static str;
    /// Human-readable description shown to the client.
    const DESCRIPTION: &'static str;
}

/// Adapts a [`TypedTool`] to the untyped [`Tool`] contract.
pub struct Typed<T>(pub T);

#[async_trait]
impl<T: TypedTool> Tool for Typed<T> {
    async fn execute(
        &self,
        arguments: Option<Value>,
        ctx: ToolContext,
    ) -> Result<ToolResult, ToolError> {
        // absent or null arguments deserialise as an empty object
        let arguments = match arguments {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(value) => value,
        };
        let input: T::Input = serde_json::from_value(arguments).map_err(|e| {
            tracing::debug!(request_id = ?ctx.request_id, error = %e, "Arguments do not match tool input");
            ToolError::InvalidArguments(e)
        })?;
        self.0.call(input, ctx).await
    }
}

type Factory = dyn Fn() -> Arc<dyn Tool> + Send + Sync;

/// Implementation handle stored in a tool descriptor.
///
/// Cloning is cheap; the factory is shared.
#[derive(Clone)]
pub struct ToolHandle {
    type_name: &'static str,
    factory: Arc<Factory>,
}

impl ToolHandle {
    /// Creates a handle from a type name and a factory.
    pub fn new<F>(type_name: &'static str, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Tool> + Send + Sync + 'static,
    {
        Self {
            type_name,
            factory: Arc::new(factory),
        }
    }

    /// Handle that builds a fresh `T` for every call.
    #[must_use]
    pub fn of<T: Tool + Default + 'static>() -> Self {
        Self::new(std::any::type_name::<T>(), || Arc::new(T::default()))
    }

    /// Handle that builds a fresh typed `T` for every call.
    #[must_use]
    pub fn typed<T: TypedTool + Default>() -> Self {
        Self::new(std::any::type_name::<T>(), || Arc::new(Typed(T::default())))
    }

    /// Handle that hands out one shared instance.
    #[must_use]
    pub fn shared(type_name: &'static str, instance: Arc<dyn Tool>) -> Self {
        Self::new(type_name, move || Arc::clone(&instance))
    }

    /// Name of the implementing type.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Produces an instance.
    #[must_use]
    pub fn instantiate(&self) -> Arc<dyn Tool> {
        (self.factory)()
    }
}

impl fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandle")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Service-resolution seam: turns a descriptor into a ready tool instance.
pub trait ToolResolver: Send + Sync {
    /// Resolves an instance for the descriptor's implementation handle.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Unresolved`] if no instance can be produced.
    fn resolve(&self, descriptor: &ToolDescriptor) -> Result<Arc<dyn Tool>, ToolError>;
}

/// Resolver that simply invokes the handle's factory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FactoryResolver;

impl ToolResolver for FactoryResolver {
    fn resolve(&self, descriptor: &ToolDescriptor) -> Result<Arc<dyn Tool>, ToolError> {
        Ok(descriptor.handle.instantiate())
    }
}
