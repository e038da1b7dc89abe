//! MCP server dispatch loop.
//!
//! The loop reads one message at a time from a [`Transport`] and answers it
//! before reading the next, so responses leave in the order requests
//! arrived. It handles:
//!
//! - `initialize`: protocol version, capabilities and server info
//! - `ping`: empty result
//! - `tools/list`: every registered tool
//! - `tools/call`: resolve, execute under the tool timeout, wrap the result
//!
//! Anything else is answered with a method-not-found error. Notifications
//! are never answered.
//!
//! Failures inside a tool (error, panic, timeout, bad arguments) are tool
//! results with `isError` set, never JSON-RPC errors.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::ServerOptions;
use crate::error::TransportError;
use crate::mcp::messages::{
    InitializeParams, InitializeResult, ServerCapabilities, ServerInfo, ToolCallParams,
    ToolResult, ToolsListResult,
};
use crate::mcp::protocol::{ErrorCode, JsonRpcRequest, JsonRpcResponse, RequestId};
use crate::mcp::registry::{ToolDescriptor, ToolRegistry};
use crate::mcp::tool::{FactoryResolver, ToolContext, ToolResolver};
use crate::mcp::transport::Transport;

/// Detaches the loop from its transport when the loop ends or is dropped.
struct Attachment<'a>(&'a dyn Transport);

impl Drop for Attachment<'_> {
    fn drop(&mut self) {
        self.0.detach();
    }
}

/// The MCP server: a transport, a tool registry and a resolver.
pub struct McpServer {
    transport: Arc<dyn Transport>,
    registry: Arc<ToolRegistry>,
    resolver: Arc<dyn ToolResolver>,
    options: ServerOptions,
}

impl McpServer {
    /// Creates a server that builds tools from their descriptor handles.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: Arc<ToolRegistry>,
        options: ServerOptions,
    ) -> Self {
        Self {
            transport,
            registry,
            resolver: Arc::new(FactoryResolver),
            options,
        }
    }

    /// Replaces the service-resolution collaborator.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ToolResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The registry this server answers from.
    #[must_use]
    pub const fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The options this server was built with.
    #[must_use]
    pub const fn options(&self) -> &ServerOptions {
        &self.options
    }

    /// Runs the loop until `cancel` fires or the transport reaches end-of-stream.
    ///
    /// Cancellation also reaches any tool that is executing.
    ///
    /// # Errors
    ///
    /// Returns an error only if reading from the transport fails. Write
    /// failures are logged and the loop continues.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TransportError> {
        tracing::info!(
            server = %self.options.server_name,
            tools = self.registry.len(),
            "MCP server loop started"
        );

        self.transport.attach();
        let _attached = Attachment(self.transport.as_ref());

        loop {
            let request = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!("MCP server loop cancelled");
                    break;
                }
                read = self.transport.read_request() => match read? {
                    Some(request) => request,
                    None => {
                        tracing::info!("Transport closed, stopping MCP server loop");
                        break;
                    }
                },
            };

            if request.is_notification() {
                self.handle_notification(&request);
                continue;
            }

            if let Some(response) = self.handle_request(request, &cancel).await {
                if let Err(e) = self.transport.write_response(response).await {
                    tracing::error!(error = %e, "Failed to write response");
                }
            }
        }

        Ok(())
    }

    /// Produces the response for one request, or `None` for a notification.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        cancel: &CancellationToken,
    ) -> Option<JsonRpcResponse> {
        let JsonRpcRequest {
            id, method, params, ..
        } = request;
        let id = id?;

        let span = tracing::info_span!(
            "mcp.request",
            mcp.method = %method,
            mcp.request.id = %id,
            mcp.tool.name = tracing::field::Empty,
            mcp.success = tracing::field::Empty,
            mcp.error.message = tracing::field::Empty,
        );

        let response = async {
            tracing::debug!("Handling request");
            match method.as_str() {
                "initialize" => self.handle_initialize(id, params),
                "ping" => JsonRpcResponse::success(id, json!({})),
                "tools/list" => self.handle_tools_list(id),
                "tools/call" => self.handle_tools_call(id, params, cancel).await,
                _ => {
                    tracing::debug!("Unknown method");
                    JsonRpcResponse::method_not_found(id, &method)
                }
            }
        }
        .instrument(span.clone())
        .await;

        // tools/call records its own outcome from the tool result
        match &response.error {
            Some(error) => {
                span.record("mcp.success", false);
                span.record("mcp.error.message", error.message.as_str());
            }
            None if method != "tools/call" => {
                span.record("mcp.success", true);
            }
            None => {}
        }

        Some(response)
    }

    fn handle_notification(&self, notification: &JsonRpcRequest) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                tracing::info!(server = %self.options.server_name, "Client initialised");
            }
            "notifications/cancelled" => {
                let request_id = notification
                    .params
                    .as_ref()
                    .and_then(|p| p.get("requestId"))
                    .cloned()
                    .unwrap_or(Value::Null);
                tracing::info!(request_id = %request_id, "Client cancelled a request");
            }
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    fn handle_initialize(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        // client details are informational only
        match params.map(serde_json::from_value::<InitializeParams>).transpose() {
            Ok(Some(params)) => {
                let client = params.client_info.as_ref();
                tracing::info!(
                    client = client.and_then(|c| c.name.as_deref()).unwrap_or("unknown"),
                    client_version = client.and_then(|c| c.version.as_deref()).unwrap_or("unknown"),
                    requested_version = %params.protocol_version,
                    "Initialize request"
                );
            }
            Ok(None) => tracing::debug!("Initialize request without params"),
            Err(e) => tracing::debug!(error = %e, "Ignoring unreadable initialize params"),
        }

        let result = InitializeResult {
            protocol_version: self.options.protocol_version.clone(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo {
                name: self.options.server_name.clone(),
                version: self.options.server_version.clone(),
            },
        };
        Self::serialise(id, &result)
    }

    fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.registry.definitions(),
        };
        Self::serialise(id, &result)
    }

    async fn handle_tools_call(
        &self,
        id: RequestId,
        params: Option<Value>,
        cancel: &CancellationToken,
    ) -> JsonRpcResponse {
        let params: ToolCallParams = match params.map(serde_json::from_value).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => return JsonRpcResponse::invalid_params(id, "Missing tool call params"),
            Err(e) => {
                return JsonRpcResponse::invalid_params(id, format!("Invalid tool call params: {e}"))
            }
        };

        let span = tracing::Span::current();
        span.record("mcp.tool.name", params.name.as_str());

        let Some(descriptor) = self.registry.get(&params.name) else {
            tracing::warn!(tool = %params.name, "Tool not found");
            return JsonRpcResponse::failure(
                id,
                ErrorCode::MethodNotFound,
                format!("Tool not found: {}", params.name),
                None,
            );
        };

        let result = self
            .execute_tool(descriptor, params.arguments, id.clone(), cancel)
            .await;
        span.record("mcp.success", !result.is_error);

        Self::serialise(id, &result)
    }

    async fn execute_tool(
        &self,
        descriptor: &ToolDescriptor,
        arguments: Option<Value>,
        id: RequestId,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let tool = match self.resolver.resolve(descriptor) {
            Ok(tool) => tool,
            Err(e) => {
                tracing::error!(tool = %descriptor.name, error = %e, "Failed to resolve tool");
                return ToolResult::error(format!("Error executing tool '{}': {e}", descriptor.name));
            }
        };

        let token = cancel.child_token();
        let ctx = ToolContext {
            request_id: Some(id),
            cancellation: token.clone(),
        };
        let timeout = self.options.tool_timeout();
        let mut task = tokio::spawn(async move { tool.execute(arguments, ctx).await });

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Ok(result))) => {
                tracing::debug!(tool = %descriptor.name, is_error = result.is_error, "Tool finished");
                result
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(tool = %descriptor.name, error = %e, "Tool failed");
                ToolResult::error(format!("Error executing tool '{}': {e}", descriptor.name))
            }
            Ok(Err(join_error)) => {
                tracing::error!(tool = %descriptor.name, error = %join_error, "Tool task aborted");
                let reason = if join_error.is_panic() {
                    "tool panicked"
                } else {
                    "tool was cancelled"
                };
                ToolResult::error(format!("Error executing tool '{}': {reason}", descriptor.name))
            }
            Err(_) => {
                token.cancel();
                task.abort();
                tracing::warn!(tool = %descriptor.name, timeout_secs = timeout.as_secs(), "Tool timed out");
                ToolResult::error(format!(
                    "Tool '{}' timed out after {} seconds",
                    descriptor.name,
                    timeout.as_secs()
                ))
            }
        }
    }

    fn serialise<T: serde::Serialize>(id: RequestId, result: &T) -> JsonRpcResponse {
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise result");
                JsonRpcResponse::internal_error(id, "Internal error: failed to serialise result")
            }
        }
    }
}
