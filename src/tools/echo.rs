//! `echo`: returns the message it was given.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ToolError;
use crate::mcp::messages::ToolResult;
use crate::mcp::schema::{InputField, ToolInput};
use crate::mcp::tool::{ToolContext, ToolMetadata, TypedTool};

/// Input for [`EchoTool`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoInput {
    /// The message to echo back.
    pub message: String,
}

impl ToolInput for EchoInput {
    fn fields() -> Vec<InputField> {
        vec![InputField::new::<String>("message")
            .describe("The message to echo back")
            .required()]
    }
}

/// Echoes back the provided message.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoTool;

impl ToolMetadata for EchoTool {
    const NAME: &'static str = "echo";
    const DESCRIPTION: &'static str = "Echoes back the provided message";
}

#[async_trait]
impl TypedTool for EchoTool {
    type Input = EchoInput;

    async fn call(&self, input: EchoInput, _ctx: ToolContext) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::text(format!("Echo: {}", input.message)))
    }
}
