//! Message transports for the MCP server.
//!
//! A transport yields one inbound request at a time and accepts the
//! server's responses and notifications. Two implementations exist:
//!
//! - [`StdioTransport`]: newline-delimited JSON over any reader/writer pair
//!   (stdin/stdout in production)
//! - [`HttpTransport`]: single-session HTTP POST endpoint that funnels
//!   concurrent HTTP calls into the same sequential request stream
//!
//! Implementations serialise their writes internally, so a response and an
//! unsolicited notification can be written from different call sites.

mod http;
mod stdio;

pub use http::{HttpTransport, SESSION_HEADER};
pub use stdio::StdioTransport;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};

/// Contract between the server loop and a message transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Waits for the next inbound request or notification.
    ///
    /// Returns `Ok(None)` once the stream has ended. Dropping the returned
    /// future before it completes must not lose a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying stream fails.
    async fn read_request(&self) -> Result<Option<JsonRpcRequest>, TransportError>;

    /// Delivers a response to the client.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    async fn write_response(&self, response: JsonRpcResponse) -> Result<(), TransportError>;

    /// Sends a server-initiated notification.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    async fn write_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), TransportError>;

    /// Called when a server loop starts consuming from this transport.
    fn attach(&self) {}

    /// Called when that loop ends, however it ends.
    ///
    /// Transports that accept input on their own refuse it until the next
    /// [`attach`](Transport::attach).
    fn detach(&self) {}
}
