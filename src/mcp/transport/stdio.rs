//! stdio transport for MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! Blank lines are skipped. Lines that are not valid JSON-RPC requests are
//! dropped with a warning; no error response is written for them.

use std::io;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

use crate::error::TransportError;
use crate::mcp::protocol::{parse_request, JsonRpcRequest, JsonRpcResponse, OutgoingNotification};
use crate::mcp::transport::Transport;

/// A line-oriented MCP transport.
///
/// Generic over the byte streams so it can be driven in memory; use
/// [`StdioTransport::stdio`] for the process's stdin/stdout.
pub struct StdioTransport<R, W> {
    /// Line reader over the input stream.
    reader: Mutex<Lines<BufReader<R>>>,
    /// Output stream; the lock is the single writer lock.
    writer: Mutex<W>,
}

impl StdioTransport<tokio::io::Stdin, tokio::io::Stdout> {
    /// Creates a transport bound to the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a transport over the given streams.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader).lines()),
            writer: Mutex::new(writer),
        }
    }

    /// Writes a raw JSON string with newline termination and flushes.
    async fn write_raw(&self, json: &str) -> io::Result<()> {
        // MCP stdio framing: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_request(&self) -> Result<Option<JsonRpcRequest>, TransportError> {
        let mut reader = self.reader.lock().await;

        loop {
            let line = match reader.next_line().await {
                Ok(Some(line)) => line,
                // EOF - input closed
                Ok(None) => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    tracing::warn!(error = %e, "Dropping input line that is not valid UTF-8");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let line = line.trim_start_matches('\u{feff}').trim();
            if line.is_empty() {
                continue;
            }

            match parse_request(line) {
                Ok(request) => return Ok(Some(request)),
                Err(error) => {
                    tracing::warn!(code = error.code, error = %error.message, "Dropping malformed message");
                }
            }
        }
    }

    async fn write_response(&self, response: JsonRpcResponse) -> Result<(), TransportError> {
        let json = serde_json::to_string(&response)?;
        self.write_raw(&json).await?;
        Ok(())
    }

    async fn write_notification(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<(), TransportError> {
        let json = serde_json::to_string(&OutgoingNotification::new(method, params))?;
        self.write_raw(&json).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::RequestId;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn reads_requests_and_skips_blank_lines() {
        let input = tokio_test::io::Builder::new()
            .read(b"\n   \n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n")
            .build();
        let transport = StdioTransport::new(input, tokio::io::sink());

        let request = transport.read_request().await.unwrap().unwrap();
        assert_eq!(request.method, "ping");
        assert_eq!(request.id, Some(RequestId::from(1)));
        assert!(transport.read_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn drops_malformed_lines() {
        let input = tokio_test::io::Builder::new()
            .read(b"not json\n{\"id\":2,\"method\":\"x\"}\n")
            .read(b"{\"jsonrpc\":\"2.0\",\"method\":\"initialized\"}\r\n")
            .build();
        let transport = StdioTransport::new(input, tokio::io::sink());

        let request = transport.read_request().await.unwrap().unwrap();
        assert_eq!(request.method, "initialized");
        assert!(request.is_notification());
    }

    #[tokio::test]
    async fn skips_lines_that_are_not_utf8() {
        let input = tokio_test::io::Builder::new()
            .read(b"\xff\xfe\n")
            .read(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n")
            .build();
        let transport = StdioTransport::new(input, tokio::io::sink());

        let request = transport.read_request().await.unwrap().unwrap();
        assert_eq!(request.method, "ping");
        assert_eq!(request.id, Some(RequestId::from(3)));
        assert!(transport.read_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn strips_byte_order_mark() {
        let input = tokio_test::io::Builder::new()
            .read("\u{feff}{\"jsonrpc\":\"2.0\",\"id\":\"a\",\"method\":\"ping\"}\n".as_bytes())
            .build();
        let transport = StdioTransport::new(input, tokio::io::sink());

        let request = transport.read_request().await.unwrap().unwrap();
        assert_eq!(request.id, Some(RequestId::String("a".to_string())));
    }

    #[tokio::test]
    async fn end_of_input_is_not_an_error() {
        let input = tokio_test::io::Builder::new().build();
        let transport = StdioTransport::new(input, tokio::io::sink());
        assert!(transport.read_request().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn writes_one_line_per_message() {
        let (client, server_out) = tokio::io::duplex(4096);
        let transport = StdioTransport::new(tokio::io::empty(), server_out);

        transport
            .write_response(JsonRpcResponse::success(
                RequestId::from(1),
                serde_json::json!({"message": "hello", "nested": {"key": "value"}}),
            ))
            .await
            .unwrap();
        transport
            .write_notification("notifications/tools/list_changed", None)
            .await
            .unwrap();
        drop(transport);

        let mut output = String::new();
        let mut client = client;
        client.read_to_string(&mut output).await.unwrap();

        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(r#""id":1"#));
        assert!(!lines[0].starts_with('\u{feff}'));
        assert_eq!(
            lines[1],
            r#"{"jsonrpc":"2.0","method":"notifications/tools/list_changed"}"#
        );
    }
}
