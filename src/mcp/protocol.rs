//! JSON-RPC 2.0 message types for the MCP protocol.
//!
//! This module defines the envelope types shared by every transport.
//! All messages follow the JSON-RPC 2.0 specification.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has a non-null `id`)
//! - **Notification**: A request without `id` (or with `id: null`); never answered
//! - **Response**: A reply to a request, carrying either `result` or `error`

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// The JSON-RPC version string carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request ID.
///
/// Numeric ids keep their JSON form, so unsigned and fractional ids are
/// echoed back exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(Number),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// A JSON-RPC 2.0 request or notification.
///
/// A missing or `null` id marks a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// Request identifier, `None` for notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method, kept as raw JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a request with the given id.
    #[must_use]
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Creates a notification (no id).
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Returns `true` if no response should be sent for this message.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Validates that this is a well-formed JSON-RPC 2.0 request.
    ///
    /// Returns an error message if validation fails.
    #[must_use]
    pub fn validate(&self) -> Option<&'static str> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Some("jsonrpc field must be \"2.0\"");
        }
        if self.method.is_empty() {
            return Some("method field cannot be empty");
        }
        None
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Creates a new error from an error code with its default message.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for JsonRpcError {}

/// A JSON-RPC 2.0 response.
///
/// `result` and `error` are mutually exclusive; use [`JsonRpcResponse::success`]
/// or [`JsonRpcResponse::failure`] to build one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: String,

    /// The request ID this response corresponds to (`null` if unknown).
    pub id: Option<RequestId>,

    /// The result of the method call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// The error, if the call failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    pub fn success(id: impl Into<Option<RequestId>>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Creates a new error response.
    #[must_use]
    pub fn failure(
        id: impl Into<Option<RequestId>>,
        code: ErrorCode,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let mut error = JsonRpcError::with_message(code, message);
        error.data = data;
        Self::from_error(id, error)
    }

    /// Wraps an existing error object in a response.
    #[must_use]
    pub fn from_error(id: impl Into<Option<RequestId>>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            result: None,
            error: Some(error),
        }
    }

    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::failure(
            id,
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
            None,
        )
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::failure(id, ErrorCode::InvalidParams, message, None)
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::failure(id, ErrorCode::InternalError, message, None)
    }
}

/// An outgoing JSON-RPC 2.0 notification (server to client).
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingNotification {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingNotification {
    /// Creates a new outgoing notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }
}

/// Parses one JSON document into a request or notification.
///
/// # Errors
///
/// Returns a [`ErrorCode::ParseError`] error if the text is not JSON, and an
/// [`ErrorCode::InvalidRequest`] error if it is JSON but not a JSON-RPC 2.0
/// request object.
pub fn parse_request(json: &str) -> Result<JsonRpcRequest, JsonRpcError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| JsonRpcError::from_code(ErrorCode::ParseError).with_data(e.to_string().into()))?;

    if !value.is_object() {
        return Err(JsonRpcError::with_message(
            ErrorCode::InvalidRequest,
            "message must be a JSON object",
        ));
    }

    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|e| JsonRpcError::with_message(ErrorCode::InvalidRequest, e.to_string()))?;

    if let Some(problem) = request.validate() {
        return Err(JsonRpcError::with_message(ErrorCode::InvalidRequest, problem));
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let req = parse_request(json).unwrap();

        assert_eq!(req.id, Some(RequestId::from(1)));
        assert_eq!(req.method, "initialize");
        assert!(req.params.is_some());
        assert!(!req.is_notification());
    }

    #[test]
    fn parse_notification_without_id() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let req = parse_request(json).unwrap();

        assert!(req.is_notification());
        assert_eq!(req.method, "notifications/initialized");
    }

    #[test]
    fn parse_notification_with_null_id() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "initialized"}"#;
        let req = parse_request(json).unwrap();
        assert!(req.is_notification());
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, Some(RequestId::String("abc-123".to_string())));
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_request("not valid json").unwrap_err();
        assert_eq!(err.code, ErrorCode::ParseError.code());
    }

    #[test]
    fn parse_missing_jsonrpc() {
        let err = parse_request(r#"{"id": 1, "method": "test"}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn parse_wrong_jsonrpc_version() {
        let err = parse_request(r#"{"jsonrpc": "1.0", "id": 1, "method": "test"}"#).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn parse_non_object() {
        let err = parse_request("[1, 2, 3]").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn serialise_success_response_omits_error() {
        let response =
            JsonRpcResponse::success(RequestId::from(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn serialise_failure_response_omits_result_and_data() {
        let response = JsonRpcResponse::method_not_found(RequestId::from(1), "unknown/method");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("unknown/method"));
        assert!(!json.contains("result"));
        assert!(!json.contains("data"));
    }

    #[test]
    fn failure_keeps_data() {
        let response = JsonRpcResponse::failure(
            RequestId::from("x"),
            ErrorCode::InvalidParams,
            "bad",
            Some(serde_json::json!({"field": "name"})),
        );
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.data, Some(serde_json::json!({"field": "name"})));
        assert!(response.result.is_none());
    }

    #[test]
    fn unknown_id_serialises_as_null() {
        let response = JsonRpcResponse::from_error(
            None::<RequestId>,
            JsonRpcError::from_code(ErrorCode::ParseError),
        );
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""id":null"#));
    }

    #[test]
    fn parse_large_and_fractional_ids() {
        let req = parse_request(r#"{"jsonrpc": "2.0", "id": 18446744073709551615, "method": "ping"}"#)
            .unwrap();
        let response = JsonRpcResponse::success(req.id.unwrap(), serde_json::json!({}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""id":18446744073709551615"#));

        let req = parse_request(r#"{"jsonrpc": "2.0", "id": 1.5, "method": "ping"}"#).unwrap();
        assert!(!req.is_notification());
        assert_eq!(req.id.unwrap().to_string(), "1.5");
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::from(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
