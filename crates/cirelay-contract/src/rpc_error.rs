//! Uniform error model shared by every JSON-RPC handler.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Error classes surfaced on the wire.
pub enum RpcErrorKind {
    /// Malformed JSON-RPC envelope.
    Protocol,
    MethodNotFound,
    /// Missing or invalid action parameters, unknown action, non-positive run id.
    InvalidArgument,
    /// Unexpected upstream status, decode failure, or any unhandled internal failure.
    Upstream,
}

impl RpcErrorKind {
    pub fn code(self) -> i64 {
        match self {
            Self::Protocol => INVALID_REQUEST,
            Self::MethodNotFound => METHOD_NOT_FOUND,
            Self::InvalidArgument => INVALID_PARAMS,
            Self::Upstream => INTERNAL_ERROR,
        }
    }

    /// True when the caller sent something we refuse to process.
    pub fn is_client_error(self) -> bool {
        !matches!(self, Self::Upstream)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protocol => "protocol_error",
            Self::MethodNotFound => "method_not_found",
            Self::InvalidArgument => "invalid_argument",
            Self::Upstream => "upstream_error",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
/// Structured failure carrying a wire code, a short message, and optional diagnostics.
pub struct RpcError {
    kind: RpcErrorKind,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    pub fn new(kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(RpcErrorKind::Protocol, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            RpcErrorKind::MethodNotFound,
            format!("Method '{method}' not found"),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(RpcErrorKind::InvalidArgument, message)
    }

    pub fn upstream(message: impl Into<String>, data: Value) -> Self {
        Self::new(RpcErrorKind::Upstream, message).with_data(data)
    }

    /// Wraps an unexpected failure; the raw text travels as `data`, never as a trace.
    pub fn internal(detail: impl Display) -> Self {
        Self::new(RpcErrorKind::Upstream, "Internal error")
            .with_data(Value::String(detail.to_string()))
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn kind(&self) -> RpcErrorKind {
        self.kind
    }

    pub fn code(&self) -> i64 {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject {
            code: self.code(),
            message: self.message.clone(),
            data: self.data.clone(),
        }
    }
}

/// Wire shape of the `error` member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}
