//! JSON-RPC 2.0 request/response envelopes and structural request validation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rpc_error::{JsonRpcErrorObject, RpcError};

pub const JSONRPC_VERSION: &str = "2.0";

/// A request envelope that already passed [`validate_jsonrpc_request`].
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub method: String,
    pub params: Option<Value>,
    pub id: Value,
}

impl JsonRpcRequest {
    /// Params as handlers receive them; absent params become an empty object.
    pub fn params_or_default(&self) -> Value {
        self.params
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()))
    }
}

/// Exactly one of `result` / `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JsonRpcOutcome {
    #[serde(rename = "result")]
    Success(Value),
    #[serde(rename = "error")]
    Failure(JsonRpcErrorObject),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(flatten)]
    pub outcome: JsonRpcOutcome,
    pub id: Value,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: JsonRpcOutcome::Success(result),
            id,
        }
    }

    pub fn failure(id: Value, error: &RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            outcome: JsonRpcOutcome::Failure(error.to_error_object()),
            id,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            JsonRpcOutcome::Success(value) => Some(value),
            JsonRpcOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&JsonRpcErrorObject> {
        match &self.outcome {
            JsonRpcOutcome::Success(_) => None,
            JsonRpcOutcome::Failure(error) => Some(error),
        }
    }
}

/// Best-effort id extraction used when a request is rejected before validation completes.
pub fn request_id_of(raw: &Value) -> Value {
    raw.as_object()
        .and_then(|object| object.get("id"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Checks the envelope shape, stopping at the first failure.
///
/// Method existence is not checked here; that belongs to the dispatcher.
pub fn validate_jsonrpc_request(raw: &Value) -> Result<JsonRpcRequest, RpcError> {
    let Some(object) = raw.as_object() else {
        return Err(RpcError::protocol("Request must be a JSON object"));
    };
    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(RpcError::protocol("jsonrpc version must be '2.0'"));
    }
    let Some(method) = object.get("method").and_then(Value::as_str) else {
        return Err(RpcError::protocol("Missing or invalid 'method'"));
    };
    let Some(id) = object.get("id") else {
        return Err(RpcError::protocol("Missing 'id'"));
    };
    let params = match object.get("params") {
        None => None,
        Some(params @ (Value::Object(_) | Value::Array(_))) => Some(params.clone()),
        Some(_) => {
            return Err(RpcError::protocol(
                "'params' must be an object or array if present",
            ))
        }
    };

    Ok(JsonRpcRequest {
        method: method.to_string(),
        params,
        id: id.clone(),
    })
}
