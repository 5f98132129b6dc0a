//! Method routing for validated JSON-RPC requests.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use cirelay_contract::{
    positive_integer, request_id_of, validate_jsonrpc_request, JsonRpcRequest, JsonRpcResponse,
    RpcError, RpcMethodHandler,
};
use futures_util::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

/// Answers `method` + `params.action == action` with a stream handle instead of invoking the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRedirect {
    pub method: String,
    pub action: String,
    pub stream_endpoint: String,
}

impl StreamRedirect {
    pub fn new(
        method: impl Into<String>,
        action: impl Into<String>,
        stream_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            action: action.into(),
            stream_endpoint: stream_endpoint.into(),
        }
    }

    fn matches(&self, request: &JsonRpcRequest) -> bool {
        request.method == self.method
            && request
                .params
                .as_ref()
                .and_then(|params| params.get("action"))
                .and_then(Value::as_str)
                == Some(self.action.as_str())
    }

    fn resolve(&self, params: &Value) -> Result<Value, RpcError> {
        let Some(raw_run_id) = params.get("run_id") else {
            return Err(RpcError::invalid_argument(format!(
                "missing required params for {}: run_id",
                self.action
            ))
            .with_data(json!({"action": self.action, "missing": ["run_id"]})));
        };
        let run_id = positive_integer(raw_run_id)
            .ok_or_else(|| RpcError::invalid_argument("'run_id' must be a positive integer"))?;
        Ok(json!({
            "stream_url": format!("{}?run_id={run_id}", self.stream_endpoint),
            "run_id": run_id,
        }))
    }
}

/// Outcome of one JSON-RPC exchange before it is encoded.
#[derive(Debug)]
pub struct DispatchReply {
    pub id: Value,
    pub outcome: Result<Value, RpcError>,
}

impl DispatchReply {
    /// True when the failure is attributable to the caller (HTTP 400 class).
    pub fn is_client_error(&self) -> bool {
        matches!(&self.outcome, Err(error) if error.kind().is_client_error())
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_response(self) -> JsonRpcResponse {
        match self.outcome {
            Ok(result) => JsonRpcResponse::success(self.id, result),
            Err(error) => JsonRpcResponse::failure(self.id, &error),
        }
    }
}

#[derive(Clone, Default)]
pub struct RpcDispatcher {
    handlers: BTreeMap<String, Arc<dyn RpcMethodHandler>>,
    stream_redirects: Vec<StreamRedirect>,
}

impl RpcDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method`, replacing any earlier registration.
    pub fn register(
        &mut self,
        method: impl Into<String>,
        handler: Arc<dyn RpcMethodHandler>,
    ) -> &mut Self {
        self.handlers.insert(method.into(), handler);
        self
    }

    pub fn register_stream_redirect(&mut self, redirect: StreamRedirect) -> &mut Self {
        self.stream_redirects.push(redirect);
        self
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn stream_redirects(&self) -> &[StreamRedirect] {
        &self.stream_redirects
    }

    /// Validates a decoded body and dispatches it.
    pub async fn dispatch_value(&self, raw: &Value) -> DispatchReply {
        match validate_jsonrpc_request(raw) {
            Ok(request) => {
                let outcome = self.dispatch(&request).await;
                DispatchReply {
                    id: request.id,
                    outcome,
                }
            }
            Err(error) => {
                debug!(%error, "rejected malformed json-rpc request");
                DispatchReply {
                    id: request_id_of(raw),
                    outcome: Err(error),
                }
            }
        }
    }

    pub async fn dispatch(&self, request: &JsonRpcRequest) -> Result<Value, RpcError> {
        let handler = self.handlers.get(&request.method).ok_or_else(|| {
            warn!(method = %request.method, "json-rpc method not found");
            RpcError::method_not_found(&request.method)
        })?;

        let params = request.params_or_default();
        if let Some(redirect) = self
            .stream_redirects
            .iter()
            .find(|redirect| redirect.matches(request))
        {
            debug!(
                method = %request.method,
                action = %redirect.action,
                endpoint = %redirect.stream_endpoint,
                "answering with stream handle"
            );
            return redirect.resolve(&params);
        }

        match AssertUnwindSafe(handler.handle(params)).catch_unwind().await {
            Ok(outcome) => {
                if let Err(error) = &outcome {
                    debug!(
                        method = %request.method,
                        code = error.code(),
                        kind = error.kind().as_str(),
                        error_message = error.message(),
                        "json-rpc handler returned error"
                    );
                }
                outcome
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                error!(method = %request.method, detail = %detail, "json-rpc handler panicked");
                Err(RpcError::internal(detail))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
