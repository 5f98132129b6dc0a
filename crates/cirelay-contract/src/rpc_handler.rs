//! Handler capability shared by every provider method.

use async_trait::async_trait;
use serde_json::Value;

use crate::rpc_error::RpcError;

/// One dispatchable JSON-RPC method.
///
/// Providers implement this for each method they expose and register the
/// implementation with the gateway dispatcher; the dispatcher itself never
/// needs to know which provider it is talking to.
#[async_trait]
pub trait RpcMethodHandler: Send + Sync {
    async fn handle(&self, params: Value) -> Result<Value, RpcError>;
}

/// Strict positive-integer check for JSON values (`1`, not `"1"` or `1.0`).
pub fn positive_integer(value: &Value) -> Option<u64> {
    value.as_u64().filter(|number| *number > 0)
}
