//! Route paths served by the gateway.

pub const JSONRPC_ENDPOINT: &str = "/jsonrpc";
pub const LOG_STREAM_ENDPOINT: &str = "/stream/logs";
pub const HEALTH_ENDPOINT: &str = "/healthz";
