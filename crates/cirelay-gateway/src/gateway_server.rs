//! axum server exposing `/jsonrpc`, `/stream/logs`, and `/healthz`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cirelay_contract::RpcError;
use cirelay_github::{stream_run_logs, GithubApiClient, LogStreamEvent};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::provider_registry::build_provider_registry;
use crate::rpc_dispatcher::{DispatchReply, RpcDispatcher};

mod endpoints;
mod jsonrpc_handler;
mod log_stream_handler;
mod server_bootstrap;
#[cfg(test)]
mod tests;
mod types;

pub use endpoints::{HEALTH_ENDPOINT, JSONRPC_ENDPOINT, LOG_STREAM_ENDPOINT};
pub use server_bootstrap::{build_gateway_router, run_gateway_server};

use jsonrpc_handler::handle_jsonrpc;
use log_stream_handler::handle_log_stream;
use types::{GatewayApiError, SseFrame};

#[derive(Clone)]
pub struct GatewayServerConfig {
    pub bind: String,
    pub github_client: GithubApiClient,
    pub stream_channel_capacity: usize,
}

pub struct GatewayServerState {
    dispatcher: RpcDispatcher,
    github_client: GithubApiClient,
    stream_channel_capacity: usize,
}

impl GatewayServerState {
    pub fn new(config: &GatewayServerConfig) -> Self {
        Self::with_dispatcher(
            build_provider_registry(config.github_client.clone()),
            config,
        )
    }

    /// State with a caller-supplied dispatcher, for extra providers.
    pub fn with_dispatcher(dispatcher: RpcDispatcher, config: &GatewayServerConfig) -> Self {
        Self {
            dispatcher,
            github_client: config.github_client.clone(),
            stream_channel_capacity: config.stream_channel_capacity.max(1),
        }
    }
}
