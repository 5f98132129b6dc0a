//! Listener bootstrap and router wiring.

use super::*;

pub async fn run_gateway_server(config: GatewayServerConfig) -> Result<()> {
    let bind_addr = config
        .bind
        .parse::<SocketAddr>()
        .with_context(|| format!("invalid --bind '{}': expected host:port", config.bind))?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind gateway server on {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve gateway server address")?;

    let state = Arc::new(GatewayServerState::new(&config));
    info!(
        addr = %local_addr,
        repo = %config.github_client.repo(),
        jsonrpc = JSONRPC_ENDPOINT,
        stream = LOG_STREAM_ENDPOINT,
        "gateway server listening"
    );

    let app = build_gateway_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("gateway server exited unexpectedly")?;
    info!("gateway server stopped");
    Ok(())
}

pub fn build_gateway_router(state: Arc<GatewayServerState>) -> Router {
    Router::new()
        .route(JSONRPC_ENDPOINT, post(handle_jsonrpc))
        .route(LOG_STREAM_ENDPOINT, get(handle_log_stream))
        .route(HEALTH_ENDPOINT, get(handle_health))
        .with_state(state)
}

async fn handle_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}
