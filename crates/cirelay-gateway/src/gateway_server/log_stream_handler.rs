//! `GET /stream/logs?run_id=<n>`.

use super::*;

#[derive(Debug, Default, Deserialize)]
pub(super) struct LogStreamQuery {
    #[serde(default)]
    run_id: Option<String>,
}

fn parse_stream_run_id(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|run_id| *run_id > 0)
}

pub(super) async fn handle_log_stream(
    State(state): State<Arc<GatewayServerState>>,
    Query(query): Query<LogStreamQuery>,
) -> Response {
    let Some(run_id) = parse_stream_run_id(query.run_id.as_deref()) else {
        return GatewayApiError::unprocessable("run_id must be a positive integer").into_response();
    };
    info!(run_id, "log stream opened");
    let events = stream_run_logs(
        state.github_client.clone(),
        run_id,
        state.stream_channel_capacity,
    )
    .map(|event| Ok::<Event, Infallible>(SseFrame::from(event).into_event()));
    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}
