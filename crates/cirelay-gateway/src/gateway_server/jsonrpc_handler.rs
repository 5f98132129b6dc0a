//! `POST /jsonrpc`.

use super::*;

pub(super) async fn handle_jsonrpc(
    State(state): State<Arc<GatewayServerState>>,
    body: Bytes,
) -> Response {
    let reply = match serde_json::from_slice::<Value>(&body) {
        Ok(raw) => state.dispatcher.dispatch_value(&raw).await,
        Err(error) => {
            debug!(%error, bytes = body.len(), "json-rpc body is not valid json");
            DispatchReply {
                id: Value::Null,
                outcome: Err(RpcError::protocol(format!("Parse error: {error}"))),
            }
        }
    };
    let status = if reply.is_success() {
        StatusCode::OK
    } else if reply.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(reply.into_response())).into_response()
}
