//! Gateway router tests against a mocked upstream.
use std::io::{Cursor, Write};
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use cirelay_github::GithubCredentials;
use httpmock::prelude::*;
use tower::ServiceExt;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::*;

fn test_config(upstream_base: &str) -> GatewayServerConfig {
    let credentials = GithubCredentials::new("test-token", "octo", "widgets").expect("credentials");
    GatewayServerConfig {
        bind: "127.0.0.1:0".to_string(),
        github_client: GithubApiClient::new(upstream_base, &credentials).expect("client"),
        stream_channel_capacity: 4,
    }
}

fn test_router(upstream_base: &str) -> Router {
    let config = test_config(upstream_base);
    build_gateway_router(Arc::new(GatewayServerState::new(&config)))
}

fn build_zip(members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip member");
        writer.write_all(contents.as_bytes()).expect("write zip member");
    }
    writer.finish().expect("finish zip").into_inner()
}

async fn post_jsonrpc(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(JSONRPC_ENDPOINT)
        .header("content-type", "application/json")
        .body(body.into())
        .expect("build request");
    let response = app.oneshot(request).await.expect("jsonrpc response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let payload = serde_json::from_slice::<Value>(&bytes).expect("json body");
    (status, payload)
}

async fn spawn_test_server(app: Router) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind ephemeral listener")?;
    let addr = listener.local_addr().context("resolve listener addr")?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok((addr, handle))
}

async fn read_event_stream(addr: SocketAddr, run_id: &str) -> (StatusCode, String, String) {
    let response = reqwest::Client::new()
        .get(format!("http://{addr}{LOG_STREAM_ENDPOINT}?run_id={run_id}"))
        .send()
        .await
        .expect("stream request");
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = tokio::time::timeout(Duration::from_secs(5), response.text())
        .await
        .expect("stream finished")
        .expect("stream body");
    (status, content_type, body)
}

#[tokio::test]
async fn unit_healthz_reports_ok() {
    let app = test_router("http://127.0.0.1:9");
    let request = Request::builder()
        .uri(HEALTH_ENDPOINT)
        .body(Body::empty())
        .expect("build request");
    let response = app.oneshot(request).await.expect("health response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    assert_eq!(
        serde_json::from_slice::<Value>(&bytes).expect("json"),
        json!({"status": "ok"})
    );
}

#[tokio::test]
async fn functional_fetch_logs_returns_stream_handle_without_upstream_call() {
    let server = MockServer::start_async().await;
    let logs = server.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/runs/123/logs");
        then.status(200).body("never fetched");
    });

    let (status, payload) = post_jsonrpc(
        test_router(&server.base_url()),
        r#"{"jsonrpc":"2.0","method":"github/execute","params":{"action":"fetch_logs","run_id":123},"id":1}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        payload,
        json!({
            "jsonrpc": "2.0",
            "result": {"stream_url": "/stream/logs?run_id=123", "run_id": 123},
            "id": 1
        })
    );
    logs.assert_calls(0);
}

#[tokio::test]
async fn functional_fetch_logs_with_invalid_run_id_is_rejected_before_upstream() {
    let server = MockServer::start_async().await;
    let logs = server.mock(|when, then| {
        when.method(GET);
        then.status(200);
    });

    for params in [
        json!({"action": "fetch_logs"}),
        json!({"action": "fetch_logs", "run_id": 0}),
        json!({"action": "fetch_logs", "run_id": -1}),
    ] {
        let body = json!({"jsonrpc": "2.0", "method": "github/execute", "params": params, "id": 4});
        let (status, payload) =
            post_jsonrpc(test_router(&server.base_url()), body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(payload["error"]["code"], json!(-32602));
        assert_eq!(payload["id"], json!(4));
    }
    logs.assert_calls(0);
}

#[tokio::test]
async fn regression_wrong_protocol_version_is_invalid_request() {
    let (status, payload) = post_jsonrpc(
        test_router("http://127.0.0.1:9"),
        r#"{"jsonrpc":"1.0","method":"github/execute","id":"abc"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"]["code"], json!(-32600));
    assert_eq!(payload["id"], json!("abc"));
    assert!(payload.get("result").is_none());
}

#[tokio::test]
async fn regression_unparseable_body_is_parse_error_with_null_id() {
    let (status, payload) =
        post_jsonrpc(test_router("http://127.0.0.1:9"), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["jsonrpc"], json!("2.0"));
    assert_eq!(payload["id"], Value::Null);
    assert_eq!(payload["error"]["code"], json!(-32600));
    assert!(payload["error"]["message"]
        .as_str()
        .expect("message")
        .starts_with("Parse error: "));
}

#[tokio::test]
async fn functional_unknown_method_is_not_found_with_echoed_id() {
    let (status, payload) = post_jsonrpc(
        test_router("http://127.0.0.1:9"),
        r#"{"jsonrpc":"2.0","method":"gitlab/execute","params":{},"id":{"k":[1,2]}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"]["code"], json!(-32601));
    assert_eq!(payload["id"], json!({"k": [1, 2]}));
}

#[tokio::test]
async fn functional_trigger_without_ref_never_reaches_upstream() {
    let server = MockServer::start_async().await;
    let dispatch = server.mock(|when, then| {
        when.method(POST)
            .path("/repos/octo/widgets/actions/workflows/ci.yml/dispatches");
        then.status(204);
    });

    let (status, payload) = post_jsonrpc(
        test_router(&server.base_url()),
        r#"{"jsonrpc":"2.0","method":"github/execute","params":{"action":"trigger_workflow","workflow_id":"ci.yml"},"id":2}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["error"]["code"], json!(-32602));
    assert!(payload["error"]["message"]
        .as_str()
        .expect("message")
        .contains("ref"));
    dispatch.assert_calls(0);
}

#[tokio::test]
async fn functional_upstream_failure_maps_to_http_500() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/repos/octo/widgets/actions/runs/55/cancel");
        then.status(409).body("{\"message\":\"Cannot cancel a completed run\"}");
    });

    let (status, payload) = post_jsonrpc(
        test_router(&server.base_url()),
        r#"{"jsonrpc":"2.0","method":"github/execute","params":{"action":"cancel_run","run_id":55},"id":3}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(payload["error"]["code"], json!(-32603));
    assert_eq!(payload["error"]["data"]["status"], json!(409));
    assert_eq!(payload["id"], json!(3));
}

#[tokio::test]
async fn functional_resources_list_routes_to_github_and_jenkins() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/workflows");
        then.status(200)
            .json_body(json!({"workflows": [{"id": 1, "name": "CI"}]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/runs");
        then.status(200)
            .json_body(json!({"workflow_runs": [{"id": 2, "head_branch": "main"}]}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/runners");
        then.status(200).json_body(json!({"runners": []}));
    });

    let (status, payload) = post_jsonrpc(
        test_router(&server.base_url()),
        r#"{"jsonrpc":"2.0","method":"github/resources/list","id":10}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        payload["result"],
        json!([
            {"id": "wf_1", "type": "workflow", "name": "CI"},
            {"id": "run_2", "type": "workflow_run", "name": "main"}
        ])
    );

    let (status, payload) = post_jsonrpc(
        test_router(&server.base_url()),
        r#"{"jsonrpc":"2.0","method":"jenkins/resources/list","id":11}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["result"][0]["type"], json!("job"));
}

#[tokio::test]
async fn regression_stream_rejects_invalid_run_id_with_422() {
    for query in ["", "?run_id=", "?run_id=0", "?run_id=-7", "?run_id=abc"] {
        let app = test_router("http://127.0.0.1:9");
        let request = Request::builder()
            .uri(format!("{LOG_STREAM_ENDPOINT}{query}"))
            .body(Body::empty())
            .expect("build request");
        let response = app.oneshot(request).await.expect("stream response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "query {query}");
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(
            serde_json::from_slice::<Value>(&bytes).expect("json"),
            json!({"error": "run_id must be a positive integer"})
        );
    }
}

#[tokio::test]
async fn integration_stream_emits_prefixed_archive_lines_as_sse_data() {
    let server = MockServer::start_async().await;
    let archive = build_zip(&[
        ("0_setup.txt", "checkout\ninstall\n"),
        ("1_test.txt", "cargo test\nok\n"),
    ]);
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/runs/123/logs");
        then.status(200).body(archive.clone());
    });

    let (addr, handle) = spawn_test_server(test_router(&server.base_url()))
        .await
        .expect("spawn server");
    let (status, content_type, body) = read_event_stream(addr, "123").await;
    handle.abort();

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.contains("text/event-stream"));
    assert_eq!(
        body,
        "data: [0_setup.txt] checkout\n\n\
         data: [0_setup.txt] install\n\n\
         data: [1_test.txt] cargo test\n\n\
         data: [1_test.txt] ok\n\n"
    );
}

#[tokio::test]
async fn integration_stream_reports_upstream_failure_in_band() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/runs/404/logs");
        then.status(404).body("Not Found");
    });

    let (addr, handle) = spawn_test_server(test_router(&server.base_url()))
        .await
        .expect("spawn server");
    let (status, _, body) = read_event_stream(addr, "404").await;
    handle.abort();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "event: error\ndata: Failed to fetch logs: 404 Not Found\n\n");
}

#[tokio::test]
async fn regression_stream_strips_embedded_carriage_returns() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/runs/8/logs");
        then.status(200).body("progress 10%\rprogress 20%\ndone\n");
    });

    let (addr, handle) = spawn_test_server(test_router(&server.base_url()))
        .await
        .expect("spawn server");
    let (_, _, body) = read_event_stream(addr, "8").await;
    handle.abort();

    assert_eq!(body, "data: progress 10%progress 20%\n\ndata: done\n\n");
}

#[test]
fn unit_sse_frame_maps_stream_events() {
    assert_eq!(
        SseFrame::from(LogStreamEvent::Data("line".to_string())),
        SseFrame::Data("line".to_string())
    );
    assert_eq!(
        SseFrame::from(LogStreamEvent::Error("boom".to_string())),
        SseFrame::Error("boom".to_string())
    );
}
