use std::{
    io::{Cursor, Write},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use cirelay_contract::{RpcError, RpcMethodHandler};
use cirelay_gateway::{
    build_gateway_router, build_provider_registry, GatewayServerConfig, GatewayServerState,
};
use cirelay_github::{GithubApiClient, GithubCredentials};
use httpmock::prelude::*;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use zip::{write::SimpleFileOptions, ZipWriter};

fn gateway_config(upstream_base: &str) -> GatewayServerConfig {
    let credentials =
        GithubCredentials::new("integration-token", "octo", "widgets").expect("credentials");
    GatewayServerConfig {
        bind: "127.0.0.1:0".to_string(),
        github_client: GithubApiClient::new(upstream_base, &credentials).expect("client"),
        stream_channel_capacity: 2,
    }
}

async fn spawn_gateway(state: GatewayServerState) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral listener");
    let addr = listener.local_addr().expect("listener addr");
    let app = build_gateway_router(Arc::new(state));
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    (addr, handle)
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

async fn call_jsonrpc(addr: SocketAddr, request: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/jsonrpc"))
        .json(&request)
        .send()
        .await
        .expect("jsonrpc request");
    let status = response.status().as_u16();
    let payload = response.json::<Value>().await.expect("jsonrpc body");
    (status, payload)
}

#[tokio::test]
async fn integration_fetch_logs_handle_opens_stream_of_archive_lines() {
    let upstream = MockServer::start_async().await;
    let blob_url = upstream.url("/blobs/run-123.zip");
    let logs = upstream.mock(|when, then| {
        when.method(GET)
            .path("/repos/octo/widgets/actions/runs/123/logs")
            .header("authorization", "Bearer integration-token");
        then.status(302).header("location", blob_url.as_str());
    });
    let archive = build_zip(&[
        ("build/1_setup.txt", "one\ntwo\nthree\n"),
        ("build/2_test.txt", "four\nfive\nsix"),
    ]);
    upstream.mock(|when, then| {
        when.method(GET).path("/blobs/run-123.zip");
        then.status(200).body(archive.clone());
    });

    let config = gateway_config(&upstream.base_url());
    let (addr, handle) = spawn_gateway(GatewayServerState::new(&config)).await;

    let (status, payload) = call_jsonrpc(
        addr,
        json!({
            "jsonrpc": "2.0",
            "method": "github/execute",
            "params": {"action": "fetch_logs", "run_id": 123},
            "id": 1
        }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        payload,
        json!({
            "jsonrpc": "2.0",
            "result": {"stream_url": "/stream/logs?run_id=123", "run_id": 123},
            "id": 1
        })
    );
    logs.assert_calls(0);

    let stream_url = payload["result"]["stream_url"].as_str().expect("stream url");
    let body = tokio::time::timeout(
        Duration::from_secs(5),
        async {
            reqwest::get(format!("http://{addr}{stream_url}"))
                .await
                .expect("stream request")
                .text()
                .await
                .expect("stream body")
        },
    )
    .await
    .expect("stream completes");
    handle.abort();

    let data_lines = body
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect::<Vec<_>>();
    assert_eq!(
        data_lines,
        vec![
            "[build/1_setup.txt] one",
            "[build/1_setup.txt] two",
            "[build/1_setup.txt] three",
            "[build/2_test.txt] four",
            "[build/2_test.txt] five",
            "[build/2_test.txt] six",
        ]
    );
    assert!(!body.contains("event: error"));
    logs.assert_calls(1);
}

#[tokio::test]
async fn integration_rerun_and_resource_listing_are_idempotent() {
    let upstream = MockServer::start_async().await;
    let rerun = upstream.mock(|when, then| {
        when.method(POST).path("/repos/octo/widgets/actions/runs/77/rerun");
        then.status(201);
    });
    upstream.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/workflows");
        then.status(200)
            .json_body(json!({"workflows": [{"id": 5, "name": "", "path": ".github/workflows/ci.yml"}]}));
    });
    upstream.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/runs");
        then.status(200).json_body(json!({"workflow_runs": []}));
    });
    upstream.mock(|when, then| {
        when.method(GET).path("/repos/octo/widgets/actions/runners");
        then.status(200).json_body(json!({"runners": [{"id": 9, "name": null}]}));
    });

    let config = gateway_config(&upstream.base_url());
    let (addr, handle) = spawn_gateway(GatewayServerState::new(&config)).await;

    let rerun_request = json!({
        "jsonrpc": "2.0",
        "method": "github/execute",
        "params": {"action": "rerun_run", "run_id": "77"},
        "id": "rerun"
    });
    let first = call_jsonrpc(addr, rerun_request.clone()).await;
    let second = call_jsonrpc(addr, rerun_request).await;
    assert_eq!(first, second);
    assert_eq!(first.0, 200);
    assert_eq!(
        first.1["result"],
        json!({"status": "run rerun triggered", "run_id": 77})
    );
    rerun.assert_calls(2);

    let list_request = json!({"jsonrpc": "2.0", "method": "github/resources/list", "id": 7});
    let (status, payload) = call_jsonrpc(addr, list_request).await;
    handle.abort();
    assert_eq!(status, 200);
    assert_eq!(
        payload["result"],
        json!([
            {"id": "wf_5", "type": "workflow", "name": ".github/workflows/ci.yml"},
            {"id": "runner_9", "type": "runner", "name": "9"}
        ])
    );
}

struct StaticVersionHandler;

#[async_trait]
impl RpcMethodHandler for StaticVersionHandler {
    async fn handle(&self, _params: Value) -> Result<Value, RpcError> {
        Ok(json!({"version": "1.2.3"}))
    }
}

#[tokio::test]
async fn integration_additional_provider_registers_without_dispatcher_changes() {
    let upstream = MockServer::start_async().await;
    let config = gateway_config(&upstream.base_url());
    let mut dispatcher = build_provider_registry(config.github_client.clone());
    dispatcher.register("gitea/version", Arc::new(StaticVersionHandler));
    let (addr, handle) =
        spawn_gateway(GatewayServerState::with_dispatcher(dispatcher, &config)).await;

    let (status, payload) = call_jsonrpc(
        addr,
        json!({"jsonrpc": "2.0", "method": "gitea/version", "id": 1}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(payload["result"], json!({"version": "1.2.3"}));

    let (status, payload) = call_jsonrpc(
        addr,
        json!({"jsonrpc": "2.0", "method": "jenkins/execute", "params": {"action": "build"}, "id": 2}),
    )
    .await;
    handle.abort();
    assert_eq!(status, 200);
    assert_eq!(payload["result"]["stub"], json!(true));
}
