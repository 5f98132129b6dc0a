//! Streaming log emitter: one upstream download re-emitted as ordered line events.
//!
//! The archive decode loop runs on the blocking pool and feeds a bounded
//! channel, so a huge archive never holds an async worker and a slow client
//! applies backpressure to decoding. Dropping the returned stream stops both
//! the download wait and the decode loop.

use reqwest::StatusCode;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::github_api_client::GithubApiClient;
use crate::github_transport_helpers::{
    sample_lines, truncate_for_error, ERROR_BODY_MAX_CHARS, SAMPLE_LINE_COUNT,
};
use crate::log_archive::{decode_line, probe_log_body, split_raw_lines, LogArchiveError, LogBody};

pub const DEFAULT_LOG_STREAM_CHANNEL_CAPACITY: usize = 64;
/// Upper bound on buffered events; larger requests are clamped.
pub const MAX_LOG_STREAM_CHANNEL_CAPACITY: usize = 65_536;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogStreamEvent {
    Data(String),
    /// Terminal or diagnostic failure delivered in-band.
    Error(String),
}

/// Starts streaming the logs of `run_id`; the returned stream is single-pass.
///
/// `channel_capacity` is clamped to `1..=MAX_LOG_STREAM_CHANNEL_CAPACITY`.
pub fn stream_run_logs(
    client: GithubApiClient,
    run_id: u64,
    channel_capacity: usize,
) -> ReceiverStream<LogStreamEvent> {
    spawn_log_stream(client, run_id, channel_capacity).0
}

pub(crate) fn spawn_log_stream(
    client: GithubApiClient,
    run_id: u64,
    channel_capacity: usize,
) -> (ReceiverStream<LogStreamEvent>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(clamp_channel_capacity(channel_capacity));
    let producer = tokio::spawn(produce_run_log_events(client, run_id, tx));
    (ReceiverStream::new(rx), producer)
}

fn clamp_channel_capacity(requested: usize) -> usize {
    requested.clamp(1, MAX_LOG_STREAM_CHANNEL_CAPACITY)
}

async fn produce_run_log_events(
    client: GithubApiClient,
    run_id: u64,
    tx: mpsc::Sender<LogStreamEvent>,
) {
    let download = tokio::select! {
        _ = tx.closed() => {
            debug!(run_id, "log stream closed before download completed");
            return;
        }
        result = client.download_run_logs(run_id) => result,
    };
    let response = match download {
        Ok(response) => response,
        Err(error) => {
            warn!(run_id, %error, "log stream download failed");
            let _ = tx
                .send(LogStreamEvent::Error(format!(
                    "Failed to fetch logs: {error}"
                )))
                .await;
            return;
        }
    };

    let redirect = response.redirect_target();
    if response.status != StatusCode::OK {
        let body = response.body_text();
        warn!(
            run_id,
            status = response.status.as_u16(),
            redirect = redirect.as_deref().unwrap_or("none"),
            body = %truncate_for_error(&body, ERROR_BODY_MAX_CHARS),
            "log stream upstream returned non-success status"
        );
        if let Some(target) = redirect {
            if tx
                .send(LogStreamEvent::Error(format!("Redirected to: {target}")))
                .await
                .is_err()
            {
                return;
            }
        }
        let _ = tx
            .send(LogStreamEvent::Error(format!(
                "Failed to fetch logs: {} {body}",
                response.status.as_u16()
            )))
            .await;
        return;
    }

    info!(
        run_id,
        bytes = response.body.len(),
        redirect = redirect.as_deref().unwrap_or("none"),
        "log stream download complete"
    );
    let body = response.body;
    let decode = tokio::task::spawn_blocking(move || {
        let outcome = emit_log_lines(&body, &tx);
        if let Err(error) = &outcome {
            let _ = tx.blocking_send(LogStreamEvent::Error(format!(
                "Failed to decode logs: {error}"
            )));
        }
        outcome
    })
    .await;
    match decode {
        Ok(Ok(summary)) => debug!(
            run_id,
            emitted = summary.emitted,
            archive = summary.archive,
            client_gone = summary.receiver_dropped,
            sample = ?summary.sample,
            "log stream finished"
        ),
        Ok(Err(error)) => warn!(run_id, %error, "log stream decode failed"),
        Err(error) => warn!(run_id, %error, "log stream decode task aborted"),
    }
}

#[derive(Debug, Default)]
struct EmitSummary {
    emitted: usize,
    archive: bool,
    receiver_dropped: bool,
    sample: Vec<String>,
}

impl EmitSummary {
    /// Sends one line; returns false once the receiver is gone.
    fn push(&mut self, tx: &mpsc::Sender<LogStreamEvent>, line: String) -> bool {
        if self.sample.len() < SAMPLE_LINE_COUNT {
            self.sample.extend(sample_lines([line.as_str()]));
        }
        if tx.blocking_send(LogStreamEvent::Data(line)).is_err() {
            self.receiver_dropped = true;
            return false;
        }
        self.emitted += 1;
        true
    }
}

/// Blocking decode loop. Holds the compressed body plus one member's lines at a time.
fn emit_log_lines(
    body: &[u8],
    tx: &mpsc::Sender<LogStreamEvent>,
) -> Result<EmitSummary, LogArchiveError> {
    let mut summary = EmitSummary::default();
    match probe_log_body(body)? {
        LogBody::Archive(mut archive) => {
            summary.archive = true;
            for index in 0..archive.member_count() {
                let Some(entry) = archive.read_member(index)? else {
                    continue;
                };
                for line in entry.prefixed_lines() {
                    if !summary.push(tx, line) {
                        return Ok(summary);
                    }
                }
            }
        }
        LogBody::PlainText(text) => {
            for raw in split_raw_lines(text) {
                if !summary.push(tx, decode_line(raw)) {
                    return Ok(summary);
                }
            }
        }
    }
    Ok(summary)
}
