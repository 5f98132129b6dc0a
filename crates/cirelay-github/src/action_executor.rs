//! `github/execute`: maps logical actions onto GitHub Actions REST calls.

use std::fmt;

use async_trait::async_trait;
use cirelay_contract::{positive_integer, RpcError, RpcMethodHandler};
use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::github_api_client::GithubApiClient;
use crate::github_transport_helpers::{sample_lines, truncate_for_error, ERROR_BODY_MAX_CHARS};
use crate::log_archive::render_log_text;

pub const GITHUB_EXECUTE_METHOD: &str = "github/execute";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GithubAction {
    TriggerWorkflow,
    CancelRun,
    RerunRun,
    FetchLogs,
}

impl GithubAction {
    pub const ALL: [Self; 4] = [
        Self::TriggerWorkflow,
        Self::CancelRun,
        Self::RerunRun,
        Self::FetchLogs,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == raw)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TriggerWorkflow => "trigger_workflow",
            Self::CancelRun => "cancel_run",
            Self::RerunRun => "rerun_run",
            Self::FetchLogs => "fetch_logs",
        }
    }
}

/// Workflows are addressed either by numeric id or by file name (`ci.yml`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowRef {
    Id(u64),
    FileName(String),
}

impl WorkflowRef {
    fn to_json(&self) -> Value {
        match self {
            Self::Id(id) => json!(id),
            Self::FileName(name) => json!(name),
        }
    }
}

impl fmt::Display for WorkflowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::FileName(name) => f.write_str(name),
        }
    }
}

/// A fully validated action; building one never touches the network.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    TriggerWorkflow {
        workflow_id: WorkflowRef,
        git_ref: String,
        inputs: Map<String, Value>,
    },
    CancelRun {
        run_id: u64,
    },
    RerunRun {
        run_id: u64,
    },
    FetchLogs {
        run_id: u64,
    },
}

impl ActionRequest {
    pub fn from_params(params: &Value) -> Result<Self, RpcError> {
        let Some(params) = params.as_object() else {
            return Err(RpcError::invalid_argument(format!(
                "params for {GITHUB_EXECUTE_METHOD} must be an object"
            )));
        };
        let action_name = params
            .get("action")
            .and_then(Value::as_str)
            .filter(|action| !action.trim().is_empty())
            .ok_or_else(|| RpcError::invalid_argument("Missing 'action' in params"))?;
        let action = GithubAction::parse(action_name).ok_or_else(|| {
            RpcError::invalid_argument(format!("Unknown action: {action_name}"))
                .with_data(json!({ "supported": supported_action_names() }))
        })?;

        let mut missing = Vec::new();
        let request = match action {
            GithubAction::TriggerWorkflow => {
                let workflow_id = optional_param(params, "workflow_id", &mut missing)
                    .map(|value| {
                        parse_workflow_ref(value).ok_or_else(|| {
                            RpcError::invalid_argument(
                                "'workflow_id' must be a non-empty file name or a positive integer",
                            )
                        })
                    })
                    .transpose()?;
                let git_ref = optional_param(params, "ref", &mut missing)
                    .map(|value| {
                        value
                            .as_str()
                            .map(str::trim)
                            .filter(|git_ref| !git_ref.is_empty())
                            .map(str::to_string)
                            .ok_or_else(|| {
                                RpcError::invalid_argument("'ref' must be a non-empty string")
                            })
                    })
                    .transpose()?;
                let inputs = match params.get("inputs") {
                    None | Some(Value::Null) => Map::new(),
                    Some(Value::Object(inputs)) => inputs.clone(),
                    Some(_) => {
                        return Err(RpcError::invalid_argument("'inputs' must be an object"))
                    }
                };
                match (workflow_id, git_ref) {
                    (Some(workflow_id), Some(git_ref)) => Self::TriggerWorkflow {
                        workflow_id,
                        git_ref,
                        inputs,
                    },
                    _ => return Err(missing_params_error(action, &missing)),
                }
            }
            GithubAction::CancelRun | GithubAction::RerunRun | GithubAction::FetchLogs => {
                let Some(value) = optional_param(params, "run_id", &mut missing) else {
                    return Err(missing_params_error(action, &missing));
                };
                let run_id = parse_run_id(value).ok_or_else(|| {
                    RpcError::invalid_argument("'run_id' must be a positive integer")
                })?;
                match action {
                    GithubAction::CancelRun => Self::CancelRun { run_id },
                    GithubAction::RerunRun => Self::RerunRun { run_id },
                    _ => Self::FetchLogs { run_id },
                }
            }
        };
        Ok(request)
    }

    pub fn action(&self) -> GithubAction {
        match self {
            Self::TriggerWorkflow { .. } => GithubAction::TriggerWorkflow,
            Self::CancelRun { .. } => GithubAction::CancelRun,
            Self::RerunRun { .. } => GithubAction::RerunRun,
            Self::FetchLogs { .. } => GithubAction::FetchLogs,
        }
    }
}

fn supported_action_names() -> Vec<&'static str> {
    GithubAction::ALL.iter().map(|action| action.as_str()).collect()
}

/// Returns the value when present and non-null, recording the field as missing otherwise.
fn optional_param<'a>(
    params: &'a Map<String, Value>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<&'a Value> {
    match params.get(field) {
        None | Some(Value::Null) => {
            missing.push(field);
            None
        }
        Some(value) => Some(value),
    }
}

fn missing_params_error(action: GithubAction, missing: &[&'static str]) -> RpcError {
    RpcError::invalid_argument(format!(
        "missing required params for {}: {}",
        action.as_str(),
        missing.join(", ")
    ))
    .with_data(json!({ "action": action.as_str(), "missing": missing }))
}

fn parse_workflow_ref(value: &Value) -> Option<WorkflowRef> {
    if let Some(id) = positive_integer(value) {
        return Some(WorkflowRef::Id(id));
    }
    value
        .as_str()
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(|name| WorkflowRef::FileName(name.to_string()))
}

/// Positive JSON integer, or a string of decimal digits with a positive value.
pub fn parse_run_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(_) => positive_integer(value),
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
                return None;
            }
            raw.parse::<u64>().ok().filter(|run_id| *run_id > 0)
        }
        _ => None,
    }
}

#[derive(Clone)]
pub struct ActionExecutor {
    client: GithubApiClient,
}

impl ActionExecutor {
    pub fn new(client: GithubApiClient) -> Self {
        Self { client }
    }

    /// Validates `params` into an [`ActionRequest`] and runs it.
    pub async fn execute(&self, params: &Value) -> Result<Value, RpcError> {
        let request = ActionRequest::from_params(params)?;
        self.run(request).await
    }

    pub async fn run(&self, request: ActionRequest) -> Result<Value, RpcError> {
        let action = request.action();
        info!(action = action.as_str(), repo = %self.client.repo(), "executing github action");
        let result = match request {
            ActionRequest::TriggerWorkflow {
                workflow_id,
                git_ref,
                inputs,
            } => {
                let url = self.client.workflow_dispatch_url(&workflow_id.to_string());
                let payload = json!({ "ref": git_ref, "inputs": inputs });
                self.client
                    .send_expecting(
                        "trigger workflow",
                        self.client.post(&url).json(&payload),
                        StatusCode::NO_CONTENT,
                    )
                    .await
                    .map_err(|error| error.into_rpc_error())?;
                json!({
                    "status": "workflow triggered",
                    "workflow_id": workflow_id.to_json(),
                    "ref": git_ref,
                })
            }
            ActionRequest::CancelRun { run_id } => {
                let url = self.client.run_cancel_url(run_id);
                self.client
                    .send_expecting("cancel run", self.client.post(&url), StatusCode::ACCEPTED)
                    .await
                    .map_err(|error| error.into_rpc_error())?;
                json!({ "status": "run cancelled", "run_id": run_id })
            }
            ActionRequest::RerunRun { run_id } => {
                let url = self.client.run_rerun_url(run_id);
                self.client
                    .send_expecting("rerun run", self.client.post(&url), StatusCode::CREATED)
                    .await
                    .map_err(|error| error.into_rpc_error())?;
                json!({ "status": "run rerun triggered", "run_id": run_id })
            }
            ActionRequest::FetchLogs { run_id } => {
                let logs = self.fetch_log_text(run_id).await?;
                json!({ "status": "logs fetched", "run_id": run_id, "logs": logs })
            }
        };
        Ok(result)
    }

    async fn fetch_log_text(&self, run_id: u64) -> Result<String, RpcError> {
        let response = self
            .client
            .download_run_logs(run_id)
            .await
            .map_err(|error| error.into_rpc_error())?;
        let redirect = response.redirect_target();
        if response.status != StatusCode::OK {
            let body = response.body_text();
            warn!(
                run_id,
                status = response.status.as_u16(),
                redirect = redirect.as_deref().unwrap_or("none"),
                body = %truncate_for_error(&body, ERROR_BODY_MAX_CHARS),
                "github log download failed"
            );
            return Err(RpcError::upstream(
                format!("Failed to fetch logs: {}", response.status.as_u16()),
                json!({
                    "status": response.status.as_u16(),
                    "body": body,
                    "redirect": redirect,
                }),
            ));
        }

        let body = response.body;
        let logs = tokio::task::spawn_blocking(move || render_log_text(&body))
            .await
            .map_err(RpcError::internal)?
            .map_err(|error| {
                RpcError::upstream(
                    "Failed to decode log archive",
                    json!({ "status": 200, "error": error.to_string() }),
                )
            })?;
        debug!(
            run_id,
            redirect = redirect.as_deref().unwrap_or("none"),
            sample = ?sample_lines(logs.lines()),
            "github logs fetched"
        );
        Ok(logs)
    }
}

#[async_trait]
impl RpcMethodHandler for ActionExecutor {
    async fn handle(&self, params: Value) -> Result<Value, RpcError> {
        self.execute(&params).await
    }
}
