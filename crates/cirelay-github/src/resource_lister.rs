//! `github/resources/list`: workflows, runs, and runners folded into one resource list.

use async_trait::async_trait;
use cirelay_contract::{Resource, ResourceKind, RpcError, RpcMethodHandler};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::github_api_client::GithubApiClient;

pub const GITHUB_RESOURCES_LIST_METHOD: &str = "github/resources/list";

#[derive(Debug, Deserialize)]
struct WorkflowsPage {
    #[serde(default)]
    workflows: Vec<WorkflowEntry>,
}

#[derive(Debug, Deserialize)]
struct WorkflowEntry {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunsPage {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRunEntry>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRunEntry {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    head_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunnersPage {
    #[serde(default)]
    runners: Vec<RunnerEntry>,
}

#[derive(Debug, Deserialize)]
struct RunnerEntry {
    id: u64,
    #[serde(default)]
    name: Option<String>,
}

/// First non-empty candidate, else the upstream id.
fn display_name(candidates: &[Option<&str>], id: u64) -> String {
    candidates
        .iter()
        .flatten()
        .find(|candidate| !candidate.is_empty())
        .map(|candidate| candidate.to_string())
        .unwrap_or_else(|| id.to_string())
}

#[derive(Clone)]
pub struct ResourceLister {
    client: GithubApiClient,
}

impl ResourceLister {
    pub fn new(client: GithubApiClient) -> Self {
        Self { client }
    }

    /// Queries the three collections concurrently; any failure fails the whole listing.
    ///
    /// Only the first upstream page of each collection is read.
    pub async fn list(&self) -> Result<Vec<Resource>, RpcError> {
        let workflows_url = self.client.repo_url("/actions/workflows");
        let runs_url = self.client.repo_url("/actions/runs");
        let runners_url = self.client.repo_url("/actions/runners");
        let (workflows, runs, runners) = tokio::try_join!(
            self.client
                .get_json::<WorkflowsPage>("list workflows", &workflows_url),
            self.client
                .get_json::<WorkflowRunsPage>("list workflow runs", &runs_url),
            self.client
                .get_json::<RunnersPage>("list runners", &runners_url),
        )
        .map_err(|error| {
            warn!(%error, repo = %self.client.repo(), "github resource listing failed");
            error.into_rpc_error()
        })?;

        let mut resources = Vec::with_capacity(
            workflows.workflows.len() + runs.workflow_runs.len() + runners.runners.len(),
        );
        resources.extend(workflows.workflows.into_iter().map(|workflow| {
            let name = display_name(
                &[workflow.name.as_deref(), workflow.path.as_deref()],
                workflow.id,
            );
            Resource::new(ResourceKind::Workflow, workflow.id, name)
        }));
        resources.extend(runs.workflow_runs.into_iter().map(|run| {
            let name = display_name(&[run.name.as_deref(), run.head_branch.as_deref()], run.id);
            Resource::new(ResourceKind::WorkflowRun, run.id, name)
        }));
        resources.extend(runners.runners.into_iter().map(|runner| {
            let name = display_name(&[runner.name.as_deref()], runner.id);
            Resource::new(ResourceKind::Runner, runner.id, name)
        }));
        debug!(count = resources.len(), "github resources listed");
        Ok(resources)
    }
}

#[async_trait]
impl RpcMethodHandler for ResourceLister {
    async fn handle(&self, _params: Value) -> Result<Value, RpcError> {
        let resources = self.list().await?;
        serde_json::to_value(resources).map_err(RpcError::internal)
    }
}
