//! Normalized provider resources returned by the `*/resources/list` methods.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Workflow,
    WorkflowRun,
    Runner,
    /// Job-scheduler jobs.
    Job,
}

impl ResourceKind {
    /// Prefix used to build the resource identity (`wf_123`, `run_456`, ...).
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Workflow => "wf",
            Self::WorkflowRun => "run",
            Self::Runner => "runner",
            Self::Job => "job",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub name: String,
}

impl Resource {
    pub fn new(kind: ResourceKind, upstream_id: impl std::fmt::Display, name: String) -> Self {
        Self {
            id: format!("{}_{upstream_id}", kind.id_prefix()),
            kind,
            name,
        }
    }
}
