//! Placeholder Jenkins provider.
//!
//! Registers the `jenkins/*` methods with canned responses so clients can
//! exercise multi-provider routing before a real Jenkins backend exists.

use async_trait::async_trait;
use cirelay_contract::{Resource, ResourceKind, RpcError, RpcMethodHandler};
use serde_json::{json, Value};
use tracing::debug;

pub const JENKINS_RESOURCES_LIST_METHOD: &str = "jenkins/resources/list";
pub const JENKINS_EXECUTE_METHOD: &str = "jenkins/execute";

const STUB_JOB_NAME: &str = "proj-build";

#[derive(Debug, Clone, Copy, Default)]
pub struct JenkinsResourceLister;

#[async_trait]
impl RpcMethodHandler for JenkinsResourceLister {
    async fn handle(&self, _params: Value) -> Result<Value, RpcError> {
        let resources = vec![Resource {
            id: STUB_JOB_NAME.to_string(),
            kind: ResourceKind::Job,
            name: STUB_JOB_NAME.to_string(),
        }];
        serde_json::to_value(resources).map_err(RpcError::internal)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JenkinsActionStub;

#[async_trait]
impl RpcMethodHandler for JenkinsActionStub {
    async fn handle(&self, params: Value) -> Result<Value, RpcError> {
        let action = params
            .get("action")
            .and_then(Value::as_str)
            .filter(|action| !action.trim().is_empty())
            .ok_or_else(|| RpcError::invalid_argument("Missing 'action' in params"))?;
        debug!(action, "jenkins stub accepted action");
        Ok(json!({
            "status": "accepted",
            "provider": "jenkins",
            "action": action,
            "stub": true,
        }))
    }
}
