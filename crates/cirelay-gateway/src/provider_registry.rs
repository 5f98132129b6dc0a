//! Default provider wiring for the dispatcher.

use std::sync::Arc;

use cirelay_github::{
    ActionExecutor, GithubAction, GithubApiClient, ResourceLister, GITHUB_EXECUTE_METHOD,
    GITHUB_RESOURCES_LIST_METHOD,
};
use cirelay_jenkins::{
    JenkinsActionStub, JenkinsResourceLister, JENKINS_EXECUTE_METHOD,
    JENKINS_RESOURCES_LIST_METHOD,
};

use crate::gateway_server::LOG_STREAM_ENDPOINT;
use crate::rpc_dispatcher::{RpcDispatcher, StreamRedirect};

/// Registers the GitHub and Jenkins methods plus the `fetch_logs` stream redirect.
pub fn build_provider_registry(github_client: GithubApiClient) -> RpcDispatcher {
    let mut dispatcher = RpcDispatcher::new();
    dispatcher
        .register(
            GITHUB_RESOURCES_LIST_METHOD,
            Arc::new(ResourceLister::new(github_client.clone())),
        )
        .register(
            GITHUB_EXECUTE_METHOD,
            Arc::new(ActionExecutor::new(github_client)),
        )
        .register(JENKINS_RESOURCES_LIST_METHOD, Arc::new(JenkinsResourceLister))
        .register(JENKINS_EXECUTE_METHOD, Arc::new(JenkinsActionStub))
        .register_stream_redirect(StreamRedirect::new(
            GITHUB_EXECUTE_METHOD,
            GithubAction::FetchLogs.as_str(),
            LOG_STREAM_ENDPOINT,
        ));
    dispatcher
}
