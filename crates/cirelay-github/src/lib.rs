//! GitHub Actions provider for the cirelay gateway.
//!
//! Provides the upstream API client, the `github/execute` action executor,
//! the `github/resources/list` lister, the run-log archive probe, the
//! streaming log emitter, and the startup access probe.

pub mod access_probe;
pub mod action_executor;
pub mod github_api_client;
pub mod github_transport_helpers;
pub mod log_archive;
pub mod log_stream;
pub mod resource_lister;

pub use access_probe::{verify_github_access, AccessProbeError, AccessProbeReport, StartupProbeMode};
pub use action_executor::{ActionExecutor, ActionRequest, GithubAction, GITHUB_EXECUTE_METHOD};
pub use github_api_client::{
    CredentialsError, GithubApiClient, GithubApiError, GithubCredentials, RepoRef,
    UpstreamResponse, DEFAULT_GITHUB_API_BASE,
};
pub use log_stream::{
    stream_run_logs, LogStreamEvent, DEFAULT_LOG_STREAM_CHANNEL_CAPACITY,
    MAX_LOG_STREAM_CHANNEL_CAPACITY,
};
pub use resource_lister::{ResourceLister, GITHUB_RESOURCES_LIST_METHOD};
