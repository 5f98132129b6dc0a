use anyhow::{Context, Result};
use cirelay_gateway::GatewayServerConfig;
use cirelay_github::{GithubApiClient, GithubCredentials};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli_args::Cli;

pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

pub(crate) fn build_github_client(cli: &Cli) -> Result<GithubApiClient> {
    let credentials = GithubCredentials::new(&cli.github_token, &cli.github_owner, &cli.github_repo)
        .context("invalid GitHub credentials")?;
    GithubApiClient::new(&cli.github_api_base, &credentials)
}

pub(crate) fn build_gateway_config(cli: &Cli, github_client: GithubApiClient) -> GatewayServerConfig {
    GatewayServerConfig {
        bind: cli.bind.clone(),
        github_client,
        stream_channel_capacity: usize::try_from(cli.stream_channel_capacity).unwrap_or(usize::MAX),
    }
}
