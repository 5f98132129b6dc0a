//! `cirelay` binary: configuration, startup access check, and the gateway server.

mod bootstrap_helpers;
mod cli_args;

use anyhow::{Context, Result};
use cirelay_gateway::run_gateway_server;
use cirelay_github::verify_github_access;
use clap::Parser;
use tracing::info;

use crate::bootstrap_helpers::{build_gateway_config, build_github_client, init_tracing};
use crate::cli_args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let github_client = build_github_client(&cli)?;
    verify_github_access(&github_client, cli.startup_probe.into())
        .await
        .context("GitHub startup access check failed")?;
    info!(repo = %github_client.repo(), api_base = %cli.github_api_base, "github credentials loaded");

    run_gateway_server(build_gateway_config(&cli, github_client)).await
}
