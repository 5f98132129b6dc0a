use clap::{Parser, ValueEnum};
use cirelay_github::{StartupProbeMode, DEFAULT_GITHUB_API_BASE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CliStartupProbeMode {
    Strict,
    Lenient,
    Skip,
}

impl From<CliStartupProbeMode> for StartupProbeMode {
    fn from(value: CliStartupProbeMode) -> Self {
        match value {
            CliStartupProbeMode::Strict => StartupProbeMode::Strict,
            CliStartupProbeMode::Lenient => StartupProbeMode::Lenient,
            CliStartupProbeMode::Skip => StartupProbeMode::Skip,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "cirelay",
    about = "JSON-RPC gateway for GitHub Actions with streaming run logs",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "Bearer token used for every upstream GitHub API call"
    )]
    pub(crate) github_token: String,

    #[arg(
        long = "github-owner",
        env = "GITHUB_OWNER",
        help = "Owner (user or organization) of the target repository"
    )]
    pub(crate) github_owner: String,

    #[arg(
        long = "github-repo",
        env = "GITHUB_REPO",
        help = "Name of the target repository"
    )]
    pub(crate) github_repo: String,

    #[arg(
        long = "github-api-base",
        env = "GITHUB_API_BASE",
        default_value = DEFAULT_GITHUB_API_BASE,
        help = "Base URL of the GitHub REST API"
    )]
    pub(crate) github_api_base: String,

    #[arg(
        long,
        env = "CIRELAY_BIND",
        default_value = "0.0.0.0:8080",
        help = "Socket address the gateway listens on"
    )]
    pub(crate) bind: String,

    #[arg(
        long = "startup-probe",
        env = "CIRELAY_STARTUP_PROBE",
        value_enum,
        default_value_t = CliStartupProbeMode::Strict,
        help = "Startup access check: strict fails on any non-200, lenient tolerates a forbidden runners listing, skip disables the check"
    )]
    pub(crate) startup_probe: CliStartupProbeMode,

    #[arg(
        long = "stream-channel-capacity",
        env = "CIRELAY_STREAM_CHANNEL_CAPACITY",
        default_value_t = 64,
        value_parser = clap::value_parser!(u64).range(1..=65_536),
        help = "Buffered log lines per open stream before decoding waits on the client"
    )]
    pub(crate) stream_channel_capacity: u64,
}
