//! Thin reqwest wrapper around the GitHub Actions REST endpoints the gateway proxies.

use std::fmt;

use anyhow::{Context, Result};
use cirelay_contract::RpcError;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::github_transport_helpers::{
    percent_encode_path_segment, redirect_target, truncate_for_error, ERROR_BODY_MAX_CHARS,
};

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const GITHUB_USER_AGENT: &str = "cirelay-gateway";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("missing GitHub credential: {0} must be set and non-empty")]
    Missing(&'static str),
}

/// Access token plus repository identity, validated once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct GithubCredentials {
    token: String,
    repo: RepoRef,
}

impl GithubCredentials {
    pub fn new(token: &str, owner: &str, repo: &str) -> Result<Self, CredentialsError> {
        let token = token.trim();
        let owner = owner.trim();
        let repo = repo.trim();
        if token.is_empty() {
            return Err(CredentialsError::Missing("GITHUB_TOKEN"));
        }
        if owner.is_empty() {
            return Err(CredentialsError::Missing("GITHUB_OWNER"));
        }
        if repo.is_empty() {
            return Err(CredentialsError::Missing("GITHUB_REPO"));
        }
        Ok(Self {
            token: token.to_string(),
            repo: RepoRef {
                owner: owner.to_string(),
                name: repo.to_string(),
            },
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }
}

impl fmt::Debug for GithubCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubCredentials")
            .field("token", &"<redacted>")
            .field("repo", &self.repo)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum GithubApiError {
    #[error(
        "github api {operation} failed with status {status}: {}",
        truncate_for_error(.body, ERROR_BODY_MAX_CHARS)
    )]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("github api {operation} request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode github {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl GithubApiError {
    /// Unexpected statuses keep `{status, body}` as data; everything else is an internal error.
    pub fn into_rpc_error(self) -> RpcError {
        match self {
            Self::UnexpectedStatus {
                operation,
                status,
                body,
            } => RpcError::upstream(
                format!("Failed to {operation}: {status}"),
                json!({ "status": status, "body": body }),
            ),
            other => RpcError::internal(other),
        }
    }
}

/// Raw upstream answer; status is not interpreted here.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub requested_url: Url,
    pub final_url: Url,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn redirect_target(&self) -> Option<String> {
        redirect_target(&self.requested_url, &self.final_url)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    repo: RepoRef,
}

impl GithubApiClient {
    pub fn new(api_base: &str, credentials: &GithubCredentials) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(GITHUB_USER_AGENT),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static(GITHUB_API_VERSION),
        );
        let auth_header = format!("Bearer {}", credentials.token);
        let mut auth_value = reqwest::header::HeaderValue::from_str(&auth_header)
            .context("invalid github authorization header")?;
        auth_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            repo: credentials.repo.clone(),
        })
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// `{api_base}/repos/{owner}/{repo}{suffix}`
    pub fn repo_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_base, self.repo.owner, self.repo.name, suffix
        )
    }

    /// `workflow_id` is encoded as a single path segment.
    pub fn workflow_dispatch_url(&self, workflow_id: &str) -> String {
        self.repo_url(&format!(
            "/actions/workflows/{}/dispatches",
            percent_encode_path_segment(workflow_id)
        ))
    }

    pub fn run_cancel_url(&self, run_id: u64) -> String {
        self.repo_url(&format!("/actions/runs/{run_id}/cancel"))
    }

    pub fn run_rerun_url(&self, run_id: u64) -> String {
        self.repo_url(&format!("/actions/runs/{run_id}/rerun"))
    }

    pub fn run_logs_url(&self, run_id: u64) -> String {
        self.repo_url(&format!("/actions/runs/{run_id}/logs"))
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.http.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.http.post(url)
    }

    /// Sends the request and reads the full body, following redirects.
    pub async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<UpstreamResponse, GithubApiError> {
        let request = request
            .build()
            .map_err(|source| GithubApiError::Transport { operation, source })?;
        let requested_url = request.url().clone();
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|source| GithubApiError::Transport { operation, source })?;
        let status = response.status();
        let final_url = response.url().clone();
        let body = response
            .bytes()
            .await
            .map_err(|source| GithubApiError::Transport { operation, source })?;
        debug!(
            operation,
            status = status.as_u16(),
            url = %requested_url,
            bytes = body.len(),
            "github api response"
        );
        Ok(UpstreamResponse {
            status,
            requested_url,
            final_url,
            body: body.to_vec(),
        })
    }

    pub async fn send_expecting(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<UpstreamResponse, GithubApiError> {
        let response = self.send(operation, request).await?;
        if response.status != expected {
            return Err(GithubApiError::UnexpectedStatus {
                operation,
                status: response.status.as_u16(),
                body: response.body_text(),
            });
        }
        Ok(response)
    }

    pub async fn get_json<T>(&self, operation: &'static str, url: &str) -> Result<T, GithubApiError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| GithubApiError::Transport { operation, source })?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(GithubApiError::UnexpectedStatus {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|source| GithubApiError::Decode { operation, source })
    }

    pub async fn download_run_logs(&self, run_id: u64) -> Result<UpstreamResponse, GithubApiError> {
        let url = self.run_logs_url(run_id);
        self.send("fetch logs", self.get(&url)).await
    }
}
