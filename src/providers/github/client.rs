use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{LastGreenError, Result};
use crate::resolver::{
    BranchName, CommitHistory, CommitId, JobRecord, RunId, RunRecord, RunScope, RunSource,
    WorkflowId, MAX_PAGE_SIZE,
};

use super::types::{GitHubCommit, WorkflowJobsResponse, WorkflowRunsResponse};

const USER_AGENT: &str = concat!("lastgreen/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// GitHub REST client for workflow runs, jobs and branch commits.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: Url,
    owner: String,
    repo: String,
    token: Token,
}

impl GitHubClient {
    /// Create a new GitHub API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - GitHub API base URL (e.g., "https://api.github.com")
    /// * `repository` - Repository path in format "owner/repo"
    /// * `token` - Token sent as a bearer credential
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`LastGreenError::Config`] if the repository path or base URL
    /// is malformed, or the HTTP client cannot be built.
    pub fn new(base_url: &str, repository: &str, token: Token, timeout: Duration) -> Result<Self> {
        let (owner, repo) = parse_repository(repository)?;
        let api_url = api_base(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(API_VERSION),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| LastGreenError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url,
            owner,
            repo,
            token,
        })
    }

    /// Construct a URL under the repository, e.g. `actions/runs`.
    fn repo_url(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(&format!("repos/{}/{}/{path}", self.owner, self.repo))
            .map_err(|e| LastGreenError::Config(format!("Invalid repository URL: {e}")))
    }

    /// `actions/workflows/{workflow}/runs`, with the workflow percent-encoded
    /// as a single path segment.
    pub(super) fn workflow_runs_url(&self, workflow: &WorkflowId) -> Result<Url> {
        let mut url = self.repo_url("actions/workflows")?;
        url.path_segments_mut()
            .map_err(|()| LastGreenError::Config("API base URL cannot hold a path".into()))?
            .pop_if_empty()
            .push(workflow.as_str())
            .push("runs");
        Ok(url)
    }

    async fn get_json<T>(&self, operation: &str, url: Url, query: &[(&str, String)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!("GET {url} {query:?}");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.as_str())
            .query(query)
            .send()
            .await
            .map_err(|e| LastGreenError::retrieval(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(LastGreenError::retrieval(
                operation,
                format!("status {status}: {error_text}"),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| LastGreenError::retrieval(operation, e))
    }
}

#[async_trait]
impl RunSource for GitHubClient {
    async fn list_runs(&self, scope: &RunScope<'_>) -> Result<Vec<RunRecord>> {
        let url = match scope.workflow {
            Some(workflow) => self.workflow_runs_url(workflow)?,
            None => self.repo_url("actions/runs")?,
        };

        let mut query = vec![
            ("branch", scope.branch.as_str().to_string()),
            ("page", scope.page.to_string()),
            ("per_page", scope.per_page.min(MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(status) = scope.status {
            query.push(("status", status.as_str().to_string()));
        }

        let response: WorkflowRunsResponse =
            self.get_json("Fetching workflow runs", url, &query).await?;

        let mut runs: Vec<RunRecord> = response
            .workflow_runs
            .into_iter()
            .map(RunRecord::from)
            .collect();
        // Stable, so runs without a timestamp keep the order the API gave them.
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(runs)
    }

    async fn list_jobs(&self, run_id: RunId) -> Result<Vec<JobRecord>> {
        let url = self.repo_url(&format!("actions/runs/{run_id}/jobs"))?;
        let per_page = usize::from(MAX_PAGE_SIZE);

        let mut all_jobs = Vec::new();
        let mut page = 1u32;

        loop {
            let query = [
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ];
            let response: WorkflowJobsResponse = self
                .get_json("Fetching workflow run jobs", url.clone(), &query)
                .await?;

            let fetched = response.jobs.len();
            all_jobs.extend(response.jobs.into_iter().map(JobRecord::from));

            let complete = response
                .total_count
                .is_some_and(|total| all_jobs.len() >= total);
            if fetched < per_page || complete {
                break;
            }

            page += 1;
        }

        Ok(all_jobs)
    }
}

#[async_trait]
impl CommitHistory for GitHubClient {
    async fn list_commits(&self, branch: &BranchName, limit: u8) -> Result<Vec<CommitId>> {
        let url = self.repo_url("commits")?;
        let query = [
            ("sha", branch.as_str().to_string()),
            ("per_page", limit.min(MAX_PAGE_SIZE).to_string()),
        ];

        let commits: Vec<GitHubCommit> = self
            .get_json("Fetching branch commits", url, &query)
            .await?;

        Ok(commits
            .into_iter()
            .map(|commit| CommitId::from(commit.sha))
            .collect())
    }
}

fn parse_repository(repository: &str) -> Result<(String, String)> {
    match repository.split('/').collect::<Vec<_>>().as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() => {
            Ok(((*owner).to_string(), (*repo).to_string()))
        }
        _ => Err(LastGreenError::Config(format!(
            "Repository must be in format 'owner/repo', got '{repository}'"
        ))),
    }
}

/// Parses the API base URL, adding a trailing slash so relative joins keep any
/// path prefix (GitHub Enterprise serves the API under `/api/v3`).
pub(super) fn api_base(base_url: &str) -> Result<Url> {
    let mut url =
        Url::parse(base_url).map_err(|e| LastGreenError::Config(format!("Invalid base URL: {e}")))?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
