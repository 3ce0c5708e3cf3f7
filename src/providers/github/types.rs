use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::resolver::{CommitId, JobRecord, RunId, RunRecord};

/// GitHub Actions workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubWorkflowRun {
    /// Unique identifier for the workflow run
    pub id: u64,
    /// Name of the workflow
    pub name: Option<String>,
    /// Head branch or tag name
    pub head_branch: Option<String>,
    /// SHA of the head commit
    pub head_sha: String,
    /// Status of the run
    pub status: Option<String>,
    /// Conclusion of the run (success, failure, etc.)
    pub conclusion: Option<String>,
    /// Workflow the run belongs to
    pub workflow_id: Option<u64>,
    /// When the run was created
    pub created_at: Option<DateTime<Utc>>,
}

/// Job within a GitHub Actions workflow run.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubJob {
    /// Unique identifier for the job
    pub id: u64,
    /// Name of the job
    pub name: String,
    /// Status of the job
    pub status: String,
    /// Conclusion of the job
    pub conclusion: Option<String>,
}

/// Commit as listed by the commits endpoint. Only the SHA is needed.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommit {
    pub sha: String,
}

/// Response from GitHub API for workflow runs.
#[derive(Debug, Deserialize)]
pub struct WorkflowRunsResponse {
    pub workflow_runs: Vec<GitHubWorkflowRun>,
}

/// Response from GitHub API for workflow jobs.
#[derive(Debug, Deserialize)]
pub struct WorkflowJobsResponse {
    /// Jobs across all pages
    #[serde(default)]
    pub total_count: Option<usize>,
    pub jobs: Vec<GitHubJob>,
}

impl From<GitHubWorkflowRun> for RunRecord {
    fn from(run: GitHubWorkflowRun) -> Self {
        Self {
            id: RunId(run.id),
            commit_id: CommitId::from(run.head_sha),
            status: run.status.unwrap_or_default(),
            conclusion: run.conclusion,
            workflow_id: run.workflow_id,
            name: run.name,
            head_branch: run.head_branch,
            created_at: run.created_at,
        }
    }
}

impl From<GitHubJob> for JobRecord {
    fn from(job: GitHubJob) -> Self {
        Self {
            id: job.id,
            name: job.name,
            status: job.status,
            conclusion: job.conclusion,
        }
    }
}
