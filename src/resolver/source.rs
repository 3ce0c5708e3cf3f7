use async_trait::async_trait;

use super::types::{BranchName, CommitId, JobRecord, RunId, RunRecord, WorkflowId};
use crate::error::Result;

/// Largest page the run-tracking service is asked for.
pub const MAX_PAGE_SIZE: u8 = 100;

/// Run status filter understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Success,
}

impl StatusFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
        }
    }
}

/// Which runs to list.
#[derive(Debug, Clone, Copy)]
pub struct RunScope<'a> {
    /// Restrict to one workflow; `None` lists runs of every workflow.
    pub workflow: Option<&'a WorkflowId>,
    pub branch: &'a BranchName,
    /// `None` means any status.
    pub status: Option<StatusFilter>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u8,
}

/// Paginated access to workflow runs and their jobs.
#[async_trait]
pub trait RunSource: Send + Sync {
    /// Lists one page of runs, newest first.
    async fn list_runs(&self, scope: &RunScope<'_>) -> Result<Vec<RunRecord>>;

    /// Lists every job belonging to one run.
    async fn list_jobs(&self, run_id: RunId) -> Result<Vec<JobRecord>>;
}

/// Recent commit ancestry of a branch.
#[async_trait]
pub trait CommitHistory: Send + Sync {
    /// Lists the newest `limit` commits reachable from the branch tip, newest first.
    async fn list_commits(&self, branch: &BranchName, limit: u8) -> Result<Vec<CommitId>>;
}
