mod branch;
mod history;
mod source;
mod types;

pub use branch::{branch_name, EventContext};
pub use history::{reconcile, CommitWindow};
pub use source::{CommitHistory, RunScope, RunSource, StatusFilter, MAX_PAGE_SIZE};
pub use types::{BranchName, CommitId, JobRecord, RunId, RunRecord, WorkflowId};

use std::pin::pin;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use log::{debug, info, warn};

use crate::error::{LastGreenError, Result};

/// What to look for on the branch.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Job that must have succeeded. `None` looks for a fully successful run.
    pub job: Option<String>,
    /// Restrict the search to one workflow.
    pub workflow: Option<WorkflowId>,
}

/// Outcome of a resolution that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(CommitId),
    NotFound,
}

impl Resolution {
    /// The commit id, or the empty string when nothing matched.
    pub fn as_output(&self) -> &str {
        match self {
            Self::Found(commit) => commit.as_str(),
            Self::NotFound => "",
        }
    }
}

/// Finds the newest commit on a branch with a matching successful run or job.
pub struct Resolver<S> {
    source: S,
    job_concurrency: usize,
}

impl<S> Resolver<S>
where
    S: RunSource + CommitHistory,
{
    pub fn new(source: S) -> Self {
        Self {
            source,
            job_concurrency: 1,
        }
    }

    /// Number of candidate runs whose jobs may be fetched ahead of the scan.
    /// Matches are still taken in newest-first order.
    pub fn with_job_concurrency(mut self, job_concurrency: usize) -> Self {
        self.job_concurrency = job_concurrency.max(1);
        self
    }

    /// Resolves `query` on the branch identified by `context`.
    ///
    /// # Errors
    ///
    /// Returns [`LastGreenError::Config`] if no branch can be derived from the
    /// event, or [`LastGreenError::Retrieval`] if any call to the service fails.
    /// Finding nothing is [`Resolution::NotFound`], not an error.
    pub async fn resolve(&self, context: &EventContext, query: &Query) -> Result<Resolution> {
        let branch = branch_name(context)?;
        info!("Resolving last successful commit on branch: {branch}");

        match query.job.as_deref() {
            None => {
                info!("Job name not provided, looking for the latest successful workflow run");
                self.latest_successful_run(&branch, query.workflow.as_ref())
                    .await
            }
            Some(job) => {
                info!("Looking for the latest run in which job '{job}' succeeded");
                self.latest_successful_job(&branch, query.workflow.as_ref(), job)
                    .await
            }
        }
    }

    async fn latest_successful_run(
        &self,
        branch: &BranchName,
        workflow: Option<&WorkflowId>,
    ) -> Result<Resolution> {
        let scope = RunScope {
            workflow,
            branch,
            status: Some(StatusFilter::Success),
            page: 1,
            per_page: MAX_PAGE_SIZE,
        };
        let runs = self.source.list_runs(&scope).await?;
        debug!("Fetched {} successful runs", runs.len());

        let candidates = reconcile(&self.source, branch, runs).await?;

        match candidates.into_iter().next() {
            Some(run) => {
                info!(
                    "Latest successful workflow run {} is on commit {}",
                    run.id, run.commit_id
                );
                Ok(Resolution::Found(run.commit_id))
            }
            None => {
                info!("No successful workflow runs found, defaulting to empty string");
                Ok(Resolution::NotFound)
            }
        }
    }

    async fn latest_successful_job(
        &self,
        branch: &BranchName,
        workflow: Option<&WorkflowId>,
        job: &str,
    ) -> Result<Resolution> {
        let first_scope = RunScope {
            workflow,
            branch,
            status: None,
            page: 1,
            per_page: MAX_PAGE_SIZE,
        };
        let first_page = self.source.list_runs(&first_scope).await?;
        let has_more = first_page.len() >= usize::from(MAX_PAGE_SIZE);

        let window = CommitWindow::load(&self.source, branch).await?;
        if window.is_empty() {
            warn!("Branch {branch} has no commits in its history window");
        }
        debug!("Reconciling runs against {} commits", window.len());

        let candidates = stream::iter(
            window
                .retain(first_page)
                .into_iter()
                .map(Ok::<_, LastGreenError>),
        )
        .chain(self.later_pages(first_scope, has_more, &window));

        // Page errors stay in position behind earlier candidates, so a match
        // ahead of a failing page fetch still wins.
        let mut inspected = pin!(candidates
            .map(|item| async move {
                let run = item?;
                let jobs = self.source.list_jobs(run.id).await?;
                Ok::<_, LastGreenError>((run, jobs))
            })
            .buffered(self.job_concurrency));

        while let Some(inspection) = inspected.next().await {
            let (run, jobs) = inspection?;
            debug!(
                "Checking {} jobs of run {} ({}, workflow {}, branch {}, status {}, conclusion {}) on commit {}",
                jobs.len(),
                run.id,
                run.name.as_deref().unwrap_or("unnamed"),
                run.workflow_id.map_or_else(|| "unknown".to_string(), |id| id.to_string()),
                run.head_branch.as_deref().unwrap_or("unknown"),
                run.status,
                run.conclusion.as_deref().unwrap_or("none"),
                run.commit_id
            );
            for candidate in &jobs {
                debug!(
                    "Job {} '{}': status {}, conclusion {}",
                    candidate.id,
                    candidate.name,
                    candidate.status,
                    candidate.conclusion.as_deref().unwrap_or("none")
                );
                if candidate.name == job && candidate.succeeded() {
                    info!(
                        "Job '{job}' succeeded in run {}, commit {}",
                        run.id, run.commit_id
                    );
                    return Ok(Resolution::Found(run.commit_id));
                }
            }
        }

        info!(
            "Unable to find job '{job}' in successful state in any previous run, defaulting to empty string"
        );
        Ok(Resolution::NotFound)
    }

    /// Reconciled runs from page 2 onwards, fetched only as the scan needs them.
    fn later_pages<'a>(
        &'a self,
        scope: RunScope<'a>,
        has_more: bool,
        window: &'a CommitWindow,
    ) -> impl Stream<Item = Result<RunRecord>> + 'a {
        let start = has_more.then_some(scope.page + 1);

        stream::try_unfold(start, move |page| async move {
            match page {
                None => Ok(None),
                Some(page) => self
                    .reconciled_page(RunScope { page, ..scope }, window)
                    .await
                    .map(|(kept, next)| {
                        let kept = kept.into_iter().map(Ok::<_, LastGreenError>);
                        Some((stream::iter(kept), next))
                    }),
            }
        })
        .try_flatten()
    }

    /// One page of runs filtered through `window`, plus the next page number
    /// if this page was full.
    async fn reconciled_page(
        &self,
        scope: RunScope<'_>,
        window: &CommitWindow,
    ) -> Result<(Vec<RunRecord>, Option<u32>)> {
        let runs = self.source.list_runs(&scope).await?;
        debug!("Fetched {} runs from page {}", runs.len(), scope.page);

        let next = (runs.len() >= usize::from(scope.per_page)).then_some(scope.page + 1);
        Ok((window.retain(runs), next))
    }
}
