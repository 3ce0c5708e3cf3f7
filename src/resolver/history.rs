//! Reconciliation of run history against the branch's current ancestry.
//!
//! The service keeps a run attached to its branch name even after the commit
//! it ran on was rebased or force-pushed away, so membership in the branch's
//! recent commits is what decides whether a run still counts.

use std::collections::HashSet;

use log::{debug, info};

use super::source::CommitHistory;
use super::types::{BranchName, CommitId, RunRecord};
use crate::error::Result;

/// Number of commits inspected behind the branch tip.
pub const HISTORY_WINDOW: u8 = 100;

/// Commits currently reachable from the branch tip, within [`HISTORY_WINDOW`].
#[derive(Debug, Clone, Default)]
pub struct CommitWindow {
    commits: HashSet<CommitId>,
}

impl CommitWindow {
    /// Fetches the branch's newest commits. One history call per window.
    pub async fn load<H>(history: &H, branch: &BranchName) -> Result<Self>
    where
        H: CommitHistory + ?Sized,
    {
        let commits = history.list_commits(branch, HISTORY_WINDOW).await?;
        debug!(
            "Loaded {} commits of branch {branch} for reconciliation",
            commits.len()
        );
        Ok(commits.into_iter().collect())
    }

    pub fn contains(&self, commit: &CommitId) -> bool {
        self.commits.contains(commit)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Keeps the runs whose commit is in the window, in their original order.
    pub fn retain(&self, runs: Vec<RunRecord>) -> Vec<RunRecord> {
        let total = runs.len();
        let kept: Vec<RunRecord> = runs
            .into_iter()
            .filter(|run| {
                let reachable = self.contains(&run.commit_id);
                if !reachable {
                    debug!(
                        "Skipping run {} on {}: commit is no longer on the branch",
                        run.id, run.commit_id
                    );
                }
                reachable
            })
            .collect();

        if kept.len() < total {
            info!(
                "Discarded {} of {total} runs whose commits are not in the last {HISTORY_WINDOW} commits",
                total - kept.len()
            );
        }

        kept
    }
}

impl FromIterator<CommitId> for CommitWindow {
    fn from_iter<I: IntoIterator<Item = CommitId>>(iter: I) -> Self {
        Self {
            commits: iter.into_iter().collect(),
        }
    }
}

/// Loads the branch window and filters `runs` against it.
pub async fn reconcile<H>(
    history: &H,
    branch: &BranchName,
    runs: Vec<RunRecord>,
) -> Result<Vec<RunRecord>>
where
    H: CommitHistory + ?Sized,
{
    let window = CommitWindow::load(history, branch).await?;
    Ok(window.retain(runs))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::LastGreenError;
    use crate::resolver::types::RunId;

    struct FixedHistory {
        commits: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedHistory {
        fn new(commits: Vec<&'static str>) -> Self {
            Self {
                commits,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CommitHistory for FixedHistory {
        async fn list_commits(&self, _branch: &BranchName, limit: u8) -> Result<Vec<CommitId>> {
            assert_eq!(limit, HISTORY_WINDOW);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.commits.iter().map(|c| CommitId::from(*c)).collect())
        }
    }

    struct FailingHistory;

    #[async_trait]
    impl CommitHistory for FailingHistory {
        async fn list_commits(&self, _branch: &BranchName, _limit: u8) -> Result<Vec<CommitId>> {
            Err(LastGreenError::retrieval("Fetching commits", "rate limited"))
        }
    }

    fn run(id: u64, sha: &str) -> RunRecord {
        RunRecord {
            id: RunId(id),
            commit_id: CommitId::from(sha),
            status: "completed".to_string(),
            conclusion: Some("success".to_string()),
            workflow_id: None,
            name: None,
            head_branch: Some("main".to_string()),
            created_at: None,
        }
    }

    fn branch() -> BranchName {
        BranchName::new("main").unwrap()
    }

    fn ids(runs: &[RunRecord]) -> Vec<u64> {
        runs.iter().map(|r| r.id.0).collect()
    }

    #[tokio::test]
    async fn test_keeps_only_runs_in_window_preserving_order() {
        let history = FixedHistory::new(vec!["c3", "c2", "c1"]);
        let runs = vec![run(5, "c3"), run(4, "gone"), run(3, "c1"), run(2, "c2")];

        let kept = reconcile(&history, &branch(), runs).await.unwrap();

        assert_eq!(ids(&kept), vec![5, 3, 2]);
        assert_eq!(history.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_excludes_rebased_commit_even_when_branch_matches() {
        let history = FixedHistory::new(vec!["cafe", "f00d"]);
        let runs = vec![run(1, "deadbeef")];

        let kept = reconcile(&history, &branch(), runs).await.unwrap();

        assert!(kept.is_empty());
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let history = FixedHistory::new(vec![]);
        let kept = reconcile(&history, &branch(), vec![run(1, "a")]).await.unwrap();
        assert!(kept.is_empty());
    }

    #[tokio::test]
    async fn test_history_failure_propagates() {
        let err = reconcile(&FailingHistory, &branch(), vec![run(1, "a")])
            .await
            .unwrap_err();
        assert!(matches!(err, LastGreenError::Retrieval { .. }));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_filtering_is_idempotent() {
        let window: CommitWindow = ["a", "b"].into_iter().map(CommitId::from).collect();
        let runs = vec![run(3, "b"), run(2, "x"), run(1, "a")];

        let once = window.retain(runs);
        let twice = window.retain(once.clone());

        assert_eq!(once, twice);
        assert_eq!(ids(&twice), vec![3, 1]);
    }

    #[test]
    fn test_window_membership() {
        let window: CommitWindow = ["a"].into_iter().map(CommitId::from).collect();
        assert!(window.contains(&CommitId::from("a")));
        assert!(!window.contains(&CommitId::from("b")));
        assert_eq!(window.len(), 1);
        assert!(!window.is_empty());
    }
}
