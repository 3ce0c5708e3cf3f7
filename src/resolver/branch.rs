//! Branch identity derived from the triggering event.

use log::info;

use super::types::BranchName;
use crate::error::{LastGreenError, Result};

const PULL_REQUEST_EVENT: &str = "pull_request";
const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Event fields that identify the branch, as exported by the CI runner
/// (`GITHUB_EVENT_NAME`, `GITHUB_REF`, `GITHUB_HEAD_REF`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    pub event_name: Option<String>,
    pub git_ref: Option<String>,
    pub head_ref: Option<String>,
}

/// Resolves the branch to search.
///
/// Pull requests use the head ref (the PR's source branch). Every other event
/// uses the pushed ref with its `refs/heads/` prefix removed.
///
/// # Errors
///
/// Returns [`LastGreenError::Config`] when the field required by the event
/// kind is missing, empty, or not a branch ref.
pub fn branch_name(context: &EventContext) -> Result<BranchName> {
    if context.event_name.as_deref() == Some(PULL_REQUEST_EVENT) {
        info!("Event is pull request, using head ref");
        return context
            .head_ref
            .as_deref()
            .and_then(BranchName::new)
            .ok_or_else(|| unresolvable("head ref is missing"));
    }

    info!("Event is not pull request, using ref");
    let git_ref = context
        .git_ref
        .as_deref()
        .filter(|r| !r.is_empty())
        .ok_or_else(|| unresolvable("ref is missing"))?;

    git_ref
        .strip_prefix(BRANCH_REF_PREFIX)
        .and_then(BranchName::new)
        .ok_or_else(|| unresolvable(&format!("'{git_ref}' is not a branch ref")))
}

fn unresolvable(reason: &str) -> LastGreenError {
    LastGreenError::Config(format!("branch name unresolvable: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(event: &str, git_ref: Option<&str>, head_ref: Option<&str>) -> EventContext {
        EventContext {
            event_name: Some(event.to_string()),
            git_ref: git_ref.map(ToString::to_string),
            head_ref: head_ref.map(ToString::to_string),
        }
    }

    #[test]
    fn test_push_strips_branch_prefix() {
        let ctx = context("push", Some("refs/heads/main"), None);
        assert_eq!(branch_name(&ctx).unwrap().as_str(), "main");
    }

    #[test]
    fn test_push_keeps_slashes_in_branch_name() {
        let ctx = context("push", Some("refs/heads/feature/login-form"), None);
        assert_eq!(branch_name(&ctx).unwrap().as_str(), "feature/login-form");
    }

    #[test]
    fn test_pull_request_uses_head_ref_regardless_of_ref() {
        let ctx = context(
            "pull_request",
            Some("refs/pull/42/merge"),
            Some("feature-x"),
        );
        assert_eq!(branch_name(&ctx).unwrap().as_str(), "feature-x");
    }

    #[test]
    fn test_missing_event_name_falls_back_to_ref() {
        let ctx = EventContext {
            event_name: None,
            git_ref: Some("refs/heads/develop".to_string()),
            head_ref: Some("ignored".to_string()),
        };
        assert_eq!(branch_name(&ctx).unwrap().as_str(), "develop");
    }

    #[test]
    fn test_pull_request_without_head_ref_is_config_error() {
        let ctx = context("pull_request", Some("refs/heads/main"), Some(""));
        let err = branch_name(&ctx).unwrap_err();
        assert!(matches!(err, LastGreenError::Config(_)));
        assert!(err.to_string().contains("branch name unresolvable"));
    }

    #[test]
    fn test_push_without_ref_is_config_error() {
        let ctx = context("push", None, None);
        assert!(matches!(
            branch_name(&ctx),
            Err(LastGreenError::Config(_))
        ));
    }

    #[test]
    fn test_tag_ref_is_config_error() {
        let ctx = context("push", Some("refs/tags/v1.0.0"), None);
        assert!(matches!(
            branch_name(&ctx),
            Err(LastGreenError::Config(_))
        ));
    }

    #[test]
    fn test_bare_prefix_is_config_error() {
        let ctx = context("push", Some("refs/heads/"), None);
        assert!(branch_name(&ctx).is_err());
    }
}
