//! Issue-tracker status for worktree branches.
//!
//! A provider is selected once per repository from `issue_provider` in the
//! config and handed to the [`Inventory`](super::Inventory). No provider is a
//! valid state: issue status simply stays unset.

use super::model::IssueStatus;
use crate::config::IssueProviderKind;
use crate::error::{ArborError, Result};
use crate::exec::{ExecOptions, run_command};
use serde::Deserialize;
use std::path::Path;

/// Looks up the PR/MR/issue bound to a branch.
pub trait IssueProvider: Send + Sync {
    fn kind(&self) -> IssueProviderKind;

    /// Status for `branch`, or `None` when the tracker has nothing for it.
    fn status_for_branch(&self, repo_root: &Path, branch: &str) -> Result<Option<IssueStatus>>;
}

/// Build the provider configured for this repository.
pub fn provider_for(kind: IssueProviderKind, opts: ExecOptions) -> Option<Box<dyn IssueProvider>> {
    match kind {
        IssueProviderKind::None => None,
        IssueProviderKind::Github => Some(Box::new(GitHubProvider { opts })),
        IssueProviderKind::Gitlab => Some(Box::new(GitLabProvider { opts })),
    }
}

/// GitHub pull requests through the `gh` CLI.
#[derive(Debug, Clone, Default)]
pub struct GitHubProvider {
    opts: ExecOptions,
}

#[derive(Debug, Deserialize)]
struct GhPullRequest {
    number: u64,
    state: String,
}

impl GitHubProvider {
    fn parse(stdout: &str) -> Result<IssueStatus> {
        let pr: GhPullRequest = serde_json::from_str(stdout)
            .map_err(|e| ArborError::DecodeError(format!("gh pr view output: {}", e)))?;
        let state = pr.state.to_ascii_uppercase();
        Ok(IssueStatus {
            provider: IssueProviderKind::Github,
            id: pr.number.to_string(),
            closed: state == "CLOSED" || state == "MERGED",
            completed: state == "MERGED",
        })
    }
}

impl IssueProvider for GitHubProvider {
    fn kind(&self) -> IssueProviderKind {
        IssueProviderKind::Github
    }

    fn status_for_branch(&self, repo_root: &Path, branch: &str) -> Result<Option<IssueStatus>> {
        let output = run_command(
            "gh",
            &["pr", "view", branch, "--json", "number,state"],
            repo_root,
            &self.opts,
        )?;
        // gh exits non-zero when no PR exists for the branch.
        if !output.success() {
            return Ok(None);
        }
        Self::parse(&output.stdout).map(Some)
    }
}

/// GitLab merge requests through the `glab` CLI.
#[derive(Debug, Clone, Default)]
pub struct GitLabProvider {
    opts: ExecOptions,
}

#[derive(Debug, Deserialize)]
struct GlabMergeRequest {
    iid: u64,
    state: String,
}

impl GitLabProvider {
    fn parse(stdout: &str) -> Result<IssueStatus> {
        let mr: GlabMergeRequest = serde_json::from_str(stdout)
            .map_err(|e| ArborError::DecodeError(format!("glab mr view output: {}", e)))?;
        let state = mr.state.to_ascii_lowercase();
        Ok(IssueStatus {
            provider: IssueProviderKind::Gitlab,
            id: mr.iid.to_string(),
            closed: state == "closed" || state == "merged",
            completed: state == "merged",
        })
    }
}

impl IssueProvider for GitLabProvider {
    fn kind(&self) -> IssueProviderKind {
        IssueProviderKind::Gitlab
    }

    fn status_for_branch(&self, repo_root: &Path, branch: &str) -> Result<Option<IssueStatus>> {
        let output = run_command(
            "glab",
            &["mr", "view", branch, "--output", "json"],
            repo_root,
            &self.opts,
        )?;
        if !output.success() {
            return Ok(None);
        }
        Self::parse(&output.stdout).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_for_none() {
        assert!(provider_for(IssueProviderKind::None, ExecOptions::default()).is_none());
        let gh = provider_for(IssueProviderKind::Github, ExecOptions::default()).unwrap();
        assert_eq!(gh.kind(), IssueProviderKind::Github);
        let gl = provider_for(IssueProviderKind::Gitlab, ExecOptions::default()).unwrap();
        assert_eq!(gl.kind(), IssueProviderKind::Gitlab);
    }

    #[test]
    fn test_parse_github_states() {
        let merged = GitHubProvider::parse(r#"{"number":12,"state":"MERGED"}"#).unwrap();
        assert_eq!(merged.id, "12");
        assert!(merged.closed && merged.completed);

        let open = GitHubProvider::parse(r#"{"number":3,"state":"OPEN"}"#).unwrap();
        assert!(!open.closed && !open.completed);

        let closed = GitHubProvider::parse(r#"{"number":4,"state":"CLOSED"}"#).unwrap();
        assert!(closed.closed && !closed.completed);
    }

    #[test]
    fn test_parse_gitlab_states_tolerates_extra_fields() {
        let mr = GitLabProvider::parse(r#"{"iid":5,"state":"merged","title":"x","web_url":"u"}"#)
            .unwrap();
        assert_eq!(mr.provider, IssueProviderKind::Gitlab);
        assert_eq!(mr.id, "5");
        assert!(mr.completed);

        let opened = GitLabProvider::parse(r#"{"iid":6,"state":"opened"}"#).unwrap();
        assert!(!opened.closed);
    }

    #[test]
    fn test_parse_garbage_is_decode_error() {
        let err = GitHubProvider::parse("not json").unwrap_err();
        assert!(matches!(err, ArborError::DecodeError(_)));
    }
}
