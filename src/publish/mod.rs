//! Git publishing pipeline.
//!
//! Materializes a generated [`FileSet`] inside a working checkout, lands it
//! on a freshly cut uniquely named branch, and pushes that branch to origin.
//! The base branch is never written to directly.
//!
//! Repository access goes through git2; the push shells out to the system
//! `git` binary so it inherits the user's existing credential configuration.

pub mod checkout;

use std::path::Path;
use std::process::Command;

use chrono::Utc;
use git2::{ErrorCode, IndexAddOption, Repository, Signature, StatusOptions};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::GitError;
use crate::fileset::FileSet;

pub use checkout::{Checkout, open_or_clone};

/// Prefix for generated feature branches.
pub const BRANCH_PREFIX: &str = "feature/user-story-update-";

/// Outcome of one successful publish operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    pub branch_name: String,
    pub pull_request_url: Option<String>,
}

/// Build a branch name unlikely to collide: fixed prefix plus a UTC
/// timestamp at second granularity.
pub fn unique_branch_name() -> String {
    format!("{BRANCH_PREFIX}{}", Utc::now().format("%Y%m%d%H%M%S"))
}

/// Publish `edits` onto a new branch cut from `base_branch`.
///
/// Steps:
/// 1. checkout the base branch; best-effort pull (a stale base is acceptable
///    since a fresh branch is about to be cut from it)
/// 2. create and checkout a uniquely named branch; a name collision checks
///    the existing branch out instead of failing
/// 3. write every entry of `edits` under the checkout root
/// 4. stage everything; commit only when the working tree is actually dirty
/// 5. push the branch to origin; push failure is fatal but local state is
///    kept for inspection and retry
///
/// Returns the branch name.
pub fn publish(
    checkout: &Checkout,
    base_branch: &str,
    edits: &FileSet,
    commit_message: &str,
) -> Result<String, GitError> {
    // 1. Base branch, best-effort freshness.
    checkout::checkout_ref(
        checkout,
        &format!("refs/heads/{base_branch}"),
        base_branch,
    )?;
    if let Err(e) = checkout::sync_base_branch(checkout, base_branch) {
        warn!("Could not pull latest {base_branch} ({e}); continuing with local state");
    }

    // 2. Unique branch.
    let branch_name = unique_branch_name();
    create_or_checkout_branch(checkout, &branch_name)?;

    // 3. Materialize the edits.
    edits
        .write_to(checkout.path())
        .map_err(|source| GitError::WriteFailed {
            path: checkout.path().to_path_buf(),
            source,
        })?;

    // 4. Commit only when something actually changed.
    if is_dirty(checkout.repo())? {
        let oid = stage_and_commit(checkout.repo(), commit_message)?;
        info!("Committed {oid} on {branch_name}");
    } else {
        info!("Working tree clean; pushing {branch_name} without a commit");
    }

    // 5. Push.
    push_branch(checkout.path(), &branch_name)?;

    Ok(branch_name)
}

fn create_or_checkout_branch(checkout: &Checkout, branch_name: &str) -> Result<(), GitError> {
    let repo = checkout.repo();
    let head_commit = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(|source| GitError::BranchFailed {
            branch: branch_name.to_string(),
            source,
        })?;

    match repo.branch(branch_name, &head_commit, false) {
        Ok(_) => {}
        // Timestamp collision: reuse the existing branch.
        Err(e) if e.code() == ErrorCode::Exists => {
            info!("Branch {branch_name} already exists; checking it out");
        }
        Err(source) => {
            return Err(GitError::BranchFailed {
                branch: branch_name.to_string(),
                source,
            });
        }
    }

    checkout::checkout_ref(checkout, &format!("refs/heads/{branch_name}"), branch_name)
}

/// Whether the working tree has any staged, unstaged, or untracked changes.
fn is_dirty(repo: &Repository) -> Result<bool, GitError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true);
    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(GitError::StagingFailed)?;
    Ok(!statuses.is_empty())
}

/// Stage all changes and create a commit on HEAD.
///
/// Uses `index.add_all()` like `git add -A`. The committer identity comes
/// from git config when present, otherwise a fixed storyforge identity so
/// server deployments without interactive git config still work.
fn stage_and_commit(repo: &Repository, message: &str) -> Result<git2::Oid, GitError> {
    let mut index = repo.index().map_err(GitError::StagingFailed)?;
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .map_err(GitError::StagingFailed)?;
    index.write().map_err(GitError::StagingFailed)?;

    let tree_id = index.write_tree().map_err(GitError::StagingFailed)?;
    let tree = repo.find_tree(tree_id).map_err(GitError::CommitFailed)?;

    let sig = repo
        .signature()
        .or_else(|_| Signature::now("storyforge", "storyforge@localhost"))
        .map_err(GitError::CommitFailed)?;

    let parent = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(GitError::CommitFailed)?;

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
        .map_err(GitError::CommitFailed)
}

/// Push a branch to origin via the system git binary.
fn push_branch(workdir: &Path, branch_name: &str) -> Result<(), GitError> {
    let output = Command::new("git")
        .current_dir(workdir)
        .args(["push", "origin", branch_name])
        .output()
        .map_err(|e| GitError::PushFailed {
            branch: branch_name.to_string(),
            detail: format!("failed to run git push: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GitError::PushFailed {
            branch: branch_name.to_string(),
            detail: stderr.trim().to_string(),
        });
    }

    Ok(())
}
