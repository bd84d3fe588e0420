//! Working checkout lifecycle: clone-or-open plus base branch sync.

use std::path::{Path, PathBuf};

use git2::Repository;
use git2::build::CheckoutBuilder;
use tracing::{info, warn};

use crate::error::GitError;

/// A local mutable clone of a remote repository, owned exclusively by the
/// publishing pipeline for the duration of one operation. Never deleted by
/// this system; reused by subsequent requests keyed by its directory name.
pub struct Checkout {
    repo: Repository,
    path: PathBuf,
}

impl Checkout {
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Open the checkout at `repo_dir/local_name`, cloning it first if absent.
///
/// A directory that exists but does not open as a repository is treated as a
/// corrupt partial clone: it is removed and the clone is retried from
/// scratch. On success the configured base branch is checked out and
/// synchronized to the remote tip.
pub fn open_or_clone(
    url: &str,
    local_name: &str,
    repo_dir: &Path,
    base_branch: &str,
) -> Result<Checkout, GitError> {
    let path = repo_dir.join(local_name);

    let repo = if path.exists() {
        match Repository::open(&path) {
            Ok(repo) => {
                info!("Reusing existing checkout at {}", path.display());
                repo
            }
            Err(e) => {
                warn!(
                    "Checkout at {} is not a valid repository ({e}); re-cloning",
                    path.display()
                );
                std::fs::remove_dir_all(&path).map_err(|source| GitError::CleanupFailed {
                    path: path.clone(),
                    source,
                })?;
                clone(url, &path)?
            }
        }
    } else {
        clone(url, &path)?
    };

    let checkout = Checkout { repo, path };
    sync_base_branch(&checkout, base_branch)?;
    Ok(checkout)
}

fn clone(url: &str, path: &Path) -> Result<Repository, GitError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| GitError::CleanupFailed {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    info!("Cloning {url} into {}", path.display());
    Repository::clone(url, path).map_err(|source| GitError::CloneFailed {
        url: url.to_string(),
        source,
    })
}

/// Fetch from origin and move the local base branch to the remote tip,
/// then check it out.
pub fn sync_base_branch(checkout: &Checkout, base_branch: &str) -> Result<(), GitError> {
    let repo = checkout.repo();

    let mut remote = repo.find_remote("origin").map_err(GitError::FetchFailed)?;
    remote
        .fetch(&[base_branch], None, None)
        .map_err(GitError::FetchFailed)?;

    let remote_ref = format!("refs/remotes/origin/{base_branch}");
    let target = repo
        .find_reference(&remote_ref)
        .and_then(|r| r.peel_to_commit())
        .map_err(|source| GitError::CheckoutFailed {
            branch: base_branch.to_string(),
            source,
        })?;

    let local_ref = format!("refs/heads/{base_branch}");
    match repo.find_reference(&local_ref) {
        Ok(mut reference) => {
            reference
                .set_target(target.id(), "storyforge: sync base branch to remote tip")
                .map_err(|source| GitError::CheckoutFailed {
                    branch: base_branch.to_string(),
                    source,
                })?;
        }
        Err(_) => {
            repo.reference(
                &local_ref,
                target.id(),
                true,
                "storyforge: create base branch at remote tip",
            )
            .map_err(|source| GitError::BranchFailed {
                branch: base_branch.to_string(),
                source,
            })?;
        }
    }

    checkout_ref(checkout, &local_ref, base_branch)
}

/// Point HEAD at `full_ref` and force the working tree to match.
pub(super) fn checkout_ref(
    checkout: &Checkout,
    full_ref: &str,
    branch_name: &str,
) -> Result<(), GitError> {
    let repo = checkout.repo();
    repo.set_head(full_ref)
        .and_then(|_| repo.checkout_head(Some(CheckoutBuilder::new().force())))
        .map_err(|source| GitError::CheckoutFailed {
            branch: branch_name.to_string(),
            source,
        })
}
