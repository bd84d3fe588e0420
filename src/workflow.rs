//! End-to-end change request processing.
//!
//! A request targeting an existing repository flows through snapshot ->
//! generate update -> publish -> pull request. A request with no target
//! produces a fresh project tree under the configured output directory and
//! never touches git or a hosting backend.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::Utc;
use tracing::info;

use crate::config::Config;
use crate::error::{ConfigError, WorkflowError};
use crate::fileset::FileSet;
use crate::generate::Generator;
use crate::hosting::{HostingProvider, build_hosting, parse_repo_url};
use crate::publish::{PublishResult, open_or_clone, publish};
use crate::request::ChangeRequest;
use crate::snapshot::snapshot;
use crate::store::{JsonlStore, StoryRecord, StoryStore, record_best_effort};
use crate::completion;

/// Maximum characters of the story carried into the PR title.
const PR_TITLE_LEN: usize = 72;

/// Result of one processed change request.
#[derive(Debug)]
pub enum Outcome {
    /// A fresh project was generated locally; no git or hosting calls made.
    Generated { output_dir: PathBuf, files: FileSet },
    /// Changes were published as a branch and pull request.
    Published(PublishResult),
}

/// Holds the configured components for processing change requests.
///
/// Constructed once at process start; every component is owned here and
/// passed down by reference, never re-initialized mid-process.
pub struct Workflow {
    config: Config,
    generator: Generator,
    hosting: Box<dyn HostingProvider>,
    store: Box<dyn StoryStore>,
}

impl Workflow {
    /// Build a workflow from configuration, constructing the configured
    /// completion and hosting providers.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let provider = completion::build_provider(&config)?;
        let hosting = build_hosting(&config)?;
        let store = Box::new(JsonlStore::new(config.store_path.clone()));
        Ok(Workflow {
            generator: Generator::new(provider),
            hosting,
            store,
            config,
        })
    }

    /// Build a workflow with explicit components; used by tests.
    pub fn with_components(
        config: Config,
        generator: Generator,
        hosting: Box<dyn HostingProvider>,
        store: Box<dyn StoryStore>,
    ) -> Self {
        Workflow {
            config,
            generator,
            hosting,
            store,
        }
    }

    /// Process one change request end-to-end.
    pub async fn process(&self, request: &ChangeRequest) -> Result<Outcome, WorkflowError> {
        match request.repository() {
            Some(repo_url) => self.update_existing(request, repo_url).await,
            None => self.generate_fresh(request).await,
        }
    }

    async fn generate_fresh(&self, request: &ChangeRequest) -> Result<Outcome, WorkflowError> {
        let files = self.generator.generate_from_scratch(request).await?;

        let output_dir = self
            .config
            .output_dir
            .join(format!("story-{}", Utc::now().format("%Y%m%d%H%M%S")));
        files
            .write_to(&output_dir)
            .map_err(|source| WorkflowError::OutputWrite {
                path: output_dir.clone(),
                source,
            })?;

        info!(
            "Generated {} file(s) into {}",
            files.len(),
            output_dir.display()
        );
        self.record(request, None, None);

        Ok(Outcome::Generated { output_dir, files })
    }

    async fn update_existing(
        &self,
        request: &ChangeRequest,
        repo_url: &str,
    ) -> Result<Outcome, WorkflowError> {
        let identity = parse_repo_url(repo_url)?;
        let local_name = identity.name.clone();

        // The checkout is mutated in place (branch switches, file writes,
        // commits); concurrent requests against the same local directory
        // must serialize here.
        let lock = checkout_lock(&local_name);
        let _guard = lock.lock().await;

        let checkout = open_or_clone(
            repo_url,
            &local_name,
            &self.config.repo_dir,
            &self.config.base_branch,
        )?;

        let existing = snapshot(checkout.path(), &self.config.snapshot_extensions)?;
        info!(
            "Snapshot of {}/{}: {} file(s)",
            identity.owner,
            identity.name,
            existing.len()
        );

        let updated = self.generator.generate_update(request, &existing).await?;

        let commit_message = format!("Update code for user story: {}", pr_title(request.story()));
        let branch_name = publish(
            &checkout,
            &self.config.base_branch,
            &updated,
            &commit_message,
        )?;

        let pull_request_url = self
            .hosting
            .create_pull_request(
                None,
                repo_url,
                &branch_name,
                &format!("User story: {}", pr_title(request.story())),
                &pr_body(request),
                &self.config.base_branch,
            )
            .await?;

        let result = PublishResult {
            branch_name,
            pull_request_url: Some(pull_request_url),
        };
        self.record(
            request,
            Some(result.branch_name.clone()),
            result.pull_request_url.clone(),
        );

        Ok(Outcome::Published(result))
    }

    fn record(
        &self,
        request: &ChangeRequest,
        branch_name: Option<String>,
        pull_request_url: Option<String>,
    ) {
        let record = StoryRecord {
            story: request.story().to_string(),
            priority: request.priority(),
            notes: request.notes().to_string(),
            repository: request.repository().map(str::to_string),
            branch_name,
            pull_request_url,
            created_at: Utc::now(),
        };
        record_best_effort(self.store.as_ref(), &record);
    }
}

/// Get (or create) the lock guarding one local checkout directory.
fn checkout_lock(local_name: &str) -> Arc<tokio::sync::Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>> = OnceLock::new();
    let map = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    map.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(local_name.to_string())
        .or_default()
        .clone()
}

fn pr_title(story: &str) -> String {
    let mut title: String = story.chars().take(PR_TITLE_LEN).collect();
    if story.chars().count() > PR_TITLE_LEN {
        title.push_str("...");
    }
    title
}

fn pr_body(request: &ChangeRequest) -> String {
    let mut body = format!(
        "Automated change for the following user story:\n\n{}\n\nPriority: {}",
        request.story(),
        request.priority()
    );
    if !request.notes().trim().is_empty() {
        body.push_str("\n\nNotes:\n");
        body.push_str(request.notes());
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_checkout_name_shares_a_lock() {
        let a = checkout_lock("widgets");
        let b = checkout_lock("widgets");
        assert!(Arc::ptr_eq(&a, &b));

        let c = checkout_lock("anvils");
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn pr_title_truncates_long_stories() {
        let short = pr_title("Add health check endpoint");
        assert_eq!(short, "Add health check endpoint");

        let long_story = "x".repeat(100);
        let long = pr_title(&long_story);
        assert_eq!(long.chars().count(), PR_TITLE_LEN + 3);
        assert!(long.ends_with("..."));
    }
}
