//! Remote hosting clients: repository listing and pull-request creation.
//!
//! Two backends behind one trait: GitHub (OAuth-backed, octocrab) and
//! Bitbucket Server (static token, REST). Selection is a configuration
//! value resolved by [`build_hosting`]. PR creation is never retried
//! automatically; it is not idempotent and a blind retry risks duplicates.

pub mod bitbucket;
pub mod github;
pub mod url;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{Config, HostKind};
use crate::error::{ConfigError, HostingError};

pub use bitbucket::BitbucketProvider;
pub use github::GitHubProvider;
pub use url::{RepositoryIdentity, parse_repo_url};

/// One repository visible to the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub description: String,
    pub private: bool,
    pub provider: String,
}

/// The authenticated user's profile, as much of it as the backend exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Capability set shared by all hosting backends.
///
/// `token` arguments carry a bearer token obtained out-of-band (for GitHub,
/// from the OAuth flow); static-token backends ignore them and use their
/// configured credential.
#[async_trait]
pub trait HostingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// URL the web layer redirects the user to for OAuth authorization.
    fn authorize_url(&self, state: &str) -> Result<String, HostingError>;

    /// Exchange an OAuth authorization code for a bearer token.
    async fn exchange_code(&self, code: &str) -> Result<String, HostingError>;

    async fn get_user_info(&self, token: Option<&str>) -> Result<UserInfo, HostingError>;

    /// List every repository the credential can see, sorted by full name,
    /// case-insensitively, for deterministic display ordering.
    async fn list_repositories(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<RepositorySummary>, HostingError>;

    /// Open a pull request from `branch` onto `base_branch` and return the
    /// canonical web URL of the created PR.
    async fn create_pull_request(
        &self,
        token: Option<&str>,
        repo_url: &str,
        branch: &str,
        title: &str,
        body: &str,
        base_branch: &str,
    ) -> Result<String, HostingError>;
}

/// Construct the configured hosting provider.
pub fn build_hosting(config: &Config) -> Result<Box<dyn HostingProvider>, ConfigError> {
    match config.hosting_provider {
        HostKind::GitHub => Ok(Box::new(GitHubProvider::new(
            config.github_token.clone(),
            config.github_client_id.clone(),
            config.github_client_secret.clone(),
            config.github_callback_url.clone(),
        ))),
        HostKind::Bitbucket => {
            let server_url = config
                .bitbucket_server_url
                .clone()
                .ok_or(ConfigError::Missing("BITBUCKET_SERVER_URL"))?;
            let access_token = config
                .bitbucket_access_token
                .clone()
                .ok_or(ConfigError::Missing("BITBUCKET_ACCESS_TOKEN"))?;
            Ok(Box::new(BitbucketProvider::new(server_url, access_token)))
        }
    }
}

/// Sort repositories by full name, case-insensitively.
pub(crate) fn sort_repositories(repos: &mut [RepositorySummary]) {
    repos.sort_by(|a, b| {
        a.full_name
            .to_lowercase()
            .cmp(&b.full_name.to_lowercase())
    });
}
