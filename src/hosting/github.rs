//! GitHub hosting backend: OAuth2 authorization-code flow plus octocrab for
//! API calls.

use octocrab::Octocrab;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::HOSTING_TIMEOUT_SECS;
use crate::error::HostingError;

use super::url::parse_repo_url;
use super::{HostingProvider, RepositorySummary, UserInfo, sort_repositories};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const OAUTH_SCOPE: &str = "repo,user";

/// Safety limit on listing pagination.
const MAX_PAGES: u8 = 50;

/// OAuth-backed GitHub client. Repository listing and PR creation use a
/// bearer token obtained from the OAuth flow (or a pre-provisioned token
/// from configuration as a fallback).
pub struct GitHubProvider {
    token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    callback_url: Option<String>,
    token_url: String,
    api_base_uri: Option<String>,
    api_timeout: std::time::Duration,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error_description: Option<String>,
}

impl GitHubProvider {
    pub fn new(
        token: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        callback_url: Option<String>,
    ) -> Self {
        GitHubProvider {
            token,
            client_id,
            client_secret,
            callback_url,
            token_url: TOKEN_URL.to_string(),
            api_base_uri: None,
            api_timeout: std::time::Duration::from_secs(HOSTING_TIMEOUT_SECS),
            http: hosting_http_client(),
        }
    }

    /// Override the OAuth token endpoint; used by tests with a mock server.
    #[doc(hidden)]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Point API calls at a different base URI; used by tests with a mock server.
    #[doc(hidden)]
    pub fn with_api_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.api_base_uri = Some(base_uri.into());
        self
    }

    /// Override the API call timeout; used by tests.
    #[doc(hidden)]
    pub fn with_api_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.api_timeout = timeout;
        self
    }

    fn resolve_token(&self, token: Option<&str>) -> Result<String, HostingError> {
        token
            .map(str::to_string)
            .or_else(|| self.token.clone())
            .ok_or(HostingError::AuthenticationFailed)
    }

    /// API calls inherit the hosting timeout so a stalled endpoint fails
    /// like any other transport error instead of hanging the workflow.
    fn api_client(&self, token: Option<&str>) -> Result<Octocrab, HostingError> {
        let token = self.resolve_token(token)?;
        let mut builder = Octocrab::builder()
            .personal_token(token)
            .set_connect_timeout(Some(self.api_timeout))
            .set_read_timeout(Some(self.api_timeout))
            .set_write_timeout(Some(self.api_timeout));
        if let Some(base_uri) = &self.api_base_uri {
            builder = builder
                .base_uri(base_uri.as_str())
                .map_err(|e| HostingError::UnexpectedResponse(e.to_string()))?;
        }
        builder
            .build()
            .map_err(|e| HostingError::UnexpectedResponse(e.to_string()))
    }
}

fn hosting_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(HOSTING_TIMEOUT_SECS))
        .build()
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl HostingProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn authorize_url(&self, state: &str) -> Result<String, HostingError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(HostingError::MissingConfig("GITHUB_CLIENT_ID"))?;
        let callback_url = self
            .callback_url
            .as_deref()
            .ok_or(HostingError::MissingConfig("GITHUB_CALLBACK_URL"))?;

        Ok(format!(
            "{AUTHORIZE_URL}?client_id={client_id}&redirect_uri={callback_url}&scope={OAUTH_SCOPE}&state={state}"
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<String, HostingError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(HostingError::MissingConfig("GITHUB_CLIENT_ID"))?;
        let client_secret = self
            .client_secret
            .as_deref()
            .ok_or(HostingError::MissingConfig("GITHUB_CLIENT_SECRET"))?;

        let response = self
            .http
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
            ])
            .send()
            .await
            .map_err(HostingError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostingError::TokenExchangeFailed(format!(
                "token endpoint returned {status}"
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| HostingError::TokenExchangeFailed(e.to_string()))?;

        parsed.access_token.ok_or_else(|| {
            HostingError::TokenExchangeFailed(
                parsed
                    .error_description
                    .unwrap_or_else(|| "no access token in response".to_string()),
            )
        })
    }

    async fn get_user_info(&self, token: Option<&str>) -> Result<UserInfo, HostingError> {
        let octocrab = self.api_client(token)?;
        get_user_info_with_client(&octocrab).await
    }

    async fn list_repositories(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<RepositorySummary>, HostingError> {
        let octocrab = self.api_client(token)?;
        list_repositories_with_client(&octocrab).await
    }

    async fn create_pull_request(
        &self,
        token: Option<&str>,
        repo_url: &str,
        branch: &str,
        title: &str,
        body: &str,
        base_branch: &str,
    ) -> Result<String, HostingError> {
        let octocrab = self.api_client(token)?;
        create_pull_request_with_client(&octocrab, repo_url, branch, title, body, base_branch)
            .await
    }
}

/// Fetch the authenticated user using a pre-configured octocrab client.
///
/// Split out so tests can inject a client pointing at a mock server.
pub async fn get_user_info_with_client(octocrab: &Octocrab) -> Result<UserInfo, HostingError> {
    let user = octocrab
        .current()
        .user()
        .await
        .map_err(|e| HostingError::UserInfo(Box::new(e)))?;

    Ok(UserInfo {
        login: user.login,
        name: None,
        avatar_url: Some(user.avatar_url.to_string()),
    })
}

/// List every repository the token can see, paginated, sorted by full name.
pub async fn list_repositories_with_client(
    octocrab: &Octocrab,
) -> Result<Vec<RepositorySummary>, HostingError> {
    let mut repos = Vec::new();
    let mut page = 1u8;

    loop {
        let repo_page = octocrab
            .current()
            .list_repos_for_authenticated_user()
            .type_("all")
            .per_page(100)
            .page(page)
            .send()
            .await
            .map_err(|e| HostingError::ListRepositories(Box::new(e)))?;

        let items = repo_page.items;
        if items.is_empty() {
            break;
        }

        for repo in items {
            let full_name = repo
                .full_name
                .unwrap_or_else(|| repo.name.clone());
            repos.push(RepositorySummary {
                name: repo.name,
                url: repo.html_url.map(|u| u.to_string()).unwrap_or_default(),
                description: repo.description.unwrap_or_default(),
                private: repo.private.unwrap_or(false),
                provider: "github".to_string(),
                full_name,
            });
        }

        if repo_page.next.is_none() {
            break;
        }

        page += 1;
        if page > MAX_PAGES {
            warn!("Reached {MAX_PAGES}-page safety limit while listing repositories");
            break;
        }
    }

    sort_repositories(&mut repos);
    Ok(repos)
}

/// Create a pull request using a pre-configured octocrab client.
pub async fn create_pull_request_with_client(
    octocrab: &Octocrab,
    repo_url: &str,
    branch: &str,
    title: &str,
    body: &str,
    base_branch: &str,
) -> Result<String, HostingError> {
    let identity = parse_repo_url(repo_url)?;

    let pull = octocrab
        .pulls(&identity.owner, &identity.name)
        .create(title, branch, base_branch)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            let err_text = format!("{e:?}");
            if err_text.contains("Not Found") {
                HostingError::RepositoryNotFound {
                    owner: identity.owner.clone(),
                    repo: identity.name.clone(),
                }
            } else {
                HostingError::CreatePullRequest(Box::new(e))
            }
        })?;

    let url = pull
        .html_url
        .map(|u| u.to_string())
        .ok_or_else(|| {
            HostingError::UnexpectedResponse("created PR carried no html_url".to_string())
        })?;

    info!("Pull request created: {url}");
    Ok(url)
}
