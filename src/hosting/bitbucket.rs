//! Bitbucket Server hosting backend: static-token REST client.
//!
//! Listing enumerates every project the token can see, then pages through
//! each project's repositories following the `isLastPage`/`nextPageStart`
//! cursor until exhausted.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::HOSTING_TIMEOUT_SECS;
use crate::error::HostingError;

use super::url::{RepositoryIdentity, parse_repo_url};
use super::{HostingProvider, RepositorySummary, UserInfo, sort_repositories};

const PAGE_LIMIT: u32 = 100;

/// Bitbucket Server client with a pre-provisioned access token.
pub struct BitbucketProvider {
    server_url: String,
    access_token: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct PagedResponse<T> {
    values: Vec<T>,
    #[serde(rename = "isLastPage", default)]
    is_last_page: bool,
    #[serde(rename = "nextPageStart")]
    next_page_start: Option<u32>,
}

#[derive(Deserialize)]
struct Project {
    key: String,
}

#[derive(Deserialize)]
struct Repo {
    name: String,
    slug: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    public: Option<bool>,
}

#[derive(Deserialize)]
struct PullRequestResponse {
    links: Links,
}

#[derive(Deserialize)]
struct Links {
    #[serde(rename = "self")]
    self_links: Vec<Link>,
}

#[derive(Deserialize)]
struct Link {
    href: String,
}

#[derive(Deserialize)]
struct BitbucketUser {
    slug: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

impl BitbucketProvider {
    pub fn new(server_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        BitbucketProvider {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(HOSTING_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn get_page<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        start: u32,
    ) -> Result<PagedResponse<T>, HostingError> {
        let response = self
            .http
            .get(format!("{}{path}", self.server_url))
            .query(&[("start", start), ("limit", PAGE_LIMIT)])
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(HostingError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HostingError::UnexpectedResponse(format!(
                "{path} returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| HostingError::UnexpectedResponse(e.to_string()))
    }

    /// Follow the page cursor for one listing endpoint until exhausted.
    async fn get_all_pages<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, HostingError> {
        let mut values = Vec::new();
        let mut start = 0u32;

        loop {
            let page: PagedResponse<T> = self.get_page(path, start).await?;
            values.extend(page.values);

            match (page.is_last_page, page.next_page_start) {
                (false, Some(next)) => start = next,
                _ => break,
            }
        }

        Ok(values)
    }

    /// Resolve project key and repository slug from either a browse URL
    /// (`https://<host>/projects/<KEY>/repos/<slug>/browse`) or a plain
    /// `<host>/<KEY>/<slug>` hosting URL.
    fn parse_identity(&self, repo_url: &str) -> Result<RepositoryIdentity, HostingError> {
        let segments: Vec<&str> = repo_url.trim_end_matches('/').split('/').collect();
        if let Some(projects_idx) = segments.iter().position(|s| *s == "projects")
            && segments.get(projects_idx + 2) == Some(&"repos")
            && let (Some(key), Some(slug)) =
                (segments.get(projects_idx + 1), segments.get(projects_idx + 3))
            && !key.is_empty()
            && !slug.is_empty()
        {
            return Ok(RepositoryIdentity {
                owner: key.to_string(),
                name: slug.to_string(),
            });
        }

        parse_repo_url(repo_url)
    }
}

#[async_trait::async_trait]
impl HostingProvider for BitbucketProvider {
    fn name(&self) -> &'static str {
        "bitbucket"
    }

    fn authorize_url(&self, _state: &str) -> Result<String, HostingError> {
        Err(HostingError::OAuthNotSupported("bitbucket"))
    }

    async fn exchange_code(&self, _code: &str) -> Result<String, HostingError> {
        Err(HostingError::OAuthNotSupported("bitbucket"))
    }

    async fn get_user_info(&self, _token: Option<&str>) -> Result<UserInfo, HostingError> {
        let users: PagedResponse<BitbucketUser> =
            self.get_page("/rest/api/latest/users", 0).await?;

        let user = users.values.into_iter().next().ok_or_else(|| {
            HostingError::UnexpectedResponse("user listing returned no entries".to_string())
        })?;

        let avatar_url = format!("{}/users/{}/avatar.png", self.server_url, user.slug);
        Ok(UserInfo {
            login: user.slug,
            name: user.display_name,
            avatar_url: Some(avatar_url),
        })
    }

    async fn list_repositories(
        &self,
        _token: Option<&str>,
    ) -> Result<Vec<RepositorySummary>, HostingError> {
        let projects: Vec<Project> = self.get_all_pages("/rest/api/1.0/projects").await?;
        debug!("Listing repositories across {} projects", projects.len());

        let mut repos = Vec::new();
        for project in &projects {
            let path = format!("/rest/api/1.0/projects/{}/repos", project.key);
            let project_repos: Vec<Repo> = self.get_all_pages(&path).await?;

            for repo in project_repos {
                repos.push(RepositorySummary {
                    full_name: format!("{}/{}", project.key, repo.name),
                    url: format!(
                        "{}/projects/{}/repos/{}/browse",
                        self.server_url, project.key, repo.slug
                    ),
                    description: repo.description.unwrap_or_default(),
                    private: !repo.public.unwrap_or(true),
                    provider: "bitbucket".to_string(),
                    name: repo.name,
                });
            }
        }

        info!("Found {} repositories across all projects", repos.len());
        sort_repositories(&mut repos);
        Ok(repos)
    }

    async fn create_pull_request(
        &self,
        _token: Option<&str>,
        repo_url: &str,
        branch: &str,
        title: &str,
        body: &str,
        base_branch: &str,
    ) -> Result<String, HostingError> {
        let identity = self.parse_identity(repo_url)?;
        let repository = json!({
            "slug": identity.name,
            "project": { "key": identity.owner },
        });

        let response = self
            .http
            .post(format!(
                "{}/rest/api/1.0/projects/{}/repos/{}/pull-requests",
                self.server_url, identity.owner, identity.name
            ))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "title": title,
                "description": body,
                "fromRef": {
                    "id": format!("refs/heads/{branch}"),
                    "repository": repository,
                },
                "toRef": {
                    "id": format!("refs/heads/{base_branch}"),
                    "repository": repository,
                },
            }))
            .send()
            .await
            .map_err(HostingError::Transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(HostingError::RepositoryNotFound {
                owner: identity.owner,
                repo: identity.name,
            });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(HostingError::UnexpectedResponse(format!(
                "pull-request creation returned {status}: {detail}"
            )));
        }

        let pr: PullRequestResponse = response
            .json()
            .await
            .map_err(|e| HostingError::UnexpectedResponse(e.to_string()))?;

        let url = pr
            .links
            .self_links
            .into_iter()
            .next()
            .map(|l| l.href)
            .ok_or_else(|| {
                HostingError::UnexpectedResponse("created PR carried no self link".to_string())
            })?;

        info!("Pull request created: {url}");
        Ok(url)
    }
}
