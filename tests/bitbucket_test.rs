//! Integration tests for the Bitbucket Server backend with a mocked REST API.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use storyforge::error::HostingError;
use storyforge::hosting::{BitbucketProvider, HostingProvider};

fn provider(server: &MockServer) -> BitbucketProvider {
    BitbucketProvider::new(server.uri(), "test-token")
}

#[tokio::test]
async fn lists_repositories_across_projects_following_the_page_cursor() {
    let server = MockServer::start().await;

    // Project listing spans two pages.
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"key": "TEAM"}],
            "isLastPage": false,
            "nextPageStart": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects"))
        .and(query_param("start", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"key": "OPS"}],
            "isLastPage": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects/TEAM/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [
                {"name": "widgets", "slug": "widgets", "description": "widget factory", "public": false},
                {"name": "anvils", "slug": "anvils", "public": true}
            ],
            "isLastPage": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects/OPS/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"name": "deploy", "slug": "deploy"}],
            "isLastPage": true
        })))
        .mount(&server)
        .await;

    let repos = provider(&server).list_repositories(None).await.unwrap();

    assert_eq!(repos.len(), 3);
    // Sorted by full name, case-insensitively.
    let names: Vec<&str> = repos.iter().map(|r| r.full_name.as_str()).collect();
    assert_eq!(names, vec!["OPS/deploy", "TEAM/anvils", "TEAM/widgets"]);

    let widgets = repos.iter().find(|r| r.name == "widgets").unwrap();
    assert!(widgets.private);
    assert_eq!(widgets.description, "widget factory");
    assert!(widgets.url.ends_with("/projects/TEAM/repos/widgets/browse"));
    assert_eq!(widgets.provider, "bitbucket");
}

#[tokio::test]
async fn creates_a_pull_request_and_returns_its_self_link() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/api/1.0/projects/TEAM/repos/widgets/pull-requests"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 42,
            "title": "User story: add health check",
            "links": {
                "self": [{"href": format!("{}/projects/TEAM/repos/widgets/pull-requests/42", server.uri())}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let url = provider(&server)
        .create_pull_request(
            None,
            &format!("{}/projects/TEAM/repos/widgets/browse", server.uri()),
            "feature/user-story-update-20240101000000",
            "User story: add health check",
            "Automated change",
            "main",
        )
        .await
        .unwrap();

    assert!(url.ends_with("/pull-requests/42"));
}

#[tokio::test]
async fn missing_repository_maps_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/api/1.0/projects/TEAM/repos/ghost/pull-requests"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{"message": "Repository TEAM/ghost does not exist"}]
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .create_pull_request(
            None,
            &format!("{}/projects/TEAM/repos/ghost/browse", server.uri()),
            "feature/user-story-update-20240101000000",
            "title",
            "body",
            "main",
        )
        .await
        .unwrap_err();

    match err {
        HostingError::RepositoryNotFound { owner, repo } => {
            assert_eq!(owner, "TEAM");
            assert_eq!(repo, "ghost");
        }
        other => panic!("Expected RepositoryNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn surfaces_server_errors_with_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let err = provider(&server).list_repositories(None).await.unwrap_err();
    assert!(matches!(err, HostingError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn fetches_user_info_from_the_users_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/latest/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"slug": "jdoe", "displayName": "J. Doe"}],
            "isLastPage": true
        })))
        .mount(&server)
        .await;

    let user = provider(&server).get_user_info(None).await.unwrap();
    assert_eq!(user.login, "jdoe");
    assert_eq!(user.name.as_deref(), Some("J. Doe"));
    assert!(user.avatar_url.unwrap().contains("/users/jdoe/avatar.png"));
}

#[tokio::test]
async fn oauth_endpoints_are_rejected() {
    let server = MockServer::start().await;
    let provider = provider(&server);

    assert!(matches!(
        provider.authorize_url("state"),
        Err(HostingError::OAuthNotSupported("bitbucket"))
    ));
    assert!(matches!(
        provider.exchange_code("code").await,
        Err(HostingError::OAuthNotSupported("bitbucket"))
    ));
}
