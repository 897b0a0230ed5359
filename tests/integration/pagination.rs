//! Integration tests for Link-header paging

use super::*;
use integrations_github_commands::mocks::{fixtures, RecordingProgress};
use integrations_github_commands::{ApiValue, GitHubClient, GitHubErrorKind, ListGistsParams, RestRequest};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mounts three pages of public gists. Page-specific mocks go first so
/// they win over the unqualified first-page mock.
async fn mount_three_pages(mock_server: &MockServer) {
    let base = format!("{}/gists/public", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/gists/public"))
        .and(query_param("page", "3"))
        .respond_with(success_response(json!([fixtures::gist("g5", "e.txt", "5")])))
        .expect(1)
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gists/public"))
        .and(query_param("page", "2"))
        .respond_with(
            success_response(json!([fixtures::gist("g3", "c.txt", "3"), fixtures::gist("g4", "d.txt", "4")]))
                .insert_header("Link", fixtures::link_header(&base, 3, 3).as_str()),
        )
        .expect(1)
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gists/public"))
        .respond_with(
            success_response(json!([fixtures::gist("g1", "a.txt", "1"), fixtures::gist("g2", "b.txt", "2")]))
                .insert_header("Link", fixtures::link_header(&base, 2, 3).as_str()),
        )
        .mount(mock_server)
        .await;
}

fn ids(items: &[ApiValue]) -> Vec<&str> {
    items
        .iter()
        .filter_map(|g| g.get("id").and_then(ApiValue::as_str))
        .collect()
}

#[tokio::test]
async fn test_all_pages_are_collected_in_order() {
    let mock_server = setup_mock_server().await;
    mount_three_pages(&mock_server).await;

    let client = test_client(&mock_server);
    let gists = client.gists().list_public(&ListGistsParams::default()).await.unwrap();

    assert_eq!(ids(&gists), vec!["g1", "g2", "g3", "g4", "g5"]);
    assert!(gists.iter().all(|g| g.get("gist_id").is_some()));
}

#[tokio::test]
async fn test_single_page_stops_after_first_response() {
    let mock_server = setup_mock_server().await;
    let base = format!("{}/gists/public", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/gists/public"))
        .and(query_param("page", "2"))
        .respond_with(success_response(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gists/public"))
        .respond_with(
            success_response(json!([fixtures::gist("g1", "a.txt", "1")]))
                .insert_header("Link", fixtures::link_header(&base, 2, 3).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let params = ListGistsParams {
        single_page: true,
        ..Default::default()
    };
    let gists = client.gists().list_public(&params).await.unwrap();

    assert_eq!(ids(&gists), vec!["g1"]);
}

#[tokio::test]
async fn test_since_cursor_is_followed() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .and(query_param("since", "46"))
        .respond_with(success_response(json!([fixtures::user("mojombo")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(
            success_response(json!([fixtures::user("octocat")])).insert_header(
                "Link",
                format!("<{}/users?since=46>; rel=\"next\"", mock_server.uri()).as_str(),
            ),
        )
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let users = client
        .invoke_multiple_result(RestRequest::get("users").description("Getting users"), false)
        .await
        .unwrap();

    let logins: Vec<_> = users
        .iter()
        .filter_map(|u| u.get("login").and_then(ApiValue::as_str))
        .collect();
    assert_eq!(logins, vec!["octocat", "mojombo"]);
}

#[tokio::test]
async fn test_links_with_commas_in_query_are_followed() {
    let mock_server = setup_mock_server().await;
    let base = format!("{}/repos/octocat/Hello-World/issues?labels=bug,docs", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/issues"))
        .and(query_param("labels", "bug,docs"))
        .and(query_param("page", "2"))
        .respond_with(success_response(json!([{ "id": 2 }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/issues"))
        .respond_with(success_response(json!([{ "id": 1 }])).insert_header(
            "Link",
            format!("<{0}&page=2>; rel=\"next\", <{0}&page=2>; rel=\"last\"", base).as_str(),
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let issues = client
        .invoke_multiple_result(RestRequest::get("repos/octocat/Hello-World/issues?labels=bug,docs"), false)
        .await
        .unwrap();

    let ids: Vec<_> = issues.iter().filter_map(|i| i.get("id").and_then(ApiValue::as_u64)).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_single_object_response_is_one_item() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/gists/abc/commits"))
        .respond_with(success_response(json!({ "version": "57a7f021a713b1c5a6a199b54cc514735d2d462f" })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let commits = client.gists().list_commits("abc").await.unwrap();

    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].get("gist_id").and_then(ApiValue::as_str), Some("abc"));
}

#[tokio::test]
async fn test_progress_is_reported_and_completed() {
    let mock_server = setup_mock_server().await;
    mount_three_pages(&mock_server).await;

    let progress = RecordingProgress::new();
    let client = GitHubClient::builder()
        .config(
            test_config(&mock_server)
                .multi_request_progress_threshold(1)
                .build()
                .unwrap(),
        )
        .progress(Arc::new(progress.clone()))
        .build()
        .unwrap();

    client.gists().list_public(&ListGistsParams::default()).await.unwrap();

    assert_eq!(progress.update_count(), 2);
    assert_eq!(progress.complete_count(), 1);
}

#[tokio::test]
async fn test_progress_is_completed_when_a_page_fails() {
    let mock_server = setup_mock_server().await;
    let base = format!("{}/gists/public", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/gists/public"))
        .and(query_param("page", "2"))
        .respond_with(error_response(500, fixtures::error_body("Server Error")))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gists/public"))
        .respond_with(
            success_response(json!([fixtures::gist("g1", "a.txt", "1")]))
                .insert_header("Link", fixtures::link_header(&base, 2, 3).as_str()),
        )
        .mount(&mock_server)
        .await;

    let progress = RecordingProgress::new();
    let client = GitHubClient::builder()
        .config(
            test_config(&mock_server)
                .multi_request_progress_threshold(1)
                .build()
                .unwrap(),
        )
        .progress(Arc::new(progress.clone()))
        .build()
        .unwrap();

    let error = client
        .gists()
        .list_public(&ListGistsParams::default())
        .await
        .unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::ServerError);
    assert_eq!(progress.complete_count(), 1);
}

#[tokio::test]
async fn test_progress_below_threshold_is_silent() {
    let mock_server = setup_mock_server().await;
    mount_three_pages(&mock_server).await;

    let progress = RecordingProgress::new();
    let client = GitHubClient::builder()
        .config(test_config(&mock_server).build().unwrap())
        .progress(Arc::new(progress.clone()))
        .build()
        .unwrap();

    client.gists().list_public(&ListGistsParams::default()).await.unwrap();

    assert_eq!(progress.update_count(), 0);
}
