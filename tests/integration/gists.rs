//! Integration tests for gists

use super::*;
use chrono::{TimeZone, Utc};
use integrations_github_commands::mocks::fixtures;
use integrations_github_commands::{
    ApiValue, CreateGistRequest, Gist, GistCommit, GitHubClient, GitHubErrorKind, ListGistsParams,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_get_gist_revision() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/gists/aa5a315d61ae9438b18d/57a7f021a713b1c5a6a199b54cc514735d2d462f"))
        .respond_with(success_response(fixtures::gist("aa5a315d61ae9438b18d", "hello.rs", "fn main() {}")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let gist = client
        .gists()
        .get(
            "aa5a315d61ae9438b18d",
            Some("57a7f021a713b1c5a6a199b54cc514735d2d462f"),
        )
        .await
        .unwrap();

    let typed: Gist = gist.deserialize_into().unwrap();
    assert_eq!(typed.files["hello.rs"].content.as_deref(), Some("fn main() {}"));
    assert_eq!(gist.get("gist_id").and_then(ApiValue::as_str), Some("aa5a315d61ae9438b18d"));
}

#[tokio::test]
async fn test_decorations_can_be_disabled() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/gists/abc"))
        .respond_with(success_response(fixtures::gist("abc", "a.txt", "hi")))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server)
        .disable_pipeline_support(true)
        .build()
        .unwrap();
    let client = GitHubClient::new(config).unwrap();
    let gist = client.gists().get("abc", None).await.unwrap();

    assert!(gist.get("gist_id").is_none());
}

#[tokio::test]
async fn test_list_for_user_with_since() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/users/octocat/gists"))
        .and(query_param("since", "2024-01-02T03:04:05Z"))
        .respond_with(success_response(json!([fixtures::gist("abc", "a.txt", "hi")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let params = ListGistsParams {
        since: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
        ..Default::default()
    };
    let gists = client.gists().list_for_user("octocat", &params).await.unwrap();

    assert_eq!(gists.len(), 1);
}

#[tokio::test]
async fn test_list_starred_and_forks() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/gists/starred"))
        .respond_with(success_response(json!([fixtures::gist("s1", "a.txt", "1")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gists/abc/forks"))
        .respond_with(success_response(json!([{ "id": "f1", "url": "https://api.github.com/gists/f1" }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let starred = client.gists().list_starred(&ListGistsParams::default()).await.unwrap();
    let forks = client.gists().list_forks("abc").await.unwrap();

    assert_eq!(starred[0].get("gist_id").and_then(ApiValue::as_str), Some("s1"));
    assert_eq!(forks[0].get("gist_id").and_then(ApiValue::as_str), Some("f1"));
}

#[tokio::test]
async fn test_list_commits_projects_revisions() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/gists/abc/commits"))
        .respond_with(success_response(json!([{
            "url": "https://api.github.com/gists/abc/57a7f021a713b1c5a6a199b54cc514735d2d462f",
            "version": "57a7f021a713b1c5a6a199b54cc514735d2d462f",
            "user": fixtures::user("octocat"),
            "change_status": { "deletions": 0, "additions": 180, "total": 180 },
            "committed_at": "2010-04-14T02:15:15Z"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let commits = client.gists().list_commits("abc").await.unwrap();

    assert_eq!(commits[0].get("gist_id").and_then(ApiValue::as_str), Some("abc"));
    let commit: GistCommit = commits[0].deserialize_into().unwrap();
    assert_eq!(commit.version, "57a7f021a713b1c5a6a199b54cc514735d2d462f");
    assert_eq!(commit.change_status.additions, 180);
    assert_eq!(commit.committed_at, Utc.with_ymd_and_hms(2010, 4, 14, 2, 15, 15).unwrap());
}

#[tokio::test]
async fn test_create_gist() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("/gists", "POST")
        .and(body_json(json!({
            "description": "Example",
            "public": false,
            "files": { "hello.txt": { "content": "Hello World" } }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixtures::gist("new1", "hello.txt", "Hello World")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let request = CreateGistRequest::new(false)
        .description("Example")
        .file("hello.txt", "Hello World");
    let created = client.gists().create(&request).await.unwrap();

    assert_eq!(created.get("gist_id").and_then(ApiValue::as_str), Some("new1"));
}

#[tokio::test]
async fn test_create_gist_without_files_fails() {
    let mock_server = setup_mock_server().await;
    let client = test_client(&mock_server);

    let error = client
        .gists()
        .create(&CreateGistRequest::new(true))
        .await
        .unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::ValidationError);
}

#[tokio::test]
async fn test_create_gist_from_paths() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/gists"))
        .and(body_json(json!({
            "public": true,
            "files": { "notes.md": { "content": "# Notes" } }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixtures::gist("new2", "notes.md", "# Notes")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = scratch_dir();
    let file = dir.join("notes.md");
    std::fs::write(&file, "# Notes").unwrap();

    let client = test_client(&mock_server);
    client.gists().create_from_paths(&[file], None, true).await.unwrap();
}

#[tokio::test]
async fn test_file_edits() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("PATCH"))
        .and(path("/gists/abc"))
        .and(body_json(json!({ "files": { "old.txt": null } })))
        .respond_with(success_response(fixtures::gist("abc", "a.txt", "hi")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/gists/abc"))
        .and(body_json(json!({ "files": { "a.txt": { "filename": "b.txt" } } })))
        .respond_with(success_response(fixtures::gist("abc", "b.txt", "hi")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/gists/abc"))
        .and(body_json(json!({ "files": { "c.txt": { "content": "new" } } })))
        .respond_with(success_response(fixtures::gist("abc", "c.txt", "new")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/gists/abc"))
        .and(body_json(json!({ "description": "Renamed" })))
        .respond_with(success_response(fixtures::gist("abc", "c.txt", "new")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let gists = client.gists();

    gists.remove_files("abc", &["old.txt"]).await.unwrap();
    gists.rename_file("abc", "a.txt", "b.txt").await.unwrap();

    let mut files = BTreeMap::new();
    files.insert("c.txt".to_string(), "new".to_string());
    gists.set_files("abc", files).await.unwrap();

    gists.update_description("abc", "Renamed").await.unwrap();
}

#[tokio::test]
async fn test_star_lifecycle() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("PUT"))
        .and(path("/gists/abc/star"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/gists/abc/star"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gists/abc/star"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gists/def/star"))
        .respond_with(error_response(404, fixtures::error_body("Not Found")))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let gists = client.gists();

    gists.star("abc").await.unwrap();
    gists.unstar("abc").await.unwrap();
    assert!(gists.is_starred("abc").await.unwrap());
    assert!(!gists.is_starred("def").await.unwrap());
}

#[tokio::test]
async fn test_fork_and_remove() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/gists/abc/forks"))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixtures::gist("fork1", "a.txt", "hi")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/gists/fork1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let fork = client.gists().fork("abc").await.unwrap();
    let fork_id = fork.get("gist_id").and_then(ApiValue::as_str).unwrap().to_string();
    client.gists().remove(&fork_id).await.unwrap();
}

#[tokio::test]
async fn test_save_writes_files_and_respects_force() {
    let mock_server = setup_mock_server().await;

    let mut gist = fixtures::gist("abc", "small.txt", "small content");
    gist["files"]["big.log"] = json!({
        "filename": "big.log",
        "truncated": true,
        "content": "only the start",
        "raw_url": format!("{}/raw/abc/big.log", mock_server.uri())
    });

    Mock::given(method("GET"))
        .and(path("/gists/abc"))
        .respond_with(success_response(gist))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/raw/abc/big.log"))
        .respond_with(ResponseTemplate::new(200).set_body_string("the whole log"))
        .mount(&mock_server)
        .await;

    let dir = scratch_dir();
    let client = test_client(&mock_server);

    let written = client.gists().save("abc", &dir, false).await.unwrap();
    assert_eq!(written, vec![dir.join("big.log"), dir.join("small.txt")]);
    assert_eq!(std::fs::read_to_string(dir.join("small.txt")).unwrap(), "small content");
    assert_eq!(std::fs::read_to_string(dir.join("big.log")).unwrap(), "the whole log");

    let error = client.gists().save("abc", &dir, false).await.unwrap_err();
    assert_eq!(*error.kind(), GitHubErrorKind::ValidationError);

    client.gists().save("abc", &dir, true).await.unwrap();
}

#[tokio::test]
async fn test_save_conflict_writes_nothing() {
    let mock_server = setup_mock_server().await;

    let mut gist = fixtures::gist("abc", "small.txt", "small content");
    gist["files"]["big.log"] = json!({
        "filename": "big.log",
        "truncated": true,
        "content": "only the start",
        "raw_url": format!("{}/raw/abc/big.log", mock_server.uri())
    });

    Mock::given(method("GET"))
        .and(path("/gists/abc"))
        .respond_with(success_response(gist))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/raw/abc/big.log"))
        .respond_with(ResponseTemplate::new(200).set_body_string("the whole log"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = scratch_dir();
    std::fs::write(dir.join("small.txt"), "local edits").unwrap();

    let client = test_client(&mock_server);
    let error = client.gists().save("abc", &dir, false).await.unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::ValidationError);
    assert!(error.to_string().contains("small.txt"));
    assert!(!dir.join("big.log").exists());
    assert_eq!(std::fs::read_to_string(dir.join("small.txt")).unwrap(), "local edits");
}
