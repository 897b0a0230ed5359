//! Integration tests using WireMock
//!
//! These tests drive the full request/response cycle against a mock GitHub:
//! URL composition, headers, authentication, paging, error narratives and
//! the object decorations each command adds.

pub mod branches;
pub mod gists;
pub mod milestones_projects;
pub mod pagination;

use integrations_github_commands::{AuthMethod, GitHubClient, GitHubConfig, GitHubConfigBuilder, RepositoryParams};
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

/// Token every test client is configured with.
pub const TEST_TOKEN: &str = "test-token";

/// Helper to create a mock server
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Configuration pointing at the mock server, with fast 202 retries.
pub fn test_config(server: &MockServer) -> GitHubConfigBuilder {
    GitHubConfig::builder()
        .base_url(server.uri())
        .auth(AuthMethod::pat(TEST_TOKEN))
        .maximum_retries_when_result_not_ready(2)
        .retry_delay(Duration::from_millis(10))
}

/// Client pointing at the mock server.
pub fn test_client(server: &MockServer) -> GitHubClient {
    let config = test_config(server).build().expect("valid config");
    GitHubClient::new(config).expect("Failed to build client")
}

/// The repository every service test talks about.
pub fn hello_world() -> RepositoryParams {
    RepositoryParams::from_names("octocat", "Hello-World")
}

/// Helper to create an authenticated mock
pub fn mock_with_auth(path_matcher: &str, method_matcher: &str) -> MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(path_matcher))
        .and(header("Authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
}

/// Helper to create error response templates
pub fn error_response(status: u16, error_body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(error_body)
}

/// Helper to create success response templates
pub fn success_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// A fresh directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("github-commands-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
