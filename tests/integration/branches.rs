//! Integration tests for branches and branch protection

use super::*;
use integrations_github_commands::mocks::fixtures;
use integrations_github_commands::{
    ApiValue, Branch, BranchProtectionSettings, GitHubErrorKind, ListBranchesParams, PatternProtectionRule,
    RequiredStatusChecks,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

const SHA: &str = "aa218f56b14c9653891f9e74264a383fa43fefbd";

#[tokio::test]
async fn test_list_protected_branches() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("/repos/octocat/Hello-World/branches", "GET")
        .and(query_param("protected", "true"))
        .respond_with(success_response(json!([
            fixtures::branch("main", SHA),
            fixtures::branch("release", SHA)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let branches = client
        .branches()
        .list(hello_world(), &ListBranchesParams::protected_only())
        .await
        .unwrap();

    assert_eq!(branches.len(), 2);
    assert_eq!(branches[1].get("branch_name").and_then(ApiValue::as_str), Some("release"));
    assert_eq!(
        branches[0].get("repository_url").and_then(ApiValue::as_str),
        Some("https://github.com/octocat/Hello-World")
    );

    let typed: Branch = branches[0].deserialize_into().unwrap();
    assert_eq!(typed.name, "main");
    assert_eq!(typed.commit.sha, SHA);
}

#[tokio::test]
async fn test_repository_from_uri() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/branches/main"))
        .respond_with(success_response(fixtures::branch("main", SHA)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let branch = client
        .branches()
        .get(
            RepositoryParams::from_uri("https://github.com/octocat/Hello-World.git"),
            "main",
        )
        .await
        .unwrap();

    assert_eq!(branch.get("branch_name").and_then(ApiValue::as_str), Some("main"));
}

#[tokio::test]
async fn test_default_repository_from_config() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Spoon-Knife/branches/main"))
        .respond_with(success_response(fixtures::branch("main", SHA)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server)
        .default_owner_name("octocat")
        .default_repository_name("Spoon-Knife")
        .build()
        .unwrap();
    let client = integrations_github_commands::GitHubClient::new(config).unwrap();

    client
        .branches()
        .get(RepositoryParams::default(), "main")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_missing_repository_fails_without_a_request() {
    let mock_server = setup_mock_server().await;
    let client = test_client(&mock_server);

    let error = client
        .branches()
        .get(RepositoryParams::default(), "main")
        .await
        .unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::ValidationError);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_branch_from_default_branch() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World"))
        .respond_with(success_response(json!({ "name": "Hello-World", "default_branch": "master" })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/git/refs/heads/master"))
        .respond_with(success_response(fixtures::git_ref("master", SHA)))
        .expect(1)
        .mount(&mock_server)
        .await;

    mock_with_auth("/repos/octocat/Hello-World/git/refs", "POST")
        .and(body_json(json!({ "ref": "refs/heads/feature", "sha": SHA })))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixtures::git_ref("feature", SHA)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let created = client
        .branches()
        .create(hello_world(), "feature", None)
        .await
        .unwrap();

    assert_eq!(created.get("branch_name").and_then(ApiValue::as_str), Some("feature"));
}

#[tokio::test]
async fn test_create_branch_picks_exact_ref_from_prefix_matches() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/git/refs/heads/dev"))
        .respond_with(success_response(json!([
            fixtures::git_ref("develop", "1111111111111111111111111111111111111111"),
            fixtures::git_ref("dev", SHA)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/repos/octocat/Hello-World/git/refs"))
        .and(body_json(json!({ "ref": "refs/heads/topic", "sha": SHA })))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixtures::git_ref("topic", SHA)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client
        .branches()
        .create(hello_world(), "topic", Some("dev"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_branch_with_missing_origin() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/git/refs/heads/nope"))
        .respond_with(error_response(404, fixtures::error_body("Not Found")))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let error = client
        .branches()
        .create(hello_world(), "feature", Some("nope"))
        .await
        .unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::NotFound);
    assert_eq!(error.to_string(), "Origin branch 'nope' not found in octocat/Hello-World.");
}

#[tokio::test]
async fn test_remove_branch() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("/repos/octocat/Hello-World/git/refs/heads/feature", "DELETE")
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client.branches().remove(hello_world(), "feature").await.unwrap();
}

#[tokio::test]
async fn test_protect_unprotected_branch() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/branches/main/protection"))
        .respond_with(error_response(404, fixtures::error_body("Branch not protected")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/repos/octocat/Hello-World/branches/main/protection"))
        .and(body_json(json!({
            "required_status_checks": { "strict": true, "contexts": ["ci/build"] },
            "enforce_admins": true,
            "required_pull_request_reviews": null,
            "restrictions": null
        })))
        .respond_with(success_response(json!({
            "url": "https://api.github.com/repos/octocat/Hello-World/branches/main/protection",
            "enforce_admins": { "enabled": true }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let settings = BranchProtectionSettings {
        required_status_checks: Some(RequiredStatusChecks {
            strict: true,
            contexts: vec!["ci/build".to_string()],
        }),
        enforce_admins: Some(true),
        ..Default::default()
    };

    let client = test_client(&mock_server);
    let rule = client
        .branch_protection()
        .create(hello_world(), "main", &settings)
        .await
        .unwrap();

    assert_eq!(rule.get("branch_name").and_then(ApiValue::as_str), Some("main"));
}

#[tokio::test]
async fn test_protecting_a_protected_branch_fails() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/branches/main/protection"))
        .respond_with(success_response(json!({ "enforce_admins": { "enabled": false } })))
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .respond_with(success_response(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let error = client
        .branch_protection()
        .create(hello_world(), "main", &BranchProtectionSettings::default())
        .await
        .unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::ValidationError);
    assert!(error.to_string().contains("already has a protection rule"));
}

#[tokio::test]
async fn test_protecting_a_missing_branch_fails() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/branches/ghost/protection"))
        .respond_with(error_response(404, fixtures::error_body("Branch not found")))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let error = client
        .branch_protection()
        .create(hello_world(), "ghost", &BranchProtectionSettings::default())
        .await
        .unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::NotFound);
    assert!(error.to_string().contains("Branch not found"));
}

fn rules_page(nodes: serde_json::Value) -> serde_json::Value {
    json!({
        "data": {
            "repository": {
                "id": "R_kgDOAbc",
                "branchProtectionRules": {
                    "nodes": nodes,
                    "pageInfo": { "hasNextPage": false, "endCursor": null }
                }
            }
        }
    })
}

#[tokio::test]
async fn test_get_pattern_rule() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("/graphql", "POST")
        .and(body_string_contains("branchProtectionRules(first"))
        .respond_with(success_response(rules_page(json!([
            { "id": "BPR_1", "pattern": "main" },
            { "id": "BPR_2", "pattern": "release/*" }
        ]))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let rule = client
        .branch_protection()
        .get_pattern_rule(hello_world(), "release/*")
        .await
        .unwrap();

    assert_eq!(rule.get("id").and_then(ApiValue::as_str), Some("BPR_2"));
    assert_eq!(
        rule.get("repository_url").and_then(ApiValue::as_str),
        Some("https://github.com/octocat/Hello-World")
    );
}

#[tokio::test]
async fn test_pattern_rule_lookup_follows_cursor() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("\"after\":\"CURSOR1\""))
        .respond_with(success_response(rules_page(json!([{ "id": "BPR_9", "pattern": "hotfix/*" }]))))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(success_response(json!({
            "data": {
                "repository": {
                    "id": "R_kgDOAbc",
                    "branchProtectionRules": {
                        "nodes": [{ "id": "BPR_1", "pattern": "main" }],
                        "pageInfo": { "hasNextPage": true, "endCursor": "CURSOR1" }
                    }
                }
            }
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let rule = client
        .branch_protection()
        .get_pattern_rule(hello_world(), "hotfix/*")
        .await
        .unwrap();

    assert_eq!(rule.get("id").and_then(ApiValue::as_str), Some("BPR_9"));
}

#[tokio::test]
async fn test_create_pattern_rule() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("createBranchProtectionRule"))
        .and(body_string_contains("\"repositoryId\":\"R_kgDOAbc\""))
        .and(body_string_contains("\"pattern\":\"release/*\""))
        .respond_with(success_response(json!({
            "data": {
                "createBranchProtectionRule": {
                    "branchProtectionRule": { "id": "BPR_3", "pattern": "release/*" }
                }
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("branchProtectionRules(first"))
        .respond_with(success_response(rules_page(json!([{ "id": "BPR_1", "pattern": "main" }]))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let rule = PatternProtectionRule {
        requires_approving_reviews: Some(true),
        required_approving_review_count: Some(2),
        ..PatternProtectionRule::new("release/*")
    };
    let created = client
        .branch_protection()
        .create_pattern_rule(hello_world(), &rule)
        .await
        .unwrap();

    assert_eq!(created.get("id").and_then(ApiValue::as_str), Some("BPR_3"));
}

#[tokio::test]
async fn test_create_existing_pattern_rule_fails() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("createBranchProtectionRule"))
        .respond_with(success_response(json!({})))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(success_response(rules_page(json!([{ "id": "BPR_1", "pattern": "main" }]))))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let error = client
        .branch_protection()
        .create_pattern_rule(hello_world(), &PatternProtectionRule::new("main"))
        .await
        .unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::ValidationError);
}

#[tokio::test]
async fn test_remove_pattern_rule() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("deleteBranchProtectionRule"))
        .and(body_string_contains("\"branchProtectionRuleId\":\"BPR_1\""))
        .respond_with(success_response(json!({
            "data": { "deleteBranchProtectionRule": { "clientMutationId": null } }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(success_response(rules_page(json!([{ "id": "BPR_1", "pattern": "main" }]))))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    client
        .branch_protection()
        .remove_pattern_rule(hello_world(), "main")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remove_missing_pattern_rule() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(success_response(rules_page(json!([]))))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let error = client
        .branch_protection()
        .remove_pattern_rule(hello_world(), "ghost/*")
        .await
        .unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::NotFound);
}
