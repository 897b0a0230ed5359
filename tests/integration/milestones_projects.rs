//! Integration tests for milestones and projects

use super::*;
use chrono::{TimeZone, Utc};
use integrations_github_commands::mocks::fixtures;
use integrations_github_commands::services::PROJECTS_ACCEPT;
use integrations_github_commands::{
    ApiValue, GitHubErrorKind, ListMilestonesParams, MilestoneRequest, MilestoneSort, MilestoneState, Project,
    ProjectOwner, ProjectState, StateFilter, UpdateProjectRequest,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_list_closed_milestones() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/milestones"))
        .and(query_param("state", "closed"))
        .and(query_param("sort", "due_on"))
        .respond_with(success_response(json!([fixtures::milestone(1002604, 1, "v1.0")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let params = ListMilestonesParams {
        state: Some(StateFilter::Closed),
        sort: Some(MilestoneSort::DueOn),
        ..Default::default()
    };
    let milestones = client.milestones().list(hello_world(), &params).await.unwrap();

    assert_eq!(milestones.len(), 1);
    assert_eq!(milestones[0].get("milestone_id").and_then(ApiValue::as_u64), Some(1002604));
    assert_eq!(milestones[0].get("milestone_number").and_then(ApiValue::as_u64), Some(1));
    assert!(milestones[0].get("due_on").and_then(ApiValue::as_datetime).is_some());
}

#[tokio::test]
async fn test_milestone_lifecycle() {
    let mock_server = setup_mock_server().await;

    mock_with_auth("/repos/octocat/Hello-World/milestones", "POST")
        .and(body_json(json!({ "title": "v1.0", "due_on": "2024-12-31T00:00:00Z" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixtures::milestone(7, 3, "v1.0")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/milestones/3"))
        .respond_with(success_response(fixtures::milestone(7, 3, "v1.0")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/repos/octocat/Hello-World/milestones/3"))
        .and(body_json(json!({ "state": "closed" })))
        .respond_with(success_response(fixtures::milestone(7, 3, "v1.0")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/repos/octocat/Hello-World/milestones/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let milestones = client.milestones();

    let request = MilestoneRequest {
        due_on: Some(Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap()),
        ..MilestoneRequest::titled("v1.0")
    };
    let created = milestones.create(hello_world(), &request).await.unwrap();
    assert_eq!(created.get("milestone_number").and_then(ApiValue::as_u64), Some(3));

    milestones.get(hello_world(), 3).await.unwrap();

    let close = MilestoneRequest {
        state: Some(MilestoneState::Closed),
        ..Default::default()
    };
    milestones.update(hello_world(), 3, &close).await.unwrap();
    milestones.remove(hello_world(), 3).await.unwrap();
}

#[tokio::test]
async fn test_milestone_without_title_fails() {
    let mock_server = setup_mock_server().await;
    let client = test_client(&mock_server);

    let error = client
        .milestones()
        .create(hello_world(), &MilestoneRequest::default())
        .await
        .unwrap_err();

    assert_eq!(*error.kind(), GitHubErrorKind::ValidationError);
}

#[tokio::test]
async fn test_list_projects_for_each_owner() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/repos/octocat/Hello-World/projects"))
        .and(header("Accept", PROJECTS_ACCEPT))
        .respond_with(success_response(json!([fixtures::project(1, "Repo board")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orgs/octo-org/projects"))
        .and(query_param("state", "all"))
        .and(header("Accept", PROJECTS_ACCEPT))
        .respond_with(success_response(json!([fixtures::project(2, "Org board")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/users/octocat/projects"))
        .respond_with(success_response(json!([fixtures::project(3, "User board")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let projects = client.projects();

    let repo = projects
        .list(ProjectOwner::Repository(hello_world()), None)
        .await
        .unwrap();
    let org = projects
        .list(ProjectOwner::Organization("octo-org".to_string()), Some(StateFilter::All))
        .await
        .unwrap();
    let user = projects
        .list(ProjectOwner::User("octocat".to_string()), None)
        .await
        .unwrap();

    assert_eq!(repo[0].get("project_id").and_then(ApiValue::as_u64), Some(1));
    assert_eq!(org[0].get("project_id").and_then(ApiValue::as_u64), Some(2));
    let typed: Project = user[0].deserialize_into().unwrap();
    assert_eq!(typed.name, "User board");
}

#[tokio::test]
async fn test_project_lifecycle() {
    let mock_server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/orgs/octo-org/projects"))
        .and(header("Accept", PROJECTS_ACCEPT))
        .and(body_json(json!({ "name": "Roadmap", "body": "Next quarter" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixtures::project(9, "Roadmap")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/user/projects"))
        .and(body_json(json!({ "name": "Personal" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(fixtures::project(10, "Personal")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects/9"))
        .respond_with(success_response(fixtures::project(9, "Roadmap")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/projects/9"))
        .and(body_json(json!({ "state": "closed" })))
        .respond_with(success_response(fixtures::project(9, "Roadmap")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/projects/9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let projects = client.projects();

    let created = projects
        .create(
            ProjectOwner::Organization("octo-org".to_string()),
            "Roadmap",
            Some("Next quarter"),
        )
        .await
        .unwrap();
    assert_eq!(created.get("project_id").and_then(ApiValue::as_u64), Some(9));

    projects
        .create(ProjectOwner::User("octocat".to_string()), "Personal", None)
        .await
        .unwrap();

    projects.get(9).await.unwrap();

    let close = UpdateProjectRequest {
        state: Some(ProjectState::Closed),
        ..Default::default()
    };
    projects.update(9, &close).await.unwrap();
    projects.remove(9).await.unwrap();
}
