//! Classic project board operations.

use super::{copy_field, decorate, decorate_all, repository, with_query, with_repository_telemetry};
use crate::client::{GitHubClient, RestRequest};
use crate::errors::{GitHubError, GitHubResult};
use crate::materialize::ApiValue;
use crate::observability::pii_safe;
use crate::types::{OrganizationPermission, ProjectState, StateFilter};
use crate::uri::RepositoryParams;
use secrecy::SecretString;
use serde::Serialize;

/// Projects are still behind a preview media type.
pub const PROJECTS_ACCEPT: &str = "application/vnd.github.inertia-preview+json";

/// Who owns a project.
#[derive(Debug, Clone)]
pub enum ProjectOwner {
    /// A repository.
    Repository(RepositoryParams),
    /// An organization login.
    Organization(String),
    /// A user login. Creating always targets the authenticated user.
    User(String),
}

/// Service for classic projects.
pub struct ProjectsService<'a> {
    client: &'a GitHubClient,
    access_token: Option<SecretString>,
}

impl<'a> ProjectsService<'a> {
    /// Creates a new projects service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self {
            client,
            access_token: None,
        }
    }

    /// Uses `token` instead of the client's token provider.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::new(token.into()));
        self
    }

    /// Lists the projects of an owner.
    pub async fn list(&self, owner: ProjectOwner, state: Option<StateFilter>) -> GitHubResult<Vec<ApiValue>> {
        let query = ListProjectsParams { state };
        let request = match owner {
            ProjectOwner::Repository(params) => {
                let repo = repository(self.client, params)?;
                let fragment = with_query(format!("{}/projects", repo.api_path()), &query)?;
                with_repository_telemetry(RestRequest::get(fragment), &repo)
                    .description(format!("Getting projects for {}", repo.repository_name))
            }
            ProjectOwner::Organization(org) => {
                RestRequest::get(with_query(format!("orgs/{}/projects", org), &query)?)
                    .telemetry_property("OrganizationName", pii_safe(&org))
                    .description(format!("Getting projects for {}", org))
            }
            ProjectOwner::User(user) => RestRequest::get(with_query(format!("users/{}/projects", user), &query)?)
                .telemetry_property("UserName", pii_safe(&user))
                .description(format!("Getting projects for {}", user)),
        };
        let request = self.request(request, "Projects.List");

        let items = self.client.invoke_multiple_result(request, false).await?;
        Ok(decorate_all(self.client, items, project_decorator))
    }

    /// Gets a project.
    pub async fn get(&self, project_id: u64) -> GitHubResult<ApiValue> {
        let request = self.request(
            RestRequest::get(format!("projects/{}", project_id)).description(format!("Getting project {}", project_id)),
            "Projects.Get",
        );
        let project = self.client.invoke(&request).await?;
        Ok(decorate(self.client, project, project_decorator))
    }

    /// Creates a project.
    pub async fn create(&self, owner: ProjectOwner, name: &str, description: Option<&str>) -> GitHubResult<ApiValue> {
        if name.trim().is_empty() {
            return Err(GitHubError::validation("A project needs a name."));
        }

        let request_base = match owner {
            ProjectOwner::Repository(params) => {
                let repo = repository(self.client, params)?;
                with_repository_telemetry(RestRequest::post(format!("{}/projects", repo.api_path())), &repo)
                    .description(format!("Creating project for {}", repo.repository_name))
            }
            ProjectOwner::Organization(org) => RestRequest::post(format!("orgs/{}/projects", org))
                .telemetry_property("OrganizationName", pii_safe(&org))
                .description(format!("Creating project for {}", org)),
            ProjectOwner::User(_) => RestRequest::post("user/projects").description("Creating project for current user"),
        };

        let request = self
            .request(request_base, "Projects.Create")
            .json(&CreateProjectRequest { name, body: description })?;
        let project = self.client.invoke(&request).await?;
        Ok(decorate(self.client, project, project_decorator))
    }

    /// Updates a project. Only the fields set are changed.
    pub async fn update(&self, project_id: u64, update: &UpdateProjectRequest) -> GitHubResult<ApiValue> {
        let request = self
            .request(
                RestRequest::patch(format!("projects/{}", project_id))
                    .description(format!("Updating project {}", project_id)),
                "Projects.Update",
            )
            .json(update)?;
        let project = self.client.invoke(&request).await?;
        Ok(decorate(self.client, project, project_decorator))
    }

    /// Deletes a project.
    pub async fn remove(&self, project_id: u64) -> GitHubResult<()> {
        let request = self.request(
            RestRequest::delete(format!("projects/{}", project_id))
                .description(format!("Removing project {}", project_id)),
            "Projects.Remove",
        );
        self.client.invoke(&request).await?;
        Ok(())
    }

    fn request(&self, request: RestRequest, event: &str) -> RestRequest {
        request
            .accept(PROJECTS_ACCEPT)
            .access_token(self.access_token.clone())
            .telemetry_event(event)
    }
}

fn project_decorator(item: &mut ApiValue) {
    copy_field(item, "id", "project_id");
}

#[derive(Debug, Serialize)]
struct ListProjectsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<StateFilter>,
}

#[derive(Debug, Serialize)]
struct CreateProjectRequest<'b> {
    name: &'b str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'b str>,
}

/// Body of a project update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateProjectRequest {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none", rename = "body")]
    pub description: Option<String>,
    /// Open or close the project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<ProjectState>,
    /// Base permission for organization members (organization projects).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_permission: Option<OrganizationPermission>,
    /// Visibility (organization projects).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}
