//! Milestone operations.

use super::{copy_field, decorate, decorate_all, repository, repository_url, with_query, with_repository_telemetry};
use crate::client::{GitHubClient, RestRequest};
use crate::errors::{GitHubError, GitHubResult};
use crate::materialize::ApiValue;
use crate::types::{Direction, MilestoneSort, MilestoneState, StateFilter};
use crate::uri::{RepositoryParams, RepositoryRef};
use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::SecretString;
use serde::{Serialize, Serializer};

/// Service for milestone operations.
pub struct MilestonesService<'a> {
    client: &'a GitHubClient,
    access_token: Option<SecretString>,
}

impl<'a> MilestonesService<'a> {
    /// Creates a new milestones service.
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

    /// Lists milestones.
    pub async fn list(
        &self,
        repo: impl Into<RepositoryParams>,
        params: &ListMilestonesParams,
    ) -> GitHubResult<Vec<ApiValue>> {
        let repo = repository(self.client, repo.into())?;
        let fragment = with_query(format!("{}/milestones", repo.api_path()), params)?;

        let request = self.request(
            RestRequest::get(fragment),
            &repo,
            format!("Getting milestones for {}", repo.repository_name),
            "Milestones.List",
        );
        let items = self
            .client
            .invoke_multiple_result(request, params.single_page)
            .await?;
        Ok(decorate_all(self.client, items, self.decorator(&repo)))
    }

    /// Gets a milestone by number.
    pub async fn get(&self, repo: impl Into<RepositoryParams>, milestone_number: u64) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;
        let request = self.request(
            RestRequest::get(milestone_fragment(&repo, milestone_number)),
            &repo,
            format!("Getting milestone {} for {}", milestone_number, repo.repository_name),
            "Milestones.Get",
        );
        let milestone = self.client.invoke(&request).await?;
        Ok(decorate(self.client, milestone, self.decorator(&repo)))
    }

    /// Creates a milestone.
    pub async fn create(
        &self,
        repo: impl Into<RepositoryParams>,
        milestone: &MilestoneRequest,
    ) -> GitHubResult<ApiValue> {
        if milestone.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(GitHubError::validation("A milestone needs a title."));
        }

        let repo = repository(self.client, repo.into())?;
        let request = self
            .request(
                RestRequest::post(format!("{}/milestones", repo.api_path())),
                &repo,
                format!("Creating milestone for {}", repo.repository_name),
                "Milestones.Create",
            )
            .json(milestone)?;
        let created = self.client.invoke(&request).await?;
        Ok(decorate(self.client, created, self.decorator(&repo)))
    }

    /// Updates a milestone. Only the fields set are changed.
    pub async fn update(
        &self,
        repo: impl Into<RepositoryParams>,
        milestone_number: u64,
        milestone: &MilestoneRequest,
    ) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;
        let request = self
            .request(
                RestRequest::patch(milestone_fragment(&repo, milestone_number)),
                &repo,
                format!("Updating milestone {} for {}", milestone_number, repo.repository_name),
                "Milestones.Update",
            )
            .json(milestone)?;
        let updated = self.client.invoke(&request).await?;
        Ok(decorate(self.client, updated, self.decorator(&repo)))
    }

    /// Deletes a milestone.
    pub async fn remove(&self, repo: impl Into<RepositoryParams>, milestone_number: u64) -> GitHubResult<()> {
        let repo = repository(self.client, repo.into())?;
        let request = self.request(
            RestRequest::delete(milestone_fragment(&repo, milestone_number)),
            &repo,
            format!("Removing milestone {} from {}", milestone_number, repo.repository_name),
            "Milestones.Remove",
        );
        self.client.invoke(&request).await?;
        Ok(())
    }

    fn request(&self, request: RestRequest, repo: &RepositoryRef, description: String, event: &str) -> RestRequest {
        with_repository_telemetry(request, repo)
            .access_token(self.access_token.clone())
            .description(description)
            .telemetry_event(event)
    }

    fn decorator(&self, repo: &RepositoryRef) -> impl Fn(&mut ApiValue) {
        let url = repository_url(self.client, repo);
        move |item: &mut ApiValue| {
            item.insert("repository_url", url.clone());
            copy_field(item, "id", "milestone_id");
            copy_field(item, "number", "milestone_number");
        }
    }
}

fn milestone_fragment(repo: &RepositoryRef, milestone_number: u64) -> String {
    format!("{}/milestones/{}", repo.api_path(), milestone_number)
}

/// Parameters for listing milestones.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListMilestonesParams {
    /// State filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<StateFilter>,
    /// Sort field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<MilestoneSort>,
    /// Sort direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Stop after the first page.
    #[serde(skip)]
    pub single_page: bool,
}

/// Body of a milestone create/update request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MilestoneRequest {
    /// Title; required when creating.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// State.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<MilestoneState>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Due date. GitHub keeps only the date part.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_due_on")]
    pub due_on: Option<DateTime<Utc>>,
}

impl MilestoneRequest {
    /// Creates a request with a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

fn serialize_due_on<S: Serializer>(due_on: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
    match due_on {
        Some(due_on) => serializer.serialize_str(&due_on.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => serializer.serialize_none(),
    }
}
