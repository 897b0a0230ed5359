//! Issue comment operations.

use super::gist_comments::CommentBody;
use super::gists::serialize_since;
use super::{
    copy_field, decorate, decorate_all, repository, repository_url, with_query, with_repository_telemetry, MediaType,
};
use crate::client::{GitHubClient, RestRequest};
use crate::errors::GitHubResult;
use crate::materialize::ApiValue;
use crate::types::{CommentSort, Direction};
use crate::uri::{RepositoryParams, RepositoryRef};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;

/// Service for comments on issues and pull requests.
pub struct IssueCommentsService<'a> {
    client: &'a GitHubClient,
    access_token: Option<SecretString>,
    media_type: MediaType,
}

impl<'a> IssueCommentsService<'a> {
    /// Creates a new issue comments service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self {
            client,
            access_token: None,
            media_type: MediaType::default(),
        }
    }

    /// Uses `token` instead of the client's token provider.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::new(token.into()));
        self
    }

    /// Selects the body format of returned comments.
    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// Lists the comments on one issue.
    pub async fn list_for_issue(
        &self,
        repo: impl Into<RepositoryParams>,
        issue_number: u64,
        since: Option<DateTime<Utc>>,
    ) -> GitHubResult<Vec<ApiValue>> {
        let repo = repository(self.client, repo.into())?;
        let params = ListIssueCommentsParams {
            since,
            ..Default::default()
        };
        let fragment = with_query(format!("{}/issues/{}/comments", repo.api_path(), issue_number), &params)?;

        let request = self.request(
            RestRequest::get(fragment),
            &repo,
            format!("Getting comments for issue {} in {}", issue_number, repo.repository_name),
            "IssueComments.ListForIssue",
        );
        let items = self.client.invoke_multiple_result(request, false).await?;
        Ok(decorate_all(self.client, items, self.decorator(&repo, Some(issue_number))))
    }

    /// Lists every issue comment in a repository.
    pub async fn list_for_repository(
        &self,
        repo: impl Into<RepositoryParams>,
        params: &ListIssueCommentsParams,
    ) -> GitHubResult<Vec<ApiValue>> {
        let repo = repository(self.client, repo.into())?;
        let fragment = with_query(format!("{}/issues/comments", repo.api_path()), params)?;

        let request = self.request(
            RestRequest::get(fragment),
            &repo,
            format!("Getting comments for {}", repo.repository_name),
            "IssueComments.ListForRepository",
        );
        let items = self
            .client
            .invoke_multiple_result(request, params.single_page)
            .await?;
        Ok(decorate_all(self.client, items, self.decorator(&repo, None)))
    }

    /// Gets a comment.
    pub async fn get(&self, repo: impl Into<RepositoryParams>, comment_id: u64) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;
        let request = self.request(
            RestRequest::get(comment_fragment(&repo, comment_id)),
            &repo,
            format!("Getting comment {} for {}", comment_id, repo.repository_name),
            "IssueComments.Get",
        );
        let comment = self.client.invoke(&request).await?;
        Ok(decorate(self.client, comment, self.decorator(&repo, None)))
    }

    /// Comments on an issue.
    pub async fn create(
        &self,
        repo: impl Into<RepositoryParams>,
        issue_number: u64,
        body: &str,
    ) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;
        let request = self
            .request(
                RestRequest::post(format!("{}/issues/{}/comments", repo.api_path(), issue_number)),
                &repo,
                format!("Creating comment under issue {} for {}", issue_number, repo.repository_name),
                "IssueComments.Create",
            )
            .json(&CommentBody { body })?;
        let comment = self.client.invoke(&request).await?;
        Ok(decorate(self.client, comment, self.decorator(&repo, Some(issue_number))))
    }

    /// Replaces the body of a comment.
    pub async fn update(
        &self,
        repo: impl Into<RepositoryParams>,
        comment_id: u64,
        body: &str,
    ) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;
        let request = self
            .request(
                RestRequest::patch(comment_fragment(&repo, comment_id)),
                &repo,
                format!("Updating comment {} for {}", comment_id, repo.repository_name),
                "IssueComments.Update",
            )
            .json(&CommentBody { body })?;
        let comment = self.client.invoke(&request).await?;
        Ok(decorate(self.client, comment, self.decorator(&repo, None)))
    }

    /// Deletes a comment.
    pub async fn remove(&self, repo: impl Into<RepositoryParams>, comment_id: u64) -> GitHubResult<()> {
        let repo = repository(self.client, repo.into())?;
        let request = self.request(
            RestRequest::delete(comment_fragment(&repo, comment_id)),
            &repo,
            format!("Removing comment {} from {}", comment_id, repo.repository_name),
            "IssueComments.Remove",
        );
        self.client.invoke(&request).await?;
        Ok(())
    }

    fn request(&self, request: RestRequest, repo: &RepositoryRef, description: String, event: &str) -> RestRequest {
        with_repository_telemetry(request, repo)
            .accept(self.media_type.accept())
            .access_token(self.access_token.clone())
            .description(description)
            .telemetry_event(event)
    }

    /// Adds `repository_url`, `comment_id` and `issue_number`. Without a
    /// known issue number it is taken from the comment's `issue_url`.
    fn decorator(&self, repo: &RepositoryRef, issue_number: Option<u64>) -> impl Fn(&mut ApiValue) {
        let url = repository_url(self.client, repo);
        move |item: &mut ApiValue| {
            item.insert("repository_url", url.clone());
            copy_field(item, "id", "comment_id");

            let number = issue_number.or_else(|| {
                item.get("issue_url")
                    .and_then(ApiValue::as_str)
                    .and_then(|u| u.rsplit('/').next())
                    .and_then(|n| n.parse().ok())
            });
            if let Some(number) = number {
                item.insert("issue_number", ApiValue::from(number));
            }
        }
    }
}

fn comment_fragment(repo: &RepositoryRef, comment_id: u64) -> String {
    format!("{}/issues/comments/{}", repo.api_path(), comment_id)
}

/// Parameters for listing issue comments.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListIssueCommentsParams {
    /// Sort field (repository-wide listing only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<CommentSort>,
    /// Sort direction; ignored without `sort`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    /// Only comments updated at or after this time.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_since")]
    pub since: Option<DateTime<Utc>>,
    /// Stop after the first page.
    #[serde(skip)]
    pub single_page: bool,
}
