//! Gist comment operations.

use super::{copy_field, decorate, decorate_all, MediaType};
use crate::client::{GitHubClient, RestRequest};
use crate::errors::GitHubResult;
use crate::materialize::ApiValue;
use secrecy::SecretString;
use serde::Serialize;

/// Service for comments on gists.
pub struct GistCommentsService<'a> {
    client: &'a GitHubClient,
    access_token: Option<SecretString>,
    media_type: MediaType,
}

impl<'a> GistCommentsService<'a> {
    /// Creates a new gist comments service.
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

    /// Lists the comments on a gist.
    pub async fn list(&self, gist_id: &str) -> GitHubResult<Vec<ApiValue>> {
        let request = self.request(
            RestRequest::get(format!("gists/{}/comments", gist_id)),
            format!("Getting comments for gist {}", gist_id),
            "GistComments.List",
        );
        let items = self.client.invoke_multiple_result(request, false).await?;
        Ok(decorate_all(self.client, items, comment_decorator(gist_id)))
    }

    /// Gets a comment.
    pub async fn get(&self, gist_id: &str, comment_id: u64) -> GitHubResult<ApiValue> {
        let request = self.request(
            RestRequest::get(comment_fragment(gist_id, comment_id)),
            format!("Getting comment {} for gist {}", comment_id, gist_id),
            "GistComments.Get",
        );
        let comment = self.client.invoke(&request).await?;
        Ok(decorate(self.client, comment, comment_decorator(gist_id)))
    }

    /// Creates a comment.
    pub async fn create(&self, gist_id: &str, body: &str) -> GitHubResult<ApiValue> {
        let request = self
            .request(
                RestRequest::post(format!("gists/{}/comments", gist_id)),
                format!("Creating comment on gist {}", gist_id),
                "GistComments.Create",
            )
            .json(&CommentBody { body })?;
        let comment = self.client.invoke(&request).await?;
        Ok(decorate(self.client, comment, comment_decorator(gist_id)))
    }

    /// Replaces the body of a comment.
    pub async fn update(&self, gist_id: &str, comment_id: u64, body: &str) -> GitHubResult<ApiValue> {
        let request = self
            .request(
                RestRequest::patch(comment_fragment(gist_id, comment_id)),
                format!("Updating comment {} on gist {}", comment_id, gist_id),
                "GistComments.Update",
            )
            .json(&CommentBody { body })?;
        let comment = self.client.invoke(&request).await?;
        Ok(decorate(self.client, comment, comment_decorator(gist_id)))
    }

    /// Deletes a comment.
    pub async fn remove(&self, gist_id: &str, comment_id: u64) -> GitHubResult<()> {
        let request = self.request(
            RestRequest::delete(comment_fragment(gist_id, comment_id)),
            format!("Removing comment {} from gist {}", comment_id, gist_id),
            "GistComments.Remove",
        );
        self.client.invoke(&request).await?;
        Ok(())
    }

    fn request(&self, request: RestRequest, description: String, event: &str) -> RestRequest {
        request
            .accept(self.media_type.accept())
            .access_token(self.access_token.clone())
            .description(description)
            .telemetry_event(event)
    }
}

fn comment_fragment(gist_id: &str, comment_id: u64) -> String {
    format!("gists/{}/comments/{}", gist_id, comment_id)
}

fn comment_decorator(gist_id: &str) -> impl Fn(&mut ApiValue) {
    let gist_id = ApiValue::from(gist_id);
    move |item: &mut ApiValue| {
        item.insert("gist_id", gist_id.clone());
        copy_field(item, "id", "comment_id");
    }
}

/// Body of a comment create/update request.
#[derive(Debug, Serialize)]
pub(crate) struct CommentBody<'b> {
    pub body: &'b str,
}
