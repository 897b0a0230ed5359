//! GitHub API service implementations.
//!
//! Every service borrows the client, optionally carries a per-call access
//! token, and returns materialized [`ApiValue`]s decorated with a few
//! convenience fields (`repository_url`, `gist_id`, ...) so results can be
//! fed straight into follow-up calls.

mod branches;
mod gist_comments;
mod gists;
mod graphql;
mod issue_comments;
mod milestones;
mod projects;

pub use branches::*;
pub use gist_comments::*;
pub use gists::*;
pub use graphql::*;
pub use issue_comments::*;
pub use milestones::*;
pub use projects::*;

use crate::client::{GitHubClient, RestRequest};
use crate::errors::{GitHubError, GitHubResult};
use crate::materialize::ApiValue;
use crate::observability::pii_safe;
use crate::uri::{join_uri, resolve_repository, RepositoryParams, RepositoryRef};
use serde::Serialize;

/// Body format requested for comment resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MediaType {
    /// Markdown source.
    #[default]
    Raw,
    /// Plain-text rendering.
    Text,
    /// HTML rendering.
    Html,
    /// Source plus both renderings.
    Full,
}

impl MediaType {
    /// `Accept` header selecting this media type.
    pub fn accept(&self) -> &'static str {
        match self {
            Self::Raw => "application/vnd.github.raw+json",
            Self::Text => "application/vnd.github.text+json",
            Self::Html => "application/vnd.github.html+json",
            Self::Full => "application/vnd.github.full+json",
        }
    }
}

/// Resolves the target repository against the client's defaults.
pub(crate) fn repository(client: &GitHubClient, params: RepositoryParams) -> GitHubResult<RepositoryRef> {
    resolve_repository(&params, client.config())
}

/// Attaches hashed owner/repository telemetry properties.
pub(crate) fn with_repository_telemetry(request: RestRequest, repo: &RepositoryRef) -> RestRequest {
    request
        .telemetry_property("OwnerName", pii_safe(&repo.owner_name))
        .telemetry_property("RepositoryName", pii_safe(&repo.repository_name))
}

/// Web URL of a repository, used for the `repository_url` decoration.
pub(crate) fn repository_url(client: &GitHubClient, repo: &RepositoryRef) -> ApiValue {
    ApiValue::from(join_uri(
        &repo.owner_name,
        &repo.repository_name,
        &client.config().api_host_name,
    ))
}

/// Appends `params` as a query string.
pub(crate) fn with_query<P: Serialize>(fragment: String, params: &P) -> GitHubResult<String> {
    let query = serde_urlencoded::to_string(params)
        .map_err(|e| GitHubError::invalid_parameter(format!("Failed to serialize parameters: {}", e)))?;
    if query.is_empty() {
        Ok(fragment)
    } else {
        Ok(format!("{}?{}", fragment, query))
    }
}

/// Applies `apply` to an object, or to every object in an array.
/// Skipped entirely when pipeline support is disabled.
pub(crate) fn decorate<F>(client: &GitHubClient, mut value: ApiValue, apply: F) -> ApiValue
where
    F: Fn(&mut ApiValue),
{
    if client.config().disable_pipeline_support {
        return value;
    }

    if value.is_object() {
        apply(&mut value);
    } else if let ApiValue::Array(items) = &mut value {
        items.iter_mut().filter(|i| i.is_object()).for_each(|i| apply(i));
    }
    value
}

/// [`decorate`] for a flattened list of results.
pub(crate) fn decorate_all<F>(client: &GitHubClient, items: Vec<ApiValue>, decorate_item: F) -> Vec<ApiValue>
where
    F: Fn(&mut ApiValue),
{
    items
        .into_iter()
        .map(|item| decorate(client, item, &decorate_item))
        .collect()
}

/// Copies `source` to `target` on an object when present.
pub(crate) fn copy_field(value: &mut ApiValue, source: &str, target: &str) {
    if let Some(field) = value.get(source).cloned() {
        value.insert(target, field);
    }
}
