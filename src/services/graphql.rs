//! GraphQL client for GitHub's GraphQL API v4.
//!
//! Queries go through the same invocation core as REST calls, so headers,
//! token resolution, failure narratives and telemetry are shared. A response
//! carrying an `errors` array is turned into a [`GitHubError`] even though
//! it arrived with HTTP 200.

use crate::client::{GitHubClient, RestRequest};
use crate::errors::{ErrorNarrative, GitHubError, GitHubErrorKind, GitHubResult};
use crate::materialize::ApiValue;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// GraphQL client for GitHub's GraphQL API.
pub struct GraphQLService<'a> {
    client: &'a GitHubClient,
    access_token: Option<SecretString>,
}

impl<'a> GraphQLService<'a> {
    /// Creates a new GraphQL service.
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

    pub(crate) fn with_secret(mut self, token: Option<SecretString>) -> Self {
        self.access_token = token;
        self
    }

    /// Executes a query and returns its materialized `data`.
    pub async fn query(&self, query: &str, variables: Option<serde_json::Value>) -> GitHubResult<ApiValue> {
        Ok(self.execute(query, variables, None).await?.data)
    }

    /// Executes a query and deserializes its `data`.
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> GitHubResult<T> {
        self.execute(query, variables, None).await?.data_as()
    }

    /// Executes a mutation and returns its materialized `data`.
    pub async fn mutation(&self, mutation: &str, variables: Option<serde_json::Value>) -> GitHubResult<ApiValue> {
        Ok(self.execute(mutation, variables, None).await?.data)
    }

    /// Executes a request with an explicit operation name.
    pub async fn execute(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
        operation_name: Option<&str>,
    ) -> GitHubResult<GraphQLResponse> {
        let body = GraphQLRequest {
            query: query.to_string(),
            variables,
            operation_name: operation_name.map(String::from),
        };

        let mut request = RestRequest::post(self.client.config().graphql_url())
            .json(&body)?
            .access_token(self.access_token.clone())
            .description(match operation_name {
                Some(name) => format!("Executing GraphQL operation {}", name),
                None => "Executing GraphQL query".to_string(),
            })
            .telemetry_event("Invoke-GHGraphQl");
        if !is_mutation(query) {
            request = request.skip_state_change_delay();
        }

        let response = self.client.invoke(&request).await?;
        parse_graphql_response(response)
    }
}

/// True when the document's operation is a mutation.
fn is_mutation(document: &str) -> bool {
    document
        .trim_start()
        .strip_prefix("mutation")
        .map_or(false, |rest| rest.starts_with(|c: char| !c.is_alphanumeric() && c != '_'))
}

/// Splits a materialized GraphQL envelope into data and metadata, failing
/// when it carries errors.
pub(crate) fn parse_graphql_response(response: ApiValue) -> GitHubResult<GraphQLResponse> {
    let errors: Vec<GraphQLError> = match response.get("errors") {
        Some(errors) if !errors.is_null() => errors.deserialize_into()?,
        _ => Vec::new(),
    };
    if !errors.is_empty() {
        return Err(compose_query_error(&errors));
    }

    let rate_limit = response
        .get("extensions")
        .and_then(|e| e.get("rateLimit"))
        .map(ApiValue::deserialize_into::<GraphQLRateLimit>)
        .transpose()?;

    Ok(GraphQLResponse {
        data: response.get("data").cloned().unwrap_or(ApiValue::Null),
        rate_limit,
    })
}

/// Builds one error out of every GraphQL error in a response.
fn compose_query_error(errors: &[GraphQLError]) -> GitHubError {
    let kind = errors
        .iter()
        .find_map(|e| match e.error_type.as_deref() {
            Some("NOT_FOUND") => Some(GitHubErrorKind::NotFound),
            Some("FORBIDDEN") => Some(GitHubErrorKind::Forbidden),
            Some("RATE_LIMITED") => Some(GitHubErrorKind::RateLimited),
            _ => None,
        })
        .unwrap_or(GitHubErrorKind::QueryError);

    let narrative = errors.iter().fold(
        ErrorNarrative::new("The GraphQL query returned errors."),
        |narrative, error| match &error.error_type {
            Some(error_type) => narrative.line(format!("{} | {}", error.message, error_type)),
            None => narrative.line(error.message.clone()),
        },
    );

    GitHubError::new(kind, narrative.finish())
}

/// GraphQL request payload.
#[derive(Debug, Clone, Serialize)]
struct GraphQLRequest {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "operationName")]
    operation_name: Option<String>,
}

/// GraphQL-specific rate limit information.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQLRateLimit {
    /// Maximum points allowed per hour.
    pub limit: u32,
    /// Points remaining in current window.
    pub remaining: u32,
    /// Time when the rate limit resets (ISO 8601).
    #[serde(rename = "resetAt")]
    pub reset_at: String,
    /// Cost of the current query in points.
    pub cost: Option<u32>,
}

/// Successful GraphQL response.
#[derive(Debug, Clone)]
pub struct GraphQLResponse {
    /// Materialized `data`.
    pub data: ApiValue,
    /// Rate limit information, when the query asked for it.
    pub rate_limit: Option<GraphQLRateLimit>,
}

impl GraphQLResponse {
    /// Deserializes `data` into a typed projection.
    pub fn data_as<T: DeserializeOwned>(&self) -> GitHubResult<T> {
        if self.data.is_null() {
            return Err(GitHubError::new(
                GitHubErrorKind::QueryError,
                "GraphQL response contains no data",
            ));
        }
        self.data.deserialize_into()
    }

    /// Returns the rate limit cost if available.
    pub fn query_cost(&self) -> Option<u32> {
        self.rate_limit.as_ref().and_then(|rl| rl.cost)
    }
}

/// GraphQL error with detailed information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Error type (e.g., "RATE_LIMITED", "NOT_FOUND").
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Path to the field that caused the error.
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
    /// Source locations in the query.
    #[serde(default)]
    pub locations: Option<Vec<GraphQLLocation>>,
}

/// Location in GraphQL query source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLLocation {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// Helper for building paginated GraphQL queries.
#[derive(Debug, Clone, Default)]
pub struct GraphQLPagination {
    /// Number of items per page.
    pub first: Option<u32>,
    /// Cursor for fetching items after this point.
    pub after: Option<String>,
}

impl GraphQLPagination {
    /// Creates a forward pagination with the given page size.
    pub fn forward(first: u32) -> Self {
        Self {
            first: Some(first),
            after: None,
        }
    }

    /// Creates a forward pagination starting after the given cursor.
    pub fn forward_after(first: u32, after: String) -> Self {
        Self {
            first: Some(first),
            after: Some(after),
        }
    }

    /// Converts pagination to JSON value for GraphQL variables.
    pub fn to_variables(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();

        if let Some(first) = self.first {
            map.insert("first".to_string(), serde_json::json!(first));
        }
        if let Some(ref after) = self.after {
            map.insert("after".to_string(), serde_json::json!(after));
        }

        serde_json::Value::Object(map)
    }
}

/// Common PageInfo type for GraphQL pagination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    /// Whether there are more items when paginating forward.
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    /// Cursor for the last item in this page.
    #[serde(rename = "endCursor")]
    pub end_cursor: Option<String>,
}
