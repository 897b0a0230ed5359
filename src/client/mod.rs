//! GitHub API client implementation.
//!
//! Every REST and GraphQL call goes through [`GitHubClient::invoke`] and its
//! siblings: URL composition, headers, token resolution, body/upload
//! handling, 202 polling, failure narratives, logging and telemetry.

mod request;

pub use request::{
    content_type_for_extension, file_extension, RestRequest, DEFAULT_ACCEPT, DEFAULT_CONTENT_TYPE,
    DEFAULT_TELEMETRY_EVENT, DEFAULT_UPLOAD_CONTENT_TYPE,
};

use crate::auth::{
    authorization_header, resolve_access_token, AnonymousTokenProvider, AuthMethod, StaticTokenProvider,
    TokenProvider,
};
use crate::config::{GitHubConfig, GitHubConfigBuilder};
use crate::errors::{from_http_failure, ErrorNarrative, GitHubError, GitHubErrorKind, GitHubResult};
use crate::materialize::{materialize, ApiValue};
use crate::observability::{
    LoggingProgress, ProgressReporter, TelemetryMetrics, TelemetryProperties, TelemetrySink, TracingHooks,
    TracingTelemetry,
};
use crate::pagination::{collect_pages, ExtendedResult};
use crate::resilience::{is_state_changing, NotReadyAction, NotReadyPolicy};
use crate::services::*;
use bytes::Bytes;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// A response as it came off the wire.
struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

struct ClientInner {
    http: Client,
    config: GitHubConfig,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    telemetry: Arc<dyn TelemetrySink>,
    progress: Arc<dyn ProgressReporter>,
    not_ready: NotReadyPolicy,
}

/// GitHub API client. Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.inner.base_url)
            .field("api_version", &self.inner.config.api_version)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    /// Creates a client with default collaborators.
    pub fn new(config: GitHubConfig) -> GitHubResult<Self> {
        GitHubClientBuilder::new().config(config).build()
    }

    /// Creates a new client builder.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &GitHubConfig {
        &self.inner.config
    }

    /// Gets the REST base URL.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Gets the progress reporter.
    pub fn progress(&self) -> &dyn ProgressReporter {
        self.inner.progress.as_ref()
    }

    // Service accessors

    /// Gets the branches service.
    pub fn branches(&self) -> BranchesService {
        BranchesService::new(self)
    }

    /// Gets the branch protection service.
    pub fn branch_protection(&self) -> BranchProtectionService {
        BranchProtectionService::new(self)
    }

    /// Gets the gists service.
    pub fn gists(&self) -> GistsService {
        GistsService::new(self)
    }

    /// Gets the gist comments service.
    pub fn gist_comments(&self) -> GistCommentsService {
        GistCommentsService::new(self)
    }

    /// Gets the issue comments service.
    pub fn issue_comments(&self) -> IssueCommentsService {
        IssueCommentsService::new(self)
    }

    /// Gets the milestones service.
    pub fn milestones(&self) -> MilestonesService {
        MilestonesService::new(self)
    }

    /// Gets the projects service.
    pub fn projects(&self) -> ProjectsService {
        ProjectsService::new(self)
    }

    /// Gets the GraphQL service.
    pub fn graphql(&self) -> GraphQLService {
        GraphQLService::new(self)
    }

    // Invocation

    /// Sends a request and returns the materialized body.
    pub async fn invoke(&self, request: &RestRequest) -> GitHubResult<ApiValue> {
        let raw = self.execute(request).await?;
        Ok(materialize(&raw.body, self.smarter_objects()))
    }

    /// Sends a request and returns the body together with paging and
    /// rate-limit metadata.
    pub async fn invoke_extended(&self, request: &RestRequest) -> GitHubResult<ExtendedResult> {
        let raw = self.execute(request).await?;
        let result = materialize(&raw.body, self.smarter_objects());
        Ok(ExtendedResult::from_parts(result, raw.status.as_u16(), &raw.headers))
    }

    /// Sends a request and saves the raw body to disk.
    ///
    /// Without a destination the body goes to a uniquely named file in the
    /// system temp directory. Returns the path written.
    pub async fn invoke_to_file(
        &self,
        request: &RestRequest,
        destination: Option<&Path>,
    ) -> GitHubResult<PathBuf> {
        let raw = self.execute(request).await?;
        let path = match destination {
            Some(path) => path.to_path_buf(),
            None => std::env::temp_dir().join(format!("github-{}", uuid::Uuid::new_v4())),
        };

        tokio::fs::write(&path, &raw.body)
            .await
            .map_err(|e| GitHubError::io(format!("Unable to save the response to {}", path.display()), e))?;

        tracing::debug!(path = %path.display(), bytes = raw.body.len(), "Response saved to file");
        Ok(path)
    }

    /// Sends a GET and follows `next` links until the collection is
    /// exhausted, returning every item in order.
    pub async fn invoke_multiple_result(
        &self,
        request: RestRequest,
        single_page: bool,
    ) -> GitHubResult<Vec<ApiValue>> {
        collect_pages(self, request, single_page).await
    }

    /// Composes the absolute URL for a fragment.
    ///
    /// One leading and one trailing `/` are stripped; absolute URLs (such
    /// as pagination links) are used verbatim.
    pub fn build_url(&self, fragment: &str) -> String {
        let fragment = fragment.trim();
        if fragment.starts_with("http://") || fragment.starts_with("https://") {
            return fragment.to_string();
        }

        let fragment = fragment.strip_prefix('/').unwrap_or(fragment);
        let fragment = fragment.strip_suffix('/').unwrap_or(fragment);
        format!("{}/{}", self.inner.base_url, fragment)
    }

    // Internal methods

    fn smarter_objects(&self) -> bool {
        !self.inner.config.disable_smarter_objects
    }

    async fn execute(&self, request: &RestRequest) -> GitHubResult<RawResponse> {
        request.validate()?;

        let url = self.build_url(&request.uri_fragment);
        let method = request.method.clone();
        let started = Instant::now();
        let mut properties = request.telemetry_properties.clone();
        let mut metrics = TelemetryMetrics::new();

        TracingHooks::on_request_start(method.as_str(), &url, &request.description);

        match self
            .execute_inner(request, &url, &mut properties, &mut metrics)
            .await
        {
            Ok(response) => {
                let elapsed = started.elapsed();
                TracingHooks::on_request_complete(method.as_str(), &url, response.status.as_u16(), elapsed);

                if !self.inner.config.disable_telemetry {
                    metrics.insert("Duration".to_string(), elapsed.as_secs_f64());
                    self.inner
                        .telemetry
                        .event(&request.telemetry_event_name, &properties, &metrics);
                }
                Ok(response)
            }
            Err(error) => {
                TracingHooks::on_request_error(method.as_str(), &url, &error);
                if !self.inner.config.disable_telemetry {
                    self.inner.telemetry.exception(&error, &properties);
                }
                Err(error)
            }
        }
    }

    async fn execute_inner(
        &self,
        request: &RestRequest,
        url: &str,
        properties: &mut TelemetryProperties,
        metrics: &mut TelemetryMetrics,
    ) -> GitHubResult<RawResponse> {
        let config = &self.inner.config;
        let token = resolve_access_token(request.access_token.as_ref(), self.inner.tokens.as_ref()).await?;
        let (body, content_type) = prepare_body(request, properties).await?;
        let method = &request.method;
        let mut retries = 0u32;

        let mut headers: Vec<(String, String)> = vec![
            (ACCEPT.to_string(), request.accept.clone()),
            (USER_AGENT.to_string(), config.user_agent.clone()),
            ("X-GitHub-Api-Version".to_string(), config.api_version.clone()),
        ];
        headers.extend(request.additional_headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(token) = &token {
            headers.push((AUTHORIZATION.to_string(), authorization_header(token)));
        }
        TracingHooks::on_request_headers(url, &headers);

        loop {
            let mut builder = self.inner.http.request(method.clone(), url);
            for (name, value) in &headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            if let Some(bytes) = &body {
                builder = builder
                    .header(CONTENT_TYPE, content_type.as_str())
                    .body(bytes.clone());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| transport_error(method, url, e))?;
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| transport_error(method, url, e))?;

            match self.inner.not_ready.decide(status.as_u16(), method, retries) {
                NotReadyAction::Accept => {}
                NotReadyAction::Retry { attempt, delay } => {
                    TracingHooks::on_result_not_ready(url, attempt, self.inner.not_ready.max_retries(), delay);
                    retries = attempt;
                    properties.insert("RequestDelayed".to_string(), "true".to_string());
                    metrics.insert("RequestDelayedCount".to_string(), f64::from(attempt));
                    tokio::time::sleep(delay).await;
                    continue;
                }
                NotReadyAction::AcceptWithWarning(reason) => {
                    TracingHooks::on_result_not_ready_unretried(method.as_str(), url, reason);
                }
                NotReadyAction::Exhausted => return Err(self.inner.not_ready.exhausted_error()),
            }

            if !status.is_success() {
                let request_id = headers
                    .get("x-github-request-id")
                    .and_then(|v| v.to_str().ok());
                return Err(from_http_failure(
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown"),
                    &String::from_utf8_lossy(&bytes),
                    request_id,
                ));
            }

            let state_change_delay = config.retry.state_change_delay;
            if request.waits_for_state_change
                && is_state_changing(method)
                && !state_change_delay.is_zero()
            {
                tracing::debug!(
                    delay_ms = state_change_delay.as_millis() as u64,
                    "Waiting for the state change to settle"
                );
                tokio::time::sleep(state_change_delay).await;
            }

            return Ok(RawResponse {
                status,
                headers,
                body: bytes,
            });
        }
    }
}

/// Reads the upload file, or passes the JSON body through.
async fn prepare_body(
    request: &RestRequest,
    properties: &mut TelemetryProperties,
) -> GitHubResult<(Option<Bytes>, String)> {
    let Some(path) = &request.in_file else {
        return Ok((request.body.clone(), request.content_type.clone()));
    };

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| GitHubError::io(format!("Unable to read {}", path.display()), e))?;

    let extension = file_extension(path);
    let content_type = match content_type_for_extension(&extension) {
        Some(content_type) => {
            properties.insert("FileExtension".to_string(), extension);
            content_type
        }
        None => {
            tracing::warn!(
                extension = %extension,
                "Unable to determine the content type for the file extension, using {}",
                DEFAULT_UPLOAD_CONTENT_TYPE
            );
            properties.insert("UnknownExtension".to_string(), extension);
            DEFAULT_UPLOAD_CONTENT_TYPE
        }
    };

    Ok((Some(Bytes::from(bytes)), content_type.to_string()))
}

/// Composes the error for a request that never produced an HTTP response.
fn transport_error(method: &Method, url: &str, error: reqwest::Error) -> GitHubError {
    let kind = if error.is_timeout() {
        GitHubErrorKind::Timeout
    } else if error.is_builder() {
        GitHubErrorKind::InvalidParameter
    } else if error.is_connect() || error.is_body() || error.is_request() {
        GitHubErrorKind::ConnectionFailed
    } else {
        GitHubErrorKind::Unknown
    };

    let message = ErrorNarrative::new(format!("Request failed: {} {}", method, url))
        .line(error.to_string())
        .finish();
    GitHubError::new(kind, message).with_cause(error)
}

/// Builder for GitHubClient.
pub struct GitHubClientBuilder {
    config_builder: GitHubConfigBuilder,
    token_provider: Option<Arc<dyn TokenProvider>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl GitHubClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: GitHubConfig::builder(),
            token_provider: None,
            telemetry: None,
            progress: None,
        }
    }

    /// Starts from a complete configuration.
    pub fn config(mut self, config: GitHubConfig) -> Self {
        self.config_builder = GitHubConfigBuilder::from_config(config);
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the authentication method.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.config_builder = self.config_builder.auth(auth);
        self
    }

    /// Sets a personal access token.
    pub fn pat(self, token: impl Into<String>) -> Self {
        self.auth(AuthMethod::pat(token))
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets where tokens come from when a call doesn't pass one.
    /// Takes precedence over the configured `auth`.
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Sets the telemetry sink.
    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Sets the progress reporter.
    pub fn progress(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(reporter);
        self
    }

    /// Builds the client.
    pub fn build(self) -> GitHubResult<GitHubClient> {
        let config = self.config_builder.build()?;

        let mut http = Client::builder().connect_timeout(config.connect_timeout);
        if !config.web_request_timeout.is_zero() {
            http = http.timeout(config.web_request_timeout);
        }
        #[cfg(any(feature = "rustls-tls", feature = "native-tls"))]
        {
            http = http.min_tls_version(reqwest::tls::Version::TLS_1_2);
        }
        let http = http.build().map_err(|e| {
            GitHubError::configuration(format!("Failed to create HTTP client: {}", e)).with_cause(e)
        })?;

        let tokens = match (self.token_provider, &config.auth) {
            (Some(provider), _) => provider,
            (None, Some(auth)) => Arc::new(StaticTokenProvider::new(auth.clone())) as Arc<dyn TokenProvider>,
            (None, None) => Arc::new(AnonymousTokenProvider),
        };

        Ok(GitHubClient {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.api_base_url(),
                not_ready: NotReadyPolicy::from_config(&config.retry),
                tokens,
                telemetry: self.telemetry.unwrap_or_else(|| Arc::new(TracingTelemetry)),
                progress: self.progress.unwrap_or_else(|| Arc::new(LoggingProgress)),
                config,
            }),
        })
    }
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
