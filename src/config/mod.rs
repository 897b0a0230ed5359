//! Configuration types for the GitHub client.

use crate::auth::AuthMethod;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default GitHub host name.
pub const DEFAULT_API_HOST_NAME: &str = "github.com";

/// Default GitHub API version (date-based).
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(0);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = "integrations-github-commands/0.1.0";

/// Default number of retries while GitHub answers 202 to a GET.
pub const DEFAULT_MAXIMUM_RETRIES_WHEN_RESULT_NOT_READY: u32 = 30;

/// Default delay between 202 retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Default page count at which multi-page progress is reported.
pub const DEFAULT_MULTI_REQUEST_PROGRESS_THRESHOLD: u32 = 10;

/// Settings for the "result not ready" (HTTP 202) retry loop.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retries before giving up.
    pub maximum_retries_when_result_not_ready: u32,
    /// Delay between retries. Zero disables retrying.
    pub retry_delay: Duration,
    /// Sleep after a successful POST/PATCH/PUT/DELETE.
    pub state_change_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            maximum_retries_when_result_not_ready: DEFAULT_MAXIMUM_RETRIES_WHEN_RESULT_NOT_READY,
            retry_delay: DEFAULT_RETRY_DELAY,
            state_change_delay: Duration::ZERO,
        }
    }
}

/// GitHub client configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Host name, `github.com` or a GitHub Enterprise host.
    pub api_host_name: String,
    /// Explicit API base URL, overriding the one derived from the host name.
    pub base_url: Option<String>,
    /// API version header.
    pub api_version: String,
    /// Authentication method.
    pub auth: Option<AuthMethod>,
    /// Request timeout. Zero means no timeout.
    pub web_request_timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// 202 retry and state change settings.
    pub retry: RetryConfig,
    /// Page count from which multi-page progress is reported. Zero disables it.
    pub multi_request_progress_threshold: u32,
    /// Skip date-time upgrading of response fields.
    pub disable_smarter_objects: bool,
    /// Skip convenience fields added to returned objects.
    pub disable_pipeline_support: bool,
    /// Suppress telemetry events.
    pub disable_telemetry: bool,
    /// Owner used when a call names none.
    pub default_owner_name: Option<String>,
    /// Repository used when a call names none.
    pub default_repository_name: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_host_name: DEFAULT_API_HOST_NAME.to_string(),
            base_url: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            auth: None,
            web_request_timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default(),
            multi_request_progress_threshold: DEFAULT_MULTI_REQUEST_PROGRESS_THRESHOLD,
            disable_smarter_objects: false,
            disable_pipeline_support: false,
            disable_telemetry: false,
            default_owner_name: None,
            default_repository_name: None,
        }
    }
}

impl GitHubConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> GitHubConfigBuilder {
        GitHubConfigBuilder::new()
    }

    /// Returns true when talking to github.com rather than an Enterprise host.
    pub fn is_github_dot_com(&self) -> bool {
        self.api_host_name.eq_ignore_ascii_case(DEFAULT_API_HOST_NAME)
    }

    /// REST API root without a trailing slash.
    pub fn api_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.is_github_dot_com() => format!("https://api.{}", self.api_host_name),
            None => format!("https://{}/api/v3", self.api_host_name),
        }
    }

    /// GraphQL endpoint.
    pub fn graphql_url(&self) -> String {
        match &self.base_url {
            Some(url) => format!("{}/graphql", url.trim_end_matches('/')),
            None if self.is_github_dot_com() => format!("https://api.{}/graphql", self.api_host_name),
            None => format!("https://{}/api/graphql", self.api_host_name),
        }
    }

    /// Parses a persisted settings document.
    ///
    /// Keys use the PascalCase names the settings file has always used
    /// (`ApiHostName`, `RetryDelaySeconds`, ...). Missing keys keep defaults.
    pub fn from_json_str(json: &str) -> GitHubResult<Self> {
        let file: SettingsFile = serde_json::from_str(json).map_err(|e| {
            GitHubError::configuration(format!("Failed to parse configuration: {}", e))
        })?;
        let config = file.apply(Self::default());
        config.validate()?;
        Ok(config)
    }

    /// Loads a persisted settings document from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> GitHubResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GitHubError::io(format!("Failed to read {}", path.display()), e))?;
        Self::from_json_str(&content)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), GitHubError> {
        if self.api_host_name.trim().is_empty() {
            return Err(GitHubError::configuration("api_host_name cannot be empty"));
        }

        if self.api_host_name.contains("://") || self.api_host_name.contains('/') {
            return Err(GitHubError::configuration(
                "api_host_name must be a bare host name such as github.com",
            ));
        }

        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(GitHubError::new(
                    GitHubErrorKind::InvalidBaseUrl,
                    "Base URL must start with http:// or https://",
                ));
            }
        }

        if self.user_agent.is_empty() {
            return Err(GitHubError::configuration("User-Agent is required by GitHub API"));
        }

        if chrono::NaiveDate::parse_from_str(&self.api_version, "%Y-%m-%d").is_err() {
            return Err(GitHubError::configuration(format!(
                "api_version must be formatted yyyy-MM-dd, got {}",
                self.api_version
            )));
        }

        Ok(())
    }
}

/// On-disk settings document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SettingsFile {
    api_host_name: Option<String>,
    api_version: Option<String>,
    web_request_timeout_sec: Option<u64>,
    maximum_retries_when_result_not_ready: Option<u32>,
    retry_delay_seconds: Option<u64>,
    state_change_delay_seconds: Option<u64>,
    multi_request_progress_threshold: Option<u32>,
    disable_smarter_objects: Option<bool>,
    disable_pipeline_support: Option<bool>,
    disable_telemetry: Option<bool>,
    default_owner_name: Option<String>,
    default_repository_name: Option<String>,
}

impl SettingsFile {
    fn apply(self, mut config: GitHubConfig) -> GitHubConfig {
        if let Some(host) = self.api_host_name.filter(|h| !h.trim().is_empty()) {
            config.api_host_name = host;
        }
        if let Some(version) = self.api_version {
            config.api_version = version;
        }
        if let Some(secs) = self.web_request_timeout_sec {
            config.web_request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = self.maximum_retries_when_result_not_ready {
            config.retry.maximum_retries_when_result_not_ready = retries;
        }
        if let Some(secs) = self.retry_delay_seconds {
            config.retry.retry_delay = Duration::from_secs(secs);
        }
        if let Some(secs) = self.state_change_delay_seconds {
            config.retry.state_change_delay = Duration::from_secs(secs);
        }
        if let Some(threshold) = self.multi_request_progress_threshold {
            config.multi_request_progress_threshold = threshold;
        }
        config.disable_smarter_objects = self.disable_smarter_objects.unwrap_or(config.disable_smarter_objects);
        config.disable_pipeline_support = self.disable_pipeline_support.unwrap_or(config.disable_pipeline_support);
        config.disable_telemetry = self.disable_telemetry.unwrap_or(config.disable_telemetry);
        config.default_owner_name = self.default_owner_name.filter(|o| !o.is_empty());
        config.default_repository_name = self.default_repository_name.filter(|r| !r.is_empty());
        config
    }
}

/// Builder for GitHubConfig.
#[derive(Debug, Default)]
pub struct GitHubConfigBuilder {
    config: GitHubConfig,
}

impl GitHubConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. one loaded from disk.
    pub fn from_config(config: GitHubConfig) -> Self {
        Self { config }
    }

    /// Sets the host name (`github.com` or an Enterprise host).
    pub fn api_host_name(mut self, host: impl Into<String>) -> Self {
        self.config.api_host_name = host.into();
        self
    }

    /// Overrides the REST base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Sets the API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    /// Sets the authentication method.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.config.auth = Some(auth);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.web_request_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets the maximum number of 202 retries.
    pub fn maximum_retries_when_result_not_ready(mut self, retries: u32) -> Self {
        self.config.retry.maximum_retries_when_result_not_ready = retries;
        self
    }

    /// Sets the delay between 202 retries.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry.retry_delay = delay;
        self
    }

    /// Sets the delay after state-changing requests.
    pub fn state_change_delay(mut self, delay: Duration) -> Self {
        self.config.retry.state_change_delay = delay;
        self
    }

    /// Sets the multi-page progress threshold.
    pub fn multi_request_progress_threshold(mut self, threshold: u32) -> Self {
        self.config.multi_request_progress_threshold = threshold;
        self
    }

    /// Disables date-time upgrading.
    pub fn disable_smarter_objects(mut self, disable: bool) -> Self {
        self.config.disable_smarter_objects = disable;
        self
    }

    /// Disables convenience fields on returned objects.
    pub fn disable_pipeline_support(mut self, disable: bool) -> Self {
        self.config.disable_pipeline_support = disable;
        self
    }

    /// Disables telemetry.
    pub fn disable_telemetry(mut self, disable: bool) -> Self {
        self.config.disable_telemetry = disable;
        self
    }

    /// Sets the default owner.
    pub fn default_owner_name(mut self, owner: impl Into<String>) -> Self {
        self.config.default_owner_name = Some(owner.into());
        self
    }

    /// Sets the default repository.
    pub fn default_repository_name(mut self, repo: impl Into<String>) -> Self {
        self.config.default_repository_name = Some(repo.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<GitHubConfig, GitHubError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
