//! Error types for the GitHub command library.

use std::fmt;
use thiserror::Error;

/// Result type alias for GitHub operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Appended to every 404 failure. GitHub answers 404 both for missing
/// resources and for resources the caller may not see.
pub const NOT_FOUND_EXPLANATION: &str = "This typically happens when the current user isn't properly authenticated. \
GitHub returns 404 instead of 401 or 403 for resources the caller is not allowed to see, \
so the resource may not exist, or it may exist and you don't have permission to access it. \
You may need an access token with additional scopes.";

/// Error kinds for categorizing GitHub errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubErrorKind {
    // Configuration errors
    /// Invalid configuration.
    InvalidConfiguration,
    /// Invalid base URL.
    InvalidBaseUrl,
    /// No token could be resolved where one was required.
    MissingAuth,

    // Request errors, raised before any network call
    /// Caller input failed validation.
    ValidationError,
    /// Invalid parameter.
    InvalidParameter,

    // HTTP errors
    /// Bad request (400).
    BadRequest,
    /// Bad credentials (401).
    BadCredentials,
    /// Access forbidden (403).
    Forbidden,
    /// Resource not found (404).
    NotFound,
    /// Resource conflict (409).
    Conflict,
    /// Resource is gone (410).
    Gone,
    /// Unprocessable entity (422).
    UnprocessableEntity,
    /// Rate limit exceeded.
    RateLimited,
    /// Any 5xx response.
    ServerError,

    /// A GET kept answering 202 after every permitted retry.
    ResultNotReady,

    // Transport errors
    /// Connection failed.
    ConnectionFailed,
    /// Request timeout.
    Timeout,

    // Response errors
    /// Failed to deserialize a response or projection.
    DeserializationError,
    /// Local file I/O failed (uploads and downloads).
    Io,

    // GraphQL errors
    /// GraphQL query error.
    QueryError,

    /// Unknown error.
    Unknown,
}

impl fmt::Display for GitHubErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration => write!(f, "invalid_configuration"),
            Self::InvalidBaseUrl => write!(f, "invalid_base_url"),
            Self::MissingAuth => write!(f, "missing_auth"),
            Self::ValidationError => write!(f, "validation_error"),
            Self::InvalidParameter => write!(f, "invalid_parameter"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::BadCredentials => write!(f, "bad_credentials"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Gone => write!(f, "gone"),
            Self::UnprocessableEntity => write!(f, "unprocessable_entity"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ServerError => write!(f, "server_error"),
            Self::ResultNotReady => write!(f, "result_not_ready"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DeserializationError => write!(f, "deserialization_error"),
            Self::Io => write!(f, "io"),
            Self::QueryError => write!(f, "query_error"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// GitHub error carrying a human-readable, possibly multi-line message.
///
/// For HTTP failures the message is the full narrative assembled by
/// [`ErrorNarrative`]; `Display` prints it unchanged so it can be shown
/// directly to an interactive user.
#[derive(Error, Debug)]
pub struct GitHubError {
    kind: GitHubErrorKind,
    message: String,
    status_code: Option<u16>,
    request_id: Option<String>,
    documentation_url: Option<String>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for GitHubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl GitHubError {
    /// Creates a new GitHub error.
    pub fn new(kind: GitHubErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            documentation_url: None,
            cause: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Sets the GitHub request ID.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Sets the documentation URL.
    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Sets the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &GitHubErrorKind {
        &self.kind
    }

    /// Gets the composed message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the HTTP status code.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Gets the request ID.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Gets the documentation URL.
    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    /// Returns true for 404 responses.
    pub fn is_not_found(&self) -> bool {
        self.kind == GitHubErrorKind::NotFound
    }

    /// Maps HTTP status code to error kind.
    pub fn kind_from_status(status: u16) -> GitHubErrorKind {
        match status {
            400 => GitHubErrorKind::BadRequest,
            401 => GitHubErrorKind::BadCredentials,
            403 => GitHubErrorKind::Forbidden,
            404 => GitHubErrorKind::NotFound,
            409 => GitHubErrorKind::Conflict,
            410 => GitHubErrorKind::Gone,
            422 => GitHubErrorKind::UnprocessableEntity,
            429 => GitHubErrorKind::RateLimited,
            500..=599 => GitHubErrorKind::ServerError,
            _ => GitHubErrorKind::Unknown,
        }
    }

    // Convenience constructors

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidConfiguration, message)
    }

    /// Creates a pre-request validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::ValidationError, message)
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::InvalidParameter, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::NotFound, message).with_status(404)
    }

    /// Creates a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::new(GitHubErrorKind::DeserializationError, message)
    }

    /// Creates a local I/O error.
    pub fn io(context: impl Into<String>, cause: std::io::Error) -> Self {
        let context = context.into();
        Self::new(GitHubErrorKind::Io, format!("{}: {}", context, cause)).with_cause(cause)
    }

    /// Creates the fatal error raised once 202 retries are exhausted.
    pub fn result_not_ready(retries: u32) -> Self {
        Self::new(
            GitHubErrorKind::ResultNotReady,
            format!(
                "Request still not ready after {} retries. \
                 Retry limit can be changed via the maximum_retries_when_result_not_ready configuration value.",
                retries
            ),
        )
        .with_status(202)
    }
}

/// Structured `message`/`documentation_url` body GitHub sends with failures.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
    pub documentation_url: Option<String>,
    #[serde(default, alias = "details")]
    pub errors: Option<serde_json::Value>,
}

/// Builder for the newline-joined failure narrative.
#[derive(Debug, Default)]
pub(crate) struct ErrorNarrative {
    lines: Vec<String>,
}

impl ErrorNarrative {
    pub fn new(headline: impl Into<String>) -> Self {
        Self {
            lines: vec![headline.into()],
        }
    }

    /// Adds the `<code> | <description>` status line.
    pub fn status(mut self, code: u16, description: &str) -> Self {
        self.lines.push(format!("{} | {}", code, description.trim()));
        self
    }

    /// Adds the parsed API error, or the raw body when it isn't the standard shape.
    pub fn body(mut self, raw: &str) -> (Self, Option<String>) {
        let raw = raw.trim();
        if raw.is_empty() {
            return (self, None);
        }

        match serde_json::from_str::<ApiErrorBody>(raw) {
            Ok(ApiErrorBody {
                message: Some(message),
                documentation_url,
                errors,
            }) if !message.trim().is_empty() => {
                match &documentation_url {
                    Some(url) => self.lines.push(format!("{} | {}", message.trim(), url.trim())),
                    None => self.lines.push(message.trim().to_string()),
                }
                if let Some(details) = errors.filter(|d| !d.is_null()) {
                    self.lines.push(format!("Details: {}", details));
                }
                (self, documentation_url)
            }
            _ => {
                self.lines.push(raw.to_string());
                (self, None)
            }
        }
    }

    /// Appends the fixed explanation for 404 responses.
    pub fn not_found_note(mut self) -> Self {
        self.lines.push(NOT_FOUND_EXPLANATION.to_string());
        self
    }

    pub fn request_id(mut self, request_id: Option<&str>) -> Self {
        if let Some(id) = request_id {
            self.lines.push(format!("Request ID: {}", id));
        }
        self
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Composes the error for a non-success HTTP response.
pub(crate) fn from_http_failure(
    status: u16,
    reason: &str,
    raw_body: &str,
    request_id: Option<&str>,
) -> GitHubError {
    let headline = format!(
        "Response status code does not indicate success: {} ({}).",
        status, reason
    );
    let narrative = ErrorNarrative::new(headline).status(status, reason);
    let (mut narrative, documentation_url) = narrative.body(raw_body);
    if status == 404 {
        narrative = narrative.not_found_note();
    }
    let message = narrative.request_id(request_id).finish();

    let mut error = GitHubError::new(GitHubError::kind_from_status(status), message).with_status(status);
    if let Some(url) = documentation_url {
        error = error.with_documentation_url(url);
    }
    if let Some(id) = request_id {
        error = error.with_request_id(id);
    }
    error
}
