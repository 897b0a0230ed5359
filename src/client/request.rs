//! Request descriptor handed to the invocation core.

use crate::errors::{GitHubError, GitHubResult};
use crate::observability::TelemetryProperties;
use bytes::Bytes;
use reqwest::Method;
use secrecy::SecretString;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default `Accept` header.
pub const DEFAULT_ACCEPT: &str = "application/vnd.github.v3+json";

/// Default `Content-Type` for JSON bodies.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Content type used for uploads whose extension is not in the table.
pub const DEFAULT_UPLOAD_CONTENT_TYPE: &str = "text/plain";

/// Default telemetry event name.
pub const DEFAULT_TELEMETRY_EVENT: &str = "Invoke-GHRestMethod";

/// Upload content types by lower-case file extension.
const CONTENT_TYPES: &[(&str, &str)] = &[
    (".7z", "application/x-7z-compressed"),
    (".avi", "video/x-msvideo"),
    (".bz2", "application/x-bzip2"),
    (".csv", "text/csv"),
    (".doc", "application/msword"),
    (".docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    (".gif", "image/gif"),
    (".gz", "application/gzip"),
    (".jpeg", "image/jpeg"),
    (".jpg", "image/jpeg"),
    (".json", "application/json"),
    (".mp3", "audio/mpeg"),
    (".mp4", "video/mp4"),
    (".pdf", "application/pdf"),
    (".png", "image/png"),
    (".ppt", "application/vnd.ms-powerpoint"),
    (".pptx", "application/vnd.openxmlformats-officedocument.presentationml.presentation"),
    (".rar", "application/vnd.rar"),
    (".tar", "application/x-tar"),
    (".txt", "text/plain"),
    (".xls", "application/vnd.ms-excel"),
    (".xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    (".xml", "application/xml"),
    (".zip", "application/zip"),
];

/// File extension of `path` with its leading dot, lower-cased.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Looks up the content type for an extension such as `.zip`.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, content_type)| *content_type)
}

/// One REST call.
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// Path relative to the API base (`repos/o/r/branches`) or an absolute URL.
    pub uri_fragment: String,
    /// HTTP method.
    pub method: Method,
    /// UTF-8 request body.
    pub body: Option<Bytes>,
    /// File whose bytes are uploaded as the body (POST only).
    pub in_file: Option<PathBuf>,
    /// `Accept` header.
    pub accept: String,
    /// Extra headers.
    pub additional_headers: BTreeMap<String, String>,
    /// `Content-Type` for `body`.
    pub content_type: String,
    /// Token used instead of the client's token provider.
    pub access_token: Option<SecretString>,
    /// Human-readable description, used for logging and progress.
    pub description: String,
    /// Telemetry event name.
    pub telemetry_event_name: String,
    /// Telemetry properties.
    pub telemetry_properties: TelemetryProperties,
    /// Whether a successful state-changing method waits out the configured
    /// state-change delay. Read-only POSTs such as GraphQL queries opt out.
    pub waits_for_state_change: bool,
}

impl RestRequest {
    /// Creates a request.
    pub fn new(method: Method, uri_fragment: impl Into<String>) -> Self {
        Self {
            uri_fragment: uri_fragment.into(),
            method,
            body: None,
            in_file: None,
            accept: DEFAULT_ACCEPT.to_string(),
            additional_headers: BTreeMap::new(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            access_token: None,
            description: String::new(),
            telemetry_event_name: DEFAULT_TELEMETRY_EVENT.to_string(),
            telemetry_properties: TelemetryProperties::new(),
            waits_for_state_change: true,
        }
    }

    /// Creates a GET request.
    pub fn get(uri_fragment: impl Into<String>) -> Self {
        Self::new(Method::GET, uri_fragment)
    }

    /// Creates a POST request.
    pub fn post(uri_fragment: impl Into<String>) -> Self {
        Self::new(Method::POST, uri_fragment)
    }

    /// Creates a PATCH request.
    pub fn patch(uri_fragment: impl Into<String>) -> Self {
        Self::new(Method::PATCH, uri_fragment)
    }

    /// Creates a PUT request.
    pub fn put(uri_fragment: impl Into<String>) -> Self {
        Self::new(Method::PUT, uri_fragment)
    }

    /// Creates a DELETE request.
    pub fn delete(uri_fragment: impl Into<String>) -> Self {
        Self::new(Method::DELETE, uri_fragment)
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `body` as JSON.
    pub fn json<B: Serialize>(mut self, body: &B) -> GitHubResult<Self> {
        let bytes = serde_json::to_vec(body).map_err(|e| {
            GitHubError::invalid_parameter(format!("Failed to serialize request body: {}", e))
        })?;
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    /// Uploads the file at `path`.
    pub fn in_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.in_file = Some(path.into());
        self
    }

    /// Sets the `Accept` header.
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = accept.into();
        self
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Uses `token` for this call only.
    pub fn access_token(mut self, token: Option<SecretString>) -> Self {
        self.access_token = token;
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the telemetry event name.
    pub fn telemetry_event(mut self, name: impl Into<String>) -> Self {
        self.telemetry_event_name = name.into();
        self
    }

    /// Adds a telemetry property.
    pub fn telemetry_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.telemetry_properties.insert(key.into(), value.into());
        self
    }

    /// Skips the state-change delay for a request that only reads.
    pub fn skip_state_change_delay(mut self) -> Self {
        self.waits_for_state_change = false;
        self
    }

    /// Checks the body/method combination before anything is sent.
    pub fn validate(&self) -> GitHubResult<()> {
        if self.uri_fragment.trim().is_empty() {
            return Err(GitHubError::validation("The request has no URI fragment."));
        }

        let carries_body = self.body.is_some() || self.in_file.is_some();
        if carries_body && self.method == Method::GET {
            return Err(GitHubError::validation(
                "A request body can only be sent with POST, PATCH, PUT or DELETE.",
            ));
        }

        if self.body.is_some() && self.in_file.is_some() {
            return Err(GitHubError::validation(
                "A request cannot have both a body and an upload file.",
            ));
        }

        if self.in_file.is_some() && self.method != Method::POST {
            return Err(GitHubError::validation("Files can only be uploaded with POST."));
        }

        Ok(())
    }
}
