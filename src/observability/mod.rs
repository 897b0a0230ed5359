//! Observability: request logging hooks, telemetry and progress reporting.

use crate::errors::GitHubError;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Telemetry property bag.
pub type TelemetryProperties = BTreeMap<String, String>;

/// Telemetry metric bag.
pub type TelemetryMetrics = BTreeMap<String, f64>;

/// Receives named telemetry events and exception records.
pub trait TelemetrySink: Send + Sync {
    /// Records a named event.
    fn event(&self, name: &str, properties: &TelemetryProperties, metrics: &TelemetryMetrics);

    /// Records a failure.
    fn exception(&self, error: &GitHubError, properties: &TelemetryProperties);
}

/// Telemetry sink that writes events to `tracing` at debug level.
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn event(&self, name: &str, properties: &TelemetryProperties, metrics: &TelemetryMetrics) {
        debug!(
            event = %name,
            properties = ?properties,
            metrics = ?metrics,
            "Telemetry event"
        );
    }

    fn exception(&self, error: &GitHubError, properties: &TelemetryProperties) {
        debug!(
            kind = %error.kind(),
            status = ?error.status_code(),
            properties = ?properties,
            "Telemetry exception"
        );
    }
}

/// Hashes a value that could identify a user or repository before it is
/// attached to telemetry.
pub fn pii_safe(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
}

/// One progress step of a multi-page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Human-readable status line.
    pub status: String,
    /// Percent complete, 0..=100.
    pub percent_complete: u8,
}

/// Receives progress for long multi-page operations.
pub trait ProgressReporter: Send + Sync {
    /// Reports a step of `activity`.
    fn update(&self, activity: &str, update: &ProgressUpdate);

    /// Marks `activity` finished.
    fn complete(&self, activity: &str);
}

/// Progress reporter writing to `tracing`.
#[derive(Debug, Default)]
pub struct LoggingProgress;

impl ProgressReporter for LoggingProgress {
    fn update(&self, activity: &str, update: &ProgressUpdate) {
        info!(
            activity = %activity,
            percent = update.percent_complete,
            "{}",
            update.status
        );
    }

    fn complete(&self, activity: &str) {
        debug!(activity = %activity, "Progress complete");
    }
}

/// Marks progress complete exactly once, on whichever path the fetch exits.
pub struct ProgressGuard<'a> {
    reporter: &'a dyn ProgressReporter,
    activity: String,
    enabled: bool,
    completed: bool,
}

impl<'a> ProgressGuard<'a> {
    /// Starts tracking `activity`. A disabled guard reports nothing.
    pub fn new(reporter: &'a dyn ProgressReporter, activity: &str, enabled: bool) -> Self {
        Self {
            reporter,
            activity: activity.to_string(),
            enabled,
            completed: false,
        }
    }

    /// Reports a step.
    pub fn update(&mut self, update: ProgressUpdate) {
        if self.enabled && !self.completed {
            self.reporter.update(&self.activity, &update);
        }
    }

    /// Marks the activity complete.
    pub fn complete(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.enabled && !self.completed {
            self.completed = true;
            self.reporter.complete(&self.activity);
        }
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Tracing hooks for GitHub API operations.
pub struct TracingHooks;

impl TracingHooks {
    /// Logs the start of an API request.
    pub fn on_request_start(method: &str, url: &str, description: &str) {
        debug!(
            method = %method,
            url = %url,
            description = %description,
            "GitHub API request started"
        );
    }

    /// Logs outgoing headers with credentials redacted.
    pub fn on_request_headers(url: &str, headers: &[(String, String)]) {
        trace!(
            url = %url,
            headers = %redacted_headers(headers),
            "GitHub API request headers"
        );
    }

    /// Logs the completion of an API request.
    pub fn on_request_complete(method: &str, url: &str, status: u16, duration: Duration) {
        info!(
            method = %method,
            url = %url,
            status = status,
            duration_ms = duration.as_millis() as u64,
            "GitHub API request completed"
        );
    }

    /// Logs a request error.
    pub fn on_request_error(method: &str, url: &str, error: &GitHubError) {
        error!(
            method = %method,
            url = %url,
            kind = %error.kind(),
            status = ?error.status_code(),
            error = %error,
            "GitHub API request failed"
        );
    }

    /// Logs a 202 retry.
    pub fn on_result_not_ready(url: &str, attempt: u32, max_attempts: u32, delay: Duration) {
        warn!(
            url = %url,
            attempt = attempt,
            max_attempts = max_attempts,
            delay_ms = delay.as_millis() as u64,
            "The server has indicated that the result is not yet ready (received status code 202). Will retry."
        );
    }

    /// Logs a 202 that will not be retried.
    pub fn on_result_not_ready_unretried(method: &str, url: &str, reason: &str) {
        warn!(
            method = %method,
            url = %url,
            "The server has indicated that the result is not yet ready (received status code 202). {}",
            reason
        );
    }
}

/// Sensitive headers that should be redacted in logs.
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-github-token",
    "x-access-token",
    "cookie",
    "set-cookie",
];

/// Redacts sensitive values in headers.
pub fn redact_header(name: &str, value: &str) -> String {
    if SENSITIVE_HEADERS.contains(&name.to_lowercase().as_str()) {
        "[REDACTED]".to_string()
    } else {
        value.to_string()
    }
}

/// Renders headers as `name: value` pairs, redacting sensitive values.
pub fn redacted_headers(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}: {}", name, redact_header(name, value)))
        .collect::<Vec<_>>()
        .join(", ")
}
