//! Test doubles: recording telemetry/progress sinks and JSON fixtures.

use crate::errors::{GitHubError, GitHubErrorKind};
use crate::observability::{ProgressReporter, ProgressUpdate, TelemetryMetrics, TelemetryProperties, TelemetrySink};
use std::sync::{Arc, RwLock};

/// A telemetry event captured by [`RecordingTelemetry`].
#[derive(Debug, Clone)]
pub struct RecordedEvent {
    /// Event name.
    pub name: String,
    /// Properties.
    pub properties: TelemetryProperties,
    /// Metrics.
    pub metrics: TelemetryMetrics,
}

/// A failure captured by [`RecordingTelemetry`].
#[derive(Debug, Clone)]
pub struct RecordedException {
    /// Error kind.
    pub kind: GitHubErrorKind,
    /// Composed message.
    pub message: String,
    /// Properties.
    pub properties: TelemetryProperties,
}

/// Telemetry sink keeping everything in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    events: Arc<RwLock<Vec<RecordedEvent>>>,
    exceptions: Arc<RwLock<Vec<RecordedException>>>,
}

impl RecordingTelemetry {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// Exceptions recorded so far.
    pub fn exceptions(&self) -> Vec<RecordedException> {
        self.exceptions.read().map(|e| e.clone()).unwrap_or_default()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn event(&self, name: &str, properties: &TelemetryProperties, metrics: &TelemetryMetrics) {
        if let Ok(mut events) = self.events.write() {
            events.push(RecordedEvent {
                name: name.to_string(),
                properties: properties.clone(),
                metrics: metrics.clone(),
            });
        }
    }

    fn exception(&self, error: &GitHubError, properties: &TelemetryProperties) {
        if let Ok(mut exceptions) = self.exceptions.write() {
            exceptions.push(RecordedException {
                kind: error.kind().clone(),
                message: error.message().to_string(),
                properties: properties.clone(),
            });
        }
    }
}

/// Progress call captured by [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressCall {
    /// An update.
    Update {
        /// Activity.
        activity: String,
        /// Status line.
        status: String,
        /// Percent complete.
        percent_complete: u8,
    },
    /// Completion.
    Complete {
        /// Activity.
        activity: String,
    },
}

/// Progress reporter keeping every call in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingProgress {
    calls: Arc<RwLock<Vec<ProgressCall>>>,
}

impl RecordingProgress {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls recorded so far.
    pub fn calls(&self) -> Vec<ProgressCall> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of update calls.
    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProgressCall::Update { .. }))
            .count()
    }

    /// Number of completion calls.
    pub fn complete_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ProgressCall::Complete { .. }))
            .count()
    }

    fn push(&self, call: ProgressCall) {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(call);
        }
    }
}

impl ProgressReporter for RecordingProgress {
    fn update(&self, activity: &str, update: &ProgressUpdate) {
        self.push(ProgressCall::Update {
            activity: activity.to_string(),
            status: update.status.clone(),
            percent_complete: update.percent_complete,
        });
    }

    fn complete(&self, activity: &str) {
        self.push(ProgressCall::Complete {
            activity: activity.to_string(),
        });
    }
}

/// JSON fixtures shaped like GitHub responses.
pub mod fixtures {
    use serde_json::{json, Value};

    /// A user.
    pub fn user(login: &str) -> Value {
        json!({
            "login": login,
            "id": 1,
            "html_url": format!("https://github.com/{}", login),
            "type": "User"
        })
    }

    /// A branch.
    pub fn branch(name: &str, sha: &str) -> Value {
        json!({
            "name": name,
            "commit": { "sha": sha, "url": format!("https://api.github.com/repos/octocat/Hello-World/commits/{}", sha) },
            "protected": false
        })
    }

    /// A git reference for a branch.
    pub fn git_ref(branch: &str, sha: &str) -> Value {
        json!({
            "ref": format!("refs/heads/{}", branch),
            "url": format!("https://api.github.com/repos/octocat/Hello-World/git/refs/heads/{}", branch),
            "object": { "sha": sha, "type": "commit" }
        })
    }

    /// A gist with one file.
    pub fn gist(id: &str, file_name: &str, content: &str) -> Value {
        json!({
            "id": id,
            "html_url": format!("https://gist.github.com/{}", id),
            "public": true,
            "description": "Fixture gist",
            "owner": user("octocat"),
            "files": {
                file_name: {
                    "filename": file_name,
                    "type": "text/plain",
                    "size": content.len(),
                    "truncated": false,
                    "content": content
                }
            },
            "comments": 0,
            "created_at": "2010-04-14T02:15:15Z",
            "updated_at": "2011-06-20T11:34:15Z"
        })
    }

    /// A comment.
    pub fn comment(id: u64, body: &str) -> Value {
        json!({
            "id": id,
            "body": body,
            "user": user("octocat"),
            "created_at": "2011-04-14T16:00:49Z",
            "updated_at": "2011-04-14T16:00:49Z"
        })
    }

    /// A milestone.
    pub fn milestone(id: u64, number: u64, title: &str) -> Value {
        json!({
            "id": id,
            "number": number,
            "title": title,
            "state": "open",
            "open_issues": 4,
            "closed_issues": 8,
            "due_on": "2012-10-09T23:39:01Z",
            "closed_at": null
        })
    }

    /// A classic project.
    pub fn project(id: u64, name: &str) -> Value {
        json!({
            "id": id,
            "number": 1,
            "name": name,
            "body": "Developer documentation project",
            "state": "open",
            "html_url": format!("https://github.com/orgs/octocat/projects/{}", id)
        })
    }

    /// A standard GitHub error body.
    pub fn error_body(message: &str) -> Value {
        json!({
            "message": message,
            "documentation_url": "https://docs.github.com/rest"
        })
    }

    /// A `Link` header pointing at `next` and `last` page numbers.
    pub fn link_header(base: &str, next: u64, last: u64) -> String {
        format!(
            "<{base}?page={next}>; rel=\"next\", <{base}?page={last}>; rel=\"last\"",
            base = base,
            next = next,
            last = last
        )
    }
}
