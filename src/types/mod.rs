//! Typed projections of GitHub resources and shared query enums.
//!
//! Services return [`ApiValue`](crate::materialize::ApiValue) trees; these
//! types are what callers deserialize them into when they want fields by
//! name (`value.deserialize_into::<Gist>()`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GitHub user (minimal representation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: u64,
    /// Username (login).
    pub login: String,
    /// Profile URL.
    #[serde(default)]
    pub html_url: Option<String>,
    /// User type (User, Organization, Bot).
    #[serde(rename = "type", default)]
    pub user_type: Option<String>,
}

/// GitHub branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Commit reference.
    pub commit: BranchCommit,
    /// Whether branch is protected.
    #[serde(default)]
    pub protected: bool,
}

/// Branch commit reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCommit {
    /// Commit SHA.
    pub sha: String,
    /// Commit URL.
    pub url: String,
}

/// A git reference (`refs/heads/main`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRef {
    /// Fully qualified ref name.
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// API URL.
    pub url: String,
    /// Object the ref points at.
    pub object: GitObject,
}

/// Object a git reference points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitObject {
    /// Object SHA.
    pub sha: String,
    /// Object type (commit, tag).
    #[serde(rename = "type")]
    pub object_type: String,
}

/// Gist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gist {
    /// Gist ID.
    pub id: String,
    /// HTML URL.
    pub html_url: String,
    /// Whether public.
    pub public: bool,
    /// Gist description.
    #[serde(default)]
    pub description: Option<String>,
    /// Gist owner.
    #[serde(default)]
    pub owner: Option<User>,
    /// Gist files by name.
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
    /// Comment count.
    #[serde(default)]
    pub comments: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Gist file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GistFile {
    /// Filename.
    pub filename: String,
    /// MIME type.
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
    /// Language.
    #[serde(default)]
    pub language: Option<String>,
    /// Raw download URL.
    #[serde(default)]
    pub raw_url: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Whether `content` was cut short.
    #[serde(default)]
    pub truncated: bool,
    /// Content, present when fetching a single gist.
    #[serde(default)]
    pub content: Option<String>,
}

/// A gist revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GistCommit {
    /// Version (SHA).
    pub version: String,
    /// Author.
    #[serde(default)]
    pub user: Option<User>,
    /// Change counts.
    pub change_status: ChangeStatus,
    /// Commit time.
    pub committed_at: DateTime<Utc>,
}

/// Change counts of a revision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeStatus {
    /// Deletions.
    #[serde(default)]
    pub deletions: u32,
    /// Additions.
    #[serde(default)]
    pub additions: u32,
    /// Total.
    #[serde(default)]
    pub total: u32,
}

/// Comment on an issue or a gist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// Comment ID.
    pub id: u64,
    /// Body in the requested media type.
    #[serde(default)]
    pub body: Option<String>,
    /// Rendered text body (`text`/`full` media types).
    #[serde(default)]
    pub body_text: Option<String>,
    /// Rendered HTML body (`html`/`full` media types).
    #[serde(default)]
    pub body_html: Option<String>,
    /// Author.
    #[serde(default)]
    pub user: Option<User>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// GitHub milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    /// Milestone ID.
    pub id: u64,
    /// Milestone number.
    pub number: u64,
    /// Milestone title.
    pub title: String,
    /// Milestone description.
    #[serde(default)]
    pub description: Option<String>,
    /// Milestone state.
    pub state: MilestoneState,
    /// Open issue count.
    #[serde(default)]
    pub open_issues: u32,
    /// Closed issue count.
    #[serde(default)]
    pub closed_issues: u32,
    /// Due date.
    #[serde(default)]
    pub due_on: Option<DateTime<Utc>>,
    /// Close time.
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Milestone state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneState {
    /// Open milestone.
    Open,
    /// Closed milestone.
    Closed,
}

/// Classic project board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Project ID.
    pub id: u64,
    /// Project number within its owner.
    pub number: u64,
    /// Name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub body: Option<String>,
    /// State.
    pub state: ProjectState,
    /// HTML URL.
    pub html_url: String,
}

/// Project state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectState {
    /// Open project.
    Open,
    /// Closed project.
    Closed,
}

/// State filter for list calls.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    /// Only open items.
    #[default]
    Open,
    /// Only closed items.
    Closed,
    /// Everything.
    All,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// Milestone sort field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneSort {
    /// By due date.
    DueOn,
    /// By fraction of closed issues.
    Completeness,
}

/// Comment sort field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    /// By creation time.
    Created,
    /// By last update.
    Updated,
}

/// Base permission organization members get on an organization project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrganizationPermission {
    /// Read access.
    Read,
    /// Write access.
    Write,
    /// Admin access.
    Admin,
    /// No access.
    None,
}
