//! # GitHub Command Library
//!
//! Typed commands over the GitHub REST and GraphQL APIs:
//! - A single invocation core with 202 retry, telemetry and composed error messages
//! - Link-header pagination with progress reporting
//! - Response materialization with date upgrading and pipeline decorations
//! - Repository URI parsing and default owner/repository resolution
//! - Branches and branch protection (REST settings and GraphQL pattern rules)
//! - Gists, gist comments, issue comments, milestones and classic projects
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_github_commands::{AuthMethod, GitHubClient, GitHubConfig, RepositoryParams};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GitHubConfig::builder()
//!         .auth(AuthMethod::pat("ghp_xxxxxxxxxxxx"))
//!         .build()?;
//!
//!     let client = GitHubClient::new(config)?;
//!
//!     let repo = RepositoryParams::from_uri("https://github.com/octocat/Hello-World");
//!     for branch in client.branches().list(repo, &Default::default()).await? {
//!         println!("{:?}", branch.get("name").and_then(|n| n.as_str()));
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// HTTP client and transport
pub mod client;

// Response handling
pub mod materialize;
pub mod pagination;

// Repository addressing
pub mod uri;

// API Services
pub mod services;

// 202 handling
pub mod resilience;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use auth::{
    AnonymousTokenProvider, AuthMethod, EnvTokenProvider, SessionTokenProvider, StaticTokenProvider, TokenProvider,
};
pub use client::{GitHubClient, GitHubClientBuilder, RestRequest};
pub use config::{GitHubConfig, GitHubConfigBuilder, RetryConfig};
pub use errors::{GitHubError, GitHubErrorKind, GitHubResult};
pub use materialize::{materialize, ApiValue};
pub use observability::{ProgressReporter, ProgressUpdate, TelemetrySink};
pub use pagination::{ExtendedResult, PaginationCursor, PaginationLinks};
pub use services::*;
pub use types::*;
pub use uri::{join_uri, resolve_owner, resolve_repository, split_uri, RepositoryParams, RepositoryRef};
