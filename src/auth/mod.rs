//! Access token resolution for GitHub API calls.

use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Authentication method for GitHub API.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Personal Access Token (classic or fine-grained).
    Pat(SecretString),
    /// OAuth token.
    OAuth(SecretString),
    /// GitHub Actions token (from GITHUB_TOKEN).
    Actions(SecretString),
}

impl AuthMethod {
    /// Creates a PAT authentication method.
    pub fn pat(token: impl Into<String>) -> Self {
        Self::Pat(SecretString::new(token.into()))
    }

    /// Creates an OAuth authentication method.
    pub fn oauth(token: impl Into<String>) -> Self {
        Self::OAuth(SecretString::new(token.into()))
    }

    /// Creates a GitHub Actions token authentication method.
    pub fn actions(token: impl Into<String>) -> Self {
        Self::Actions(SecretString::new(token.into()))
    }

    /// The bearer token.
    pub fn token(&self) -> &SecretString {
        match self {
            Self::Pat(t) | Self::OAuth(t) | Self::Actions(t) => t,
        }
    }
}

/// Formats the `Authorization` header value for a token.
pub fn authorization_header(token: &SecretString) -> String {
    format!("Bearer {}", token.expose_secret())
}

/// Resolves the token used when a call doesn't pass one explicitly.
///
/// `Ok(None)` means the request goes out anonymously.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the ambient access token, if any.
    async fn access_token(&self) -> GitHubResult<Option<SecretString>>;
}

/// Provider with no token; every call is anonymous unless given one.
#[derive(Debug, Default)]
pub struct AnonymousTokenProvider;

#[async_trait]
impl TokenProvider for AnonymousTokenProvider {
    async fn access_token(&self) -> GitHubResult<Option<SecretString>> {
        Ok(None)
    }
}

/// Static provider using fixed credentials.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    method: AuthMethod,
}

impl StaticTokenProvider {
    /// Creates a new static provider.
    pub fn new(method: AuthMethod) -> Self {
        Self { method }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> GitHubResult<Option<SecretString>> {
        Ok(Some(self.method.token().clone()))
    }
}

/// Environment variable provider. An unset variable means anonymous.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    token_var: String,
}

impl EnvTokenProvider {
    /// Creates a provider from GITHUB_TOKEN environment variable.
    pub fn from_github_token() -> Self {
        Self::from_env_var("GITHUB_TOKEN")
    }

    /// Creates a provider from a custom environment variable.
    pub fn from_env_var(var_name: impl Into<String>) -> Self {
        Self {
            token_var: var_name.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn access_token(&self) -> GitHubResult<Option<SecretString>> {
        match std::env::var(&self.token_var) {
            Ok(token) if !token.trim().is_empty() => Ok(Some(SecretString::new(token))),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(GitHubError::new(
                GitHubErrorKind::MissingAuth,
                format!("Environment variable {} is not valid unicode", self.token_var),
            )),
        }
    }
}

/// Session-scoped token that can be set and cleared at runtime,
/// falling back to another provider while unset.
#[derive(Clone)]
pub struct SessionTokenProvider {
    session: Arc<RwLock<Option<SecretString>>>,
    fallback: Arc<dyn TokenProvider>,
}

impl SessionTokenProvider {
    /// Creates a session provider that falls back to `GITHUB_TOKEN`.
    pub fn new() -> Self {
        Self::with_fallback(Arc::new(EnvTokenProvider::from_github_token()))
    }

    /// Creates a session provider with an explicit fallback.
    pub fn with_fallback(fallback: Arc<dyn TokenProvider>) -> Self {
        Self {
            session: Arc::new(RwLock::new(None)),
            fallback,
        }
    }

    /// Caches a token for the rest of the session.
    pub async fn set_authentication(&self, token: impl Into<String>) {
        let mut session = self.session.write().await;
        *session = Some(SecretString::new(token.into()));
        tracing::info!("Session access token set");
    }

    /// Forgets the session token.
    pub async fn clear_authentication(&self) {
        let mut session = self.session.write().await;
        *session = None;
        tracing::info!("Session access token cleared");
    }

    /// Returns true if a session token is cached.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }
}

impl Default for SessionTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for SessionTokenProvider {
    async fn access_token(&self) -> GitHubResult<Option<SecretString>> {
        if let Some(token) = self.session.read().await.as_ref() {
            return Ok(Some(token.clone()));
        }
        self.fallback.access_token().await
    }
}

/// Explicit per-call token wins over the provider.
pub async fn resolve_access_token(
    explicit: Option<&SecretString>,
    provider: &dyn TokenProvider,
) -> GitHubResult<Option<SecretString>> {
    match explicit {
        Some(token) if !token.expose_secret().trim().is_empty() => Ok(Some(token.clone())),
        _ => provider.access_token().await,
    }
}
