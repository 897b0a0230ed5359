//! Owner/repository identity: splitting GitHub URLs, joining them back, and
//! resolving which repository a call targets.

use crate::config::GitHubConfig;
use crate::errors::{GitHubError, GitHubResult};

/// An owner/repository pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryRef {
    /// Owner (user or organization) login.
    pub owner_name: String,
    /// Repository name.
    pub repository_name: String,
}

impl RepositoryRef {
    /// Creates a reference from explicit names.
    pub fn new(owner_name: impl Into<String>, repository_name: impl Into<String>) -> Self {
        Self {
            owner_name: owner_name.into(),
            repository_name: repository_name.into(),
        }
    }

    /// `repos/<owner>/<repo>` prefix for REST fragments.
    pub fn api_path(&self) -> String {
        format!("repos/{}/{}", self.owner_name, self.repository_name)
    }
}

/// Splits a GitHub web or API URL into owner and repository.
///
/// Recognized forms for the configured host `H`:
/// `https://[www.]H/<owner>/<repo>`, `https://api.H/repos/<owner>/<repo>`
/// and `https://H/api/v3/repos/<owner>/<repo>`. Absent segments come back
/// as empty strings; a URL for another host yields an empty reference.
pub fn split_uri(uri: &str, host_name: &str) -> RepositoryRef {
    let Ok(url) = url::Url::parse(uri.trim()) else {
        return RepositoryRef::default();
    };
    if !matches!(url.scheme(), "http" | "https") {
        return RepositoryRef::default();
    }
    let Some(host) = url.host_str() else {
        return RepositoryRef::default();
    };

    let host = host.to_ascii_lowercase();
    let expected = host_name.to_ascii_lowercase();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let owner_and_repo = if host == format!("api.{}", expected) {
        strip_prefix(&segments, &["repos"])
    } else if host == expected || host == format!("www.{}", expected) {
        strip_prefix(&segments, &["api", "v3", "repos"]).or(Some(&segments[..]))
    } else {
        None
    };

    match owner_and_repo {
        Some(rest) => RepositoryRef {
            owner_name: rest.first().map(|s| s.to_string()).unwrap_or_default(),
            repository_name: rest
                .get(1)
                .map(|s| s.strip_suffix(".git").unwrap_or(s).to_string())
                .unwrap_or_default(),
        },
        None => RepositoryRef::default(),
    }
}

fn strip_prefix<'a, 'b>(segments: &'a [&'b str], prefix: &[&str]) -> Option<&'a [&'b str]> {
    if segments.len() >= prefix.len()
        && segments
            .iter()
            .zip(prefix)
            .all(|(seg, p)| seg.eq_ignore_ascii_case(p))
    {
        Some(&segments[prefix.len()..])
    } else {
        None
    }
}

/// Builds the canonical web URL of a repository.
pub fn join_uri(owner_name: &str, repository_name: &str, host_name: &str) -> String {
    format!("https://{}/{}/{}", host_name, owner_name, repository_name)
}

/// Everything a caller may say about which repository to target.
#[derive(Debug, Clone, Default)]
pub struct RepositoryParams {
    /// Repository URL, mutually exclusive with the explicit names.
    pub uri: Option<String>,
    /// Explicit owner.
    pub owner_name: Option<String>,
    /// Explicit repository.
    pub repository_name: Option<String>,
    /// Allow empty names instead of failing.
    pub disable_validation: bool,
}

impl RepositoryParams {
    /// Targets a repository by URL.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    /// Targets a repository by explicit names.
    pub fn from_names(owner_name: impl Into<String>, repository_name: impl Into<String>) -> Self {
        Self {
            owner_name: Some(owner_name.into()),
            repository_name: Some(repository_name.into()),
            ..Self::default()
        }
    }

    /// Skips the non-empty checks.
    pub fn without_validation(mut self) -> Self {
        self.disable_validation = true;
        self
    }
}

impl From<RepositoryRef> for RepositoryParams {
    fn from(r: RepositoryRef) -> Self {
        Self::from_names(r.owner_name, r.repository_name)
    }
}

impl From<&str> for RepositoryParams {
    fn from(uri: &str) -> Self {
        Self::from_uri(uri)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Works out the owner/repository a call targets.
///
/// A URL and explicit names are mutually exclusive. With a URL, both parts
/// must be present in it. Otherwise each part comes from its explicit value
/// or the configured default. Empty parts are an error unless validation is
/// disabled.
pub fn resolve_repository(params: &RepositoryParams, config: &GitHubConfig) -> GitHubResult<RepositoryRef> {
    let explicit_owner = non_empty(&params.owner_name);
    let explicit_repo = non_empty(&params.repository_name);

    if let Some(uri) = non_empty(&params.uri) {
        if explicit_owner.is_some() || explicit_repo.is_some() {
            return Err(GitHubError::validation(
                "Cannot specify a Uri AND individual OwnerName/RepositoryName. Please choose one or the other.",
            ));
        }

        let elements = split_uri(uri, &config.api_host_name);
        if !params.disable_validation {
            if elements.owner_name.is_empty() {
                return Err(GitHubError::validation(
                    "Provided Uri does not contain enough information: Owner Name.",
                ));
            }
            if elements.repository_name.is_empty() {
                return Err(GitHubError::validation(
                    "Provided Uri does not contain enough information: Repository Name.",
                ));
            }
        }
        return Ok(elements);
    }

    let owner_name = explicit_owner
        .or(non_empty(&config.default_owner_name))
        .unwrap_or_default()
        .to_string();
    let repository_name = explicit_repo
        .or(non_empty(&config.default_repository_name))
        .unwrap_or_default()
        .to_string();

    if !params.disable_validation {
        if owner_name.is_empty() {
            return Err(GitHubError::validation(
                "Unable to determine the Owner Name. Provide the value as a parameter or set default_owner_name in the configuration.",
            ));
        }
        if repository_name.is_empty() {
            return Err(GitHubError::validation(
                "Unable to determine the Repository Name. Provide the value as a parameter or set default_repository_name in the configuration.",
            ));
        }
    }

    Ok(RepositoryRef {
        owner_name,
        repository_name,
    })
}

/// Resolves just an owner (user or organization), from an explicit value
/// or the configured default.
pub fn resolve_owner(owner_name: Option<&str>, config: &GitHubConfig) -> GitHubResult<String> {
    owner_name
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .or(non_empty(&config.default_owner_name))
        .map(String::from)
        .ok_or_else(|| {
            GitHubError::validation(
                "Unable to determine the Owner Name. Provide the value as a parameter or set default_owner_name in the configuration.",
            )
        })
}
