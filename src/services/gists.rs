//! Gist operations.

use super::{copy_field, decorate, decorate_all, with_query};
use crate::client::{GitHubClient, RestRequest};
use crate::errors::{GitHubError, GitHubResult};
use crate::materialize::ApiValue;
use crate::types::Gist;
use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::SecretString;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Service for gist operations.
pub struct GistsService<'a> {
    client: &'a GitHubClient,
    access_token: Option<SecretString>,
}

impl<'a> GistsService<'a> {
    /// Creates a new gists service.
    pub fn new(client: &'a GitHubClient) -> Self {
        Self {
            client,
            access_token: None,
        }
    }

    /// Uses `token` instead of the client's token provider.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::new(token.into()));
        self
    }

    /// Gets a gist, or one revision of it.
    pub async fn get(&self, gist_id: &str, sha: Option<&str>) -> GitHubResult<ApiValue> {
        let fragment = match sha {
            Some(sha) => format!("gists/{}/{}", gist_id, sha),
            None => format!("gists/{}", gist_id),
        };
        let gist = self
            .client
            .invoke(&self.request(RestRequest::get(fragment), format!("Getting gist {}", gist_id), "Gists.Get"))
            .await?;
        Ok(decorate(self.client, gist, gist_decorator(None)))
    }

    /// Lists the authenticated user's gists.
    pub async fn list(&self, params: &ListGistsParams) -> GitHubResult<Vec<ApiValue>> {
        self.list_at("gists".to_string(), params, "Getting gists for current user").await
    }

    /// Lists a user's public gists.
    pub async fn list_for_user(&self, username: &str, params: &ListGistsParams) -> GitHubResult<Vec<ApiValue>> {
        self.list_at(
            format!("users/{}/gists", username),
            params,
            &format!("Getting public gists for {}", username),
        )
        .await
    }

    /// Lists the authenticated user's starred gists.
    pub async fn list_starred(&self, params: &ListGistsParams) -> GitHubResult<Vec<ApiValue>> {
        self.list_at("gists/starred".to_string(), params, "Getting starred gists for current user")
            .await
    }

    /// Lists all public gists.
    pub async fn list_public(&self, params: &ListGistsParams) -> GitHubResult<Vec<ApiValue>> {
        self.list_at("gists/public".to_string(), params, "Getting public gists").await
    }

    /// Lists the forks of a gist.
    pub async fn list_forks(&self, gist_id: &str) -> GitHubResult<Vec<ApiValue>> {
        let request = self.request(
            RestRequest::get(format!("gists/{}/forks", gist_id)),
            format!("Getting forks of gist {}", gist_id),
            "Gists.ListForks",
        );
        let items = self.client.invoke_multiple_result(request, false).await?;
        Ok(decorate_all(self.client, items, gist_decorator(None)))
    }

    /// Lists the revisions of a gist.
    pub async fn list_commits(&self, gist_id: &str) -> GitHubResult<Vec<ApiValue>> {
        let request = self.request(
            RestRequest::get(format!("gists/{}/commits", gist_id)),
            format!("Getting commits of gist {}", gist_id),
            "Gists.ListCommits",
        );
        let items = self.client.invoke_multiple_result(request, false).await?;
        Ok(decorate_all(self.client, items, gist_decorator(Some(gist_id))))
    }

    /// Downloads every file of a gist into `directory`.
    ///
    /// Existing files are only overwritten with `force`. Returns the paths
    /// written, in file-name order.
    pub async fn save(&self, gist_id: &str, directory: &Path, force: bool) -> GitHubResult<Vec<PathBuf>> {
        let gist: Gist = self.get(gist_id, None).await?.deserialize_into()?;

        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|e| GitHubError::io(format!("Unable to create {}", directory.display()), e))?;

        // Every conflict is reported before anything is written.
        if !force {
            for name in gist.files.keys() {
                let path = directory.join(name);
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(GitHubError::validation(format!(
                        "{} already exists. Use force to overwrite it.",
                        path.display()
                    )));
                }
            }
        }

        let mut written = Vec::with_capacity(gist.files.len());
        for (name, file) in &gist.files {
            let path = directory.join(name);
            match (&file.content, &file.raw_url) {
                (Some(content), _) if !file.truncated => {
                    tokio::fs::write(&path, content)
                        .await
                        .map_err(|e| GitHubError::io(format!("Unable to write {}", path.display()), e))?;
                }
                (_, Some(raw_url)) => {
                    let request = self.request(
                        RestRequest::get(raw_url.clone()),
                        format!("Downloading {} from gist {}", name, gist_id),
                        "Gists.DownloadFile",
                    );
                    self.client.invoke_to_file(&request, Some(&path)).await?;
                }
                _ => {
                    return Err(GitHubError::deserialization(format!(
                        "Gist file {} has neither content nor a raw URL",
                        name
                    )))
                }
            }

            tracing::debug!(gist_id = %gist_id, path = %path.display(), "Saved gist file");
            written.push(path);
        }

        Ok(written)
    }

    /// Creates a gist.
    pub async fn create(&self, gist: &CreateGistRequest) -> GitHubResult<ApiValue> {
        if gist.files.is_empty() {
            return Err(GitHubError::validation("A gist needs at least one file."));
        }

        let request = self
            .request(RestRequest::post("gists"), "Creating a new gist".to_string(), "Gists.Create")
            .json(gist)?
            .telemetry_property("FileCount", gist.files.len().to_string());
        let created = self.client.invoke(&request).await?;
        Ok(decorate(self.client, created, gist_decorator(None)))
    }

    /// Creates a gist from files on disk.
    pub async fn create_from_paths(
        &self,
        paths: &[PathBuf],
        description: Option<&str>,
        public: bool,
    ) -> GitHubResult<ApiValue> {
        let mut gist = CreateGistRequest::new(public);
        gist.description = description.map(String::from);
        for path in paths {
            let (name, content) = read_gist_file(path).await?;
            gist.files.insert(name, content);
        }
        self.create(&gist).await
    }

    /// Changes the description of a gist.
    pub async fn update_description(&self, gist_id: &str, description: &str) -> GitHubResult<ApiValue> {
        self.update(
            gist_id,
            &UpdateGistRequest {
                description: Some(description.to_string()),
                files: None,
            },
            format!("Updating description of gist {}", gist_id),
        )
        .await
    }

    /// Adds files to a gist, replacing any with the same name.
    pub async fn set_files(&self, gist_id: &str, files: BTreeMap<String, String>) -> GitHubResult<ApiValue> {
        let files = files
            .into_iter()
            .map(|(name, content)| (name, Some(GistFileUpdate::content(content))))
            .collect();
        self.update(
            gist_id,
            &UpdateGistRequest {
                description: None,
                files: Some(files),
            },
            format!("Setting files of gist {}", gist_id),
        )
        .await
    }

    /// Adds files from disk to a gist, replacing any with the same name.
    pub async fn add_files_from_paths(&self, gist_id: &str, paths: &[PathBuf]) -> GitHubResult<ApiValue> {
        let mut files = BTreeMap::new();
        for path in paths {
            let (name, content) = read_gist_file(path).await?;
            files.insert(name, content);
        }
        self.set_files(gist_id, files).await
    }

    /// Removes files from a gist.
    pub async fn remove_files(&self, gist_id: &str, file_names: &[&str]) -> GitHubResult<ApiValue> {
        let files = file_names.iter().map(|name| (name.to_string(), None)).collect();
        self.update(
            gist_id,
            &UpdateGistRequest {
                description: None,
                files: Some(files),
            },
            format!("Removing files from gist {}", gist_id),
        )
        .await
    }

    /// Renames a file in a gist.
    pub async fn rename_file(&self, gist_id: &str, file_name: &str, new_name: &str) -> GitHubResult<ApiValue> {
        let mut files = BTreeMap::new();
        files.insert(
            file_name.to_string(),
            Some(GistFileUpdate {
                filename: Some(new_name.to_string()),
                content: None,
            }),
        );
        self.update(
            gist_id,
            &UpdateGistRequest {
                description: None,
                files: Some(files),
            },
            format!("Renaming {} to {} in gist {}", file_name, new_name, gist_id),
        )
        .await
    }

    /// Deletes a gist.
    pub async fn remove(&self, gist_id: &str) -> GitHubResult<()> {
        let request = self.request(
            RestRequest::delete(format!("gists/{}", gist_id)),
            format!("Removing gist {}", gist_id),
            "Gists.Remove",
        );
        self.client.invoke(&request).await?;
        Ok(())
    }

    /// Forks a gist.
    pub async fn fork(&self, gist_id: &str) -> GitHubResult<ApiValue> {
        let request = self.request(
            RestRequest::post(format!("gists/{}/forks", gist_id)),
            format!("Forking gist {}", gist_id),
            "Gists.Fork",
        );
        let fork = self.client.invoke(&request).await?;
        Ok(decorate(self.client, fork, gist_decorator(None)))
    }

    /// Checks if a gist is starred.
    pub async fn is_starred(&self, gist_id: &str) -> GitHubResult<bool> {
        let request = self.request(
            RestRequest::get(format!("gists/{}/star", gist_id)),
            format!("Checking if gist {} is starred", gist_id),
            "Gists.IsStarred",
        );

        match self.client.invoke(&request).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Stars a gist.
    pub async fn star(&self, gist_id: &str) -> GitHubResult<()> {
        self.set_star(gist_id, true).await
    }

    /// Unstars a gist.
    pub async fn unstar(&self, gist_id: &str) -> GitHubResult<()> {
        self.set_star(gist_id, false).await
    }

    /// Stars or unstars a gist.
    pub async fn set_star(&self, gist_id: &str, starred: bool) -> GitHubResult<()> {
        let fragment = format!("gists/{}/star", gist_id);
        let request = if starred {
            self.request(RestRequest::put(fragment), format!("Starring gist {}", gist_id), "Gists.Star")
        } else {
            self.request(
                RestRequest::delete(fragment),
                format!("Unstarring gist {}", gist_id),
                "Gists.Unstar",
            )
        };
        self.client.invoke(&request).await?;
        Ok(())
    }

    // Internal methods

    async fn list_at(&self, fragment: String, params: &ListGistsParams, description: &str) -> GitHubResult<Vec<ApiValue>> {
        let fragment = with_query(fragment, params)?;
        let request = self.request(RestRequest::get(fragment), description.to_string(), "Gists.List");
        let items = self
            .client
            .invoke_multiple_result(request, params.single_page)
            .await?;
        Ok(decorate_all(self.client, items, gist_decorator(None)))
    }

    async fn update(&self, gist_id: &str, update: &UpdateGistRequest, description: String) -> GitHubResult<ApiValue> {
        let request = self
            .request(RestRequest::patch(format!("gists/{}", gist_id)), description, "Gists.Update")
            .json(update)?;
        let updated = self.client.invoke(&request).await?;
        Ok(decorate(self.client, updated, gist_decorator(None)))
    }

    fn request(&self, request: RestRequest, description: String, event: &str) -> RestRequest {
        request
            .access_token(self.access_token.clone())
            .description(description)
            .telemetry_event(event)
    }
}

/// Adds `gist_id`: the given id, or the item's own `id`.
pub(crate) fn gist_decorator(gist_id: Option<&str>) -> impl Fn(&mut ApiValue) {
    let gist_id = gist_id.map(ApiValue::from);
    move |item: &mut ApiValue| match &gist_id {
        Some(id) => item.insert("gist_id", id.clone()),
        None => copy_field(item, "id", "gist_id"),
    }
}

async fn read_gist_file(path: &Path) -> GitHubResult<(String, String)> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .ok_or_else(|| GitHubError::invalid_parameter(format!("{} has no file name", path.display())))?;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| GitHubError::io(format!("Unable to read {}", path.display()), e))?;
    Ok((name, content))
}

/// Parameters for listing gists.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListGistsParams {
    /// Only gists updated at or after this time.
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_since")]
    pub since: Option<DateTime<Utc>>,
    /// Items per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    /// Stop after the first page.
    #[serde(skip)]
    pub single_page: bool,
}

/// GitHub wants `YYYY-MM-DDTHH:MM:SSZ`.
pub(crate) fn serialize_since<S: Serializer>(since: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
    match since {
        Some(since) => serializer.serialize_str(&since.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => serializer.serialize_none(),
    }
}

/// Request to create a gist.
#[derive(Debug, Clone, Serialize)]
pub struct CreateGistRequest {
    /// Gist description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the gist is public.
    pub public: bool,
    /// Files to include (filename -> content).
    #[serde(serialize_with = "serialize_new_files")]
    pub files: BTreeMap<String, String>,
}

impl CreateGistRequest {
    /// Creates an empty request.
    pub fn new(public: bool) -> Self {
        Self {
            description: None,
            public,
            files: BTreeMap::new(),
        }
    }

    /// Adds a file.
    pub fn file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(name.into(), content.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

fn serialize_new_files<S: Serializer>(files: &BTreeMap<String, String>, serializer: S) -> Result<S::Ok, S::Error> {
    let wrapped: BTreeMap<&str, GistFileUpdate> = files
        .iter()
        .map(|(name, content)| (name.as_str(), GistFileUpdate::content(content.clone())))
        .collect();
    wrapped.serialize(serializer)
}

/// Request to update a gist.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateGistRequest {
    /// Gist description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Files to update (filename -> content or null to delete).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, Option<GistFileUpdate>>>,
}

/// Update content for a gist file.
#[derive(Debug, Clone, Serialize)]
pub struct GistFileUpdate {
    /// New filename (to rename).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// File content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl GistFileUpdate {
    fn content(content: String) -> Self {
        Self {
            filename: None,
            content: Some(content),
        }
    }
}
