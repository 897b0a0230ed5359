//! Branch and branch protection operations.

use super::{
    decorate, decorate_all, repository, repository_url, with_query, with_repository_telemetry, GraphQLPagination,
    GraphQLService, PageInfo,
};
use crate::client::{GitHubClient, RestRequest};
use crate::errors::{GitHubError, GitHubResult};
use crate::materialize::ApiValue;
use crate::types::GitRef;
use crate::uri::{RepositoryParams, RepositoryRef};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Marker GitHub puts in the 404 for a branch without protection.
const BRANCH_NOT_PROTECTED: &str = "Branch not protected";

/// Service for branch operations.
pub struct BranchesService<'a> {
    client: &'a GitHubClient,
    access_token: Option<SecretString>,
}

impl<'a> BranchesService<'a> {
    /// Creates a new branches service.
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

    /// Lists branches.
    pub async fn list(
        &self,
        repo: impl Into<RepositoryParams>,
        params: &ListBranchesParams,
    ) -> GitHubResult<Vec<ApiValue>> {
        let repo = repository(self.client, repo.into())?;
        let fragment = with_query(format!("{}/branches", repo.api_path()), params)?;

        let request = with_repository_telemetry(RestRequest::get(fragment), &repo)
            .access_token(self.access_token.clone())
            .description(format!("Getting branches for {}", repo.repository_name))
            .telemetry_event("Branches.List")
            .telemetry_property("ProtectedOnly", params.protected.unwrap_or(false).to_string());

        let items = self
            .client
            .invoke_multiple_result(request, params.single_page)
            .await?;
        Ok(decorate_all(self.client, items, self.decorator(&repo, None)))
    }

    /// Gets a branch.
    pub async fn get(&self, repo: impl Into<RepositoryParams>, branch_name: &str) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;
        let request = with_repository_telemetry(
            RestRequest::get(format!("{}/branches/{}", repo.api_path(), branch_name)),
            &repo,
        )
        .access_token(self.access_token.clone())
        .description(format!("Getting branch {} for {}", branch_name, repo.repository_name))
        .telemetry_event("Branches.Get");

        let branch = self.client.invoke(&request).await?;
        Ok(decorate(self.client, branch, self.decorator(&repo, None)))
    }

    /// Creates `branch_name` pointing at the head of `origin_branch_name`.
    ///
    /// Without an origin, the repository's default branch is used.
    pub async fn create(
        &self,
        repo: impl Into<RepositoryParams>,
        branch_name: &str,
        origin_branch_name: Option<&str>,
    ) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;

        let origin = match origin_branch_name {
            Some(origin) => origin.to_string(),
            None => self.default_branch(&repo).await?,
        };
        let sha = self.origin_sha(&repo, &origin).await?;

        let request = with_repository_telemetry(RestRequest::post(format!("{}/git/refs", repo.api_path())), &repo)
            .json(&CreateRefRequest {
                ref_name: format!("refs/heads/{}", branch_name),
                sha,
            })?
            .access_token(self.access_token.clone())
            .description(format!(
                "Creating branch {} from {} for {}",
                branch_name, origin, repo.repository_name
            ))
            .telemetry_event("Branches.Create");

        let created = self.client.invoke(&request).await?;
        Ok(decorate(self.client, created, self.decorator(&repo, Some(branch_name))))
    }

    /// Deletes a branch.
    pub async fn remove(&self, repo: impl Into<RepositoryParams>, branch_name: &str) -> GitHubResult<()> {
        let repo = repository(self.client, repo.into())?;
        let request = with_repository_telemetry(
            RestRequest::delete(format!("{}/git/refs/heads/{}", repo.api_path(), branch_name)),
            &repo,
        )
        .access_token(self.access_token.clone())
        .description(format!("Deleting branch {} from {}", branch_name, repo.repository_name))
        .telemetry_event("Branches.Remove");

        self.client.invoke(&request).await?;
        Ok(())
    }

    async fn default_branch(&self, repo: &RepositoryRef) -> GitHubResult<String> {
        let request = RestRequest::get(repo.api_path())
            .access_token(self.access_token.clone())
            .description(format!("Getting default branch of {}", repo.repository_name))
            .telemetry_event("Branches.DefaultBranch");

        let repository = self.client.invoke(&request).await?;
        repository
            .get("default_branch")
            .and_then(ApiValue::as_str)
            .map(String::from)
            .ok_or_else(|| GitHubError::deserialization("Repository response has no default_branch"))
    }

    async fn origin_sha(&self, repo: &RepositoryRef, origin: &str) -> GitHubResult<String> {
        let request = RestRequest::get(format!("{}/git/refs/heads/{}", repo.api_path(), origin))
            .access_token(self.access_token.clone())
            .description(format!("Getting reference for {}", origin))
            .telemetry_event("Branches.OriginReference");

        let not_found = || {
            GitHubError::not_found(format!(
                "Origin branch '{}' not found in {}/{}.",
                origin, repo.owner_name, repo.repository_name
            ))
        };

        let reference = match self.client.invoke(&request).await {
            Ok(reference) => reference,
            Err(e) if e.is_not_found() => return Err(not_found()),
            Err(e) => return Err(e),
        };

        // A prefix match returns every ref starting with the name.
        let wanted = format!("refs/heads/{}", origin);
        let exact = match reference {
            ApiValue::Array(_) => {
                let refs: Vec<GitRef> = reference.deserialize_into()?;
                refs.into_iter().find(|r| r.ref_name == wanted)
            }
            other => Some(other.deserialize_into::<GitRef>()?),
        };

        exact.map(|r| r.object.sha).ok_or_else(not_found)
    }

    fn decorator(&self, repo: &RepositoryRef, branch_name: Option<&str>) -> impl Fn(&mut ApiValue) {
        let url = repository_url(self.client, repo);
        let branch_name = branch_name.map(String::from);
        move |item: &mut ApiValue| {
            item.insert("repository_url", url.clone());
            let name = branch_name.clone().or_else(|| {
                item.get("name")
                    .or_else(|| item.get("ref"))
                    .and_then(ApiValue::as_str)
                    .map(|n| n.strip_prefix("refs/heads/").unwrap_or(n).to_string())
            });
            if let Some(name) = name {
                item.insert("branch_name", ApiValue::from(name));
            }
        }
    }
}

/// Parameters for listing branches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListBranchesParams {
    /// Only protected (`true`) or unprotected (`false`) branches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    /// Items per page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    /// Stop after the first page.
    #[serde(skip)]
    pub single_page: bool,
}

impl ListBranchesParams {
    /// Lists protected branches only.
    pub fn protected_only() -> Self {
        Self {
            protected: Some(true),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateRefRequest {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
}

/// Service for branch protection rules.
pub struct BranchProtectionService<'a> {
    client: &'a GitHubClient,
    access_token: Option<SecretString>,
}

impl<'a> BranchProtectionService<'a> {
    /// Creates a new branch protection service.
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

    /// Gets the protection of a branch.
    pub async fn get(&self, repo: impl Into<RepositoryParams>, branch_name: &str) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;
        self.get_resolved(&repo, branch_name).await
    }

    /// Protects a branch. Fails when the branch already has protection.
    pub async fn create(
        &self,
        repo: impl Into<RepositoryParams>,
        branch_name: &str,
        settings: &BranchProtectionSettings,
    ) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;

        match self.get_resolved(&repo, branch_name).await {
            Ok(_) => {
                return Err(GitHubError::validation(format!(
                    "Branch '{}' in {}/{} already has a protection rule.",
                    branch_name, repo.owner_name, repo.repository_name
                )))
            }
            Err(e) if e.is_not_found() && e.message().contains(BRANCH_NOT_PROTECTED) => {}
            Err(e) => return Err(e),
        }

        let request = with_repository_telemetry(RestRequest::put(self.fragment(&repo, branch_name)), &repo)
            .json(settings)?
            .access_token(self.access_token.clone())
            .description(format!(
                "Setting protection rule on {} for {}",
                branch_name, repo.repository_name
            ))
            .telemetry_event("BranchProtection.Create");

        let rule = self.client.invoke(&request).await?;
        Ok(decorate(self.client, rule, self.decorator(&repo, branch_name)))
    }

    /// Removes the protection of a branch.
    pub async fn remove(&self, repo: impl Into<RepositoryParams>, branch_name: &str) -> GitHubResult<()> {
        let repo = repository(self.client, repo.into())?;
        let request = with_repository_telemetry(RestRequest::delete(self.fragment(&repo, branch_name)), &repo)
            .access_token(self.access_token.clone())
            .description(format!(
                "Removing protection rule from {} for {}",
                branch_name, repo.repository_name
            ))
            .telemetry_event("BranchProtection.Remove");

        self.client.invoke(&request).await?;
        Ok(())
    }

    /// Gets a pattern-based protection rule.
    pub async fn get_pattern_rule(
        &self,
        repo: impl Into<RepositoryParams>,
        pattern: &str,
    ) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;
        let (_, rule) = self.find_pattern_rule(&repo, pattern).await?;
        let rule = rule.ok_or_else(|| pattern_not_found(&repo, pattern))?;
        let url = repository_url(self.client, &repo);
        Ok(decorate(self.client, rule, move |item| {
            item.insert("repository_url", url.clone())
        }))
    }

    /// Creates a pattern-based protection rule.
    pub async fn create_pattern_rule(
        &self,
        repo: impl Into<RepositoryParams>,
        rule: &PatternProtectionRule,
    ) -> GitHubResult<ApiValue> {
        let repo = repository(self.client, repo.into())?;
        let (repository_id, existing) = self.find_pattern_rule(&repo, &rule.pattern).await?;
        if existing.is_some() {
            return Err(GitHubError::validation(format!(
                "A branch protection rule for pattern '{}' already exists in {}/{}.",
                rule.pattern, repo.owner_name, repo.repository_name
            )));
        }

        let mut input = serde_json::to_value(rule)
            .map_err(|e| GitHubError::invalid_parameter(format!("Failed to serialize rule: {}", e)))?;
        input["repositoryId"] = json!(repository_id);

        let data = self
            .graphql()
            .mutation(CREATE_RULE_MUTATION, Some(json!({ "input": input })))
            .await?;

        let created = data
            .get("createBranchProtectionRule")
            .and_then(|d| d.get("branchProtectionRule"))
            .cloned()
            .unwrap_or(ApiValue::Null);
        let url = repository_url(self.client, &repo);
        Ok(decorate(self.client, created, move |item| {
            item.insert("repository_url", url.clone())
        }))
    }

    /// Removes a pattern-based protection rule.
    pub async fn remove_pattern_rule(&self, repo: impl Into<RepositoryParams>, pattern: &str) -> GitHubResult<()> {
        let repo = repository(self.client, repo.into())?;
        let (_, rule) = self.find_pattern_rule(&repo, pattern).await?;
        let rule_id = rule
            .as_ref()
            .and_then(|r| r.get("id"))
            .and_then(ApiValue::as_str)
            .map(String::from)
            .ok_or_else(|| pattern_not_found(&repo, pattern))?;

        self.graphql()
            .mutation(
                DELETE_RULE_MUTATION,
                Some(json!({ "input": { "branchProtectionRuleId": rule_id } })),
            )
            .await?;
        Ok(())
    }

    async fn get_resolved(&self, repo: &RepositoryRef, branch_name: &str) -> GitHubResult<ApiValue> {
        let request = with_repository_telemetry(RestRequest::get(self.fragment(repo, branch_name)), repo)
            .access_token(self.access_token.clone())
            .description(format!(
                "Getting protection rule for {} in {}",
                branch_name, repo.repository_name
            ))
            .telemetry_event("BranchProtection.Get");

        let rule = self.client.invoke(&request).await?;
        Ok(decorate(self.client, rule, self.decorator(repo, branch_name)))
    }

    /// Pages through the repository's rules looking for `pattern`.
    /// Returns the repository node id along with the rule, if found.
    async fn find_pattern_rule(
        &self,
        repo: &RepositoryRef,
        pattern: &str,
    ) -> GitHubResult<(String, Option<ApiValue>)> {
        let mut pagination = GraphQLPagination::forward(100);

        loop {
            let mut variables = pagination.to_variables();
            variables["owner"] = json!(repo.owner_name);
            variables["name"] = json!(repo.repository_name);

            let data = self.graphql().query(RULES_QUERY, Some(variables)).await?;
            let repository = data.get("repository").cloned().unwrap_or(ApiValue::Null);
            let repository_id = repository
                .get("id")
                .and_then(ApiValue::as_str)
                .map(String::from)
                .ok_or_else(|| {
                    GitHubError::not_found(format!(
                        "Repository {}/{} not found.",
                        repo.owner_name, repo.repository_name
                    ))
                })?;

            let rules = repository.get("branchProtectionRules").cloned().unwrap_or(ApiValue::Null);
            let found = rules
                .get("nodes")
                .and_then(ApiValue::as_array)
                .and_then(|nodes| {
                    nodes
                        .iter()
                        .find(|n| n.get("pattern").and_then(ApiValue::as_str) == Some(pattern))
                        .cloned()
                });
            if found.is_some() {
                return Ok((repository_id, found));
            }

            let page_info: Option<PageInfo> = rules
                .get("pageInfo")
                .map(ApiValue::deserialize_into)
                .transpose()?;
            match page_info {
                Some(PageInfo {
                    has_next_page: true,
                    end_cursor: Some(cursor),
                }) => pagination = GraphQLPagination::forward_after(100, cursor),
                _ => return Ok((repository_id, None)),
            }
        }
    }

    fn graphql(&self) -> GraphQLService<'a> {
        GraphQLService::new(self.client).with_secret(self.access_token.clone())
    }

    fn fragment(&self, repo: &RepositoryRef, branch_name: &str) -> String {
        format!("{}/branches/{}/protection", repo.api_path(), branch_name)
    }

    fn decorator(&self, repo: &RepositoryRef, branch_name: &str) -> impl Fn(&mut ApiValue) {
        let url = repository_url(self.client, repo);
        let branch_name = ApiValue::from(branch_name);
        move |item: &mut ApiValue| {
            item.insert("repository_url", url.clone());
            item.insert("branch_name", branch_name.clone());
        }
    }
}

fn pattern_not_found(repo: &RepositoryRef, pattern: &str) -> GitHubError {
    GitHubError::not_found(format!(
        "Branch protection rule for pattern '{}' not found in {}/{}.",
        pattern, repo.owner_name, repo.repository_name
    ))
}

const RULES_QUERY: &str = concat!(
    "query($owner: String!, $name: String!, $first: Int, $after: String) { ",
    "repository(owner: $owner, name: $name) { id ",
    "branchProtectionRules(first: $first, after: $after) { ",
    "nodes { id pattern requiresApprovingReviews requiredApprovingReviewCount ",
    "dismissesStaleReviews requiresCodeOwnerReviews requiresStatusChecks requiresStrictStatusChecks ",
    "requiredStatusCheckContexts isAdminEnforced requiresLinearHistory allowsForcePushes ",
    "allowsDeletions restrictsPushes } ",
    "pageInfo { hasNextPage endCursor } } } }"
);

const CREATE_RULE_MUTATION: &str = concat!(
    "mutation($input: CreateBranchProtectionRuleInput!) { ",
    "createBranchProtectionRule(input: $input) { branchProtectionRule { ",
    "id pattern requiresApprovingReviews requiredApprovingReviewCount ",
    "dismissesStaleReviews requiresCodeOwnerReviews requiresStatusChecks requiresStrictStatusChecks ",
    "requiredStatusCheckContexts isAdminEnforced requiresLinearHistory allowsForcePushes ",
    "allowsDeletions restrictsPushes } } }"
);

const DELETE_RULE_MUTATION: &str = concat!(
    "mutation($input: DeleteBranchProtectionRuleInput!) { ",
    "deleteBranchProtectionRule(input: $input) { clientMutationId } }"
);

/// Settings for REST branch protection. The four top-level sections are
/// always sent; `None` disables that section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchProtectionSettings {
    /// Required status checks.
    pub required_status_checks: Option<RequiredStatusChecks>,
    /// Enforce the rule for administrators too.
    pub enforce_admins: Option<bool>,
    /// Required pull request reviews.
    pub required_pull_request_reviews: Option<RequiredPullRequestReviews>,
    /// Who may push.
    pub restrictions: Option<BranchRestrictions>,
    /// Require a linear history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_linear_history: Option<bool>,
    /// Allow force pushes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_force_pushes: Option<bool>,
    /// Allow deleting the branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_deletions: Option<bool>,
}

/// Required status checks section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiredStatusChecks {
    /// Branch must be up to date before merging.
    pub strict: bool,
    /// Status check contexts that must pass.
    pub contexts: Vec<String>,
}

/// Required reviews section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequiredPullRequestReviews {
    /// Who may dismiss reviews.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissal_restrictions: Option<DismissalRestrictions>,
    /// Dismiss approvals when new commits are pushed.
    pub dismiss_stale_reviews: bool,
    /// Require a code owner's review.
    pub require_code_owner_reviews: bool,
    /// Number of approvals required (1-6).
    pub required_approving_review_count: u8,
}

/// Users and teams allowed to dismiss reviews.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DismissalRestrictions {
    /// User logins.
    pub users: Vec<String>,
    /// Team slugs.
    pub teams: Vec<String>,
}

/// Users, teams and apps allowed to push.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BranchRestrictions {
    /// User logins.
    pub users: Vec<String>,
    /// Team slugs.
    pub teams: Vec<String>,
    /// App slugs.
    #[serde(default)]
    pub apps: Vec<String>,
}

/// Pattern-based protection rule, as sent to the GraphQL API.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternProtectionRule {
    /// Branch name pattern (`release/*`).
    pub pattern: String,
    /// Require approving reviews.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_approving_reviews: Option<bool>,
    /// Number of approvals required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u8>,
    /// Dismiss approvals when new commits are pushed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismisses_stale_reviews: Option<bool>,
    /// Require a code owner's review.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_code_owner_reviews: Option<bool>,
    /// Require status checks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_status_checks: Option<bool>,
    /// Branch must be up to date before merging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_strict_status_checks: Option<bool>,
    /// Status check contexts that must pass.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required_status_check_contexts: Vec<String>,
    /// Enforce for administrators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin_enforced: Option<bool>,
    /// Require a linear history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_linear_history: Option<bool>,
    /// Allow force pushes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allows_force_pushes: Option<bool>,
    /// Allow deleting matching branches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allows_deletions: Option<bool>,
}

impl PatternProtectionRule {
    /// Creates a rule with nothing but a pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }
}
