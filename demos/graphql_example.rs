//! Example demonstrating the GitHub GraphQL client.
//!
//! Queries go through the same invocation core as REST calls, so the token,
//! logging and error messages behave the same way.
//!
//! Run with:
//! ```
//! GITHUB_TOKEN=ghp_xxxxxxxxxxxx cargo run --example graphql_example
//! ```

use integrations_github_commands::services::{GraphQLPagination, PageInfo};
use integrations_github_commands::{EnvTokenProvider, GitHubClient, RepositoryParams};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Viewer information response.
#[derive(Debug, Deserialize)]
struct ViewerResponse {
    viewer: Viewer,
}

/// GitHub user viewer.
#[derive(Debug, Deserialize)]
struct Viewer {
    login: String,
    name: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: String,
}

/// Repository query response.
#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    repository: Repository,
}

/// Repository information.
#[derive(Debug, Deserialize)]
struct Repository {
    name: String,
    description: Option<String>,
    #[serde(rename = "stargazerCount")]
    stargazer_count: i32,
    #[serde(rename = "forkCount")]
    fork_count: i32,
}

/// Paginated repositories response.
#[derive(Debug, Deserialize)]
struct RepositoriesResponse {
    viewer: ViewerWithRepos,
}

/// Viewer with repositories.
#[derive(Debug, Deserialize)]
struct ViewerWithRepos {
    repositories: RepositoryConnection,
}

/// Repository connection.
#[derive(Debug, Deserialize)]
struct RepositoryConnection {
    #[serde(rename = "totalCount")]
    total_count: i32,
    nodes: Vec<RepositoryNode>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

/// Repository node.
#[derive(Debug, Deserialize)]
struct RepositoryNode {
    name: String,
    #[serde(rename = "stargazerCount")]
    stargazer_count: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Token comes from GITHUB_TOKEN; without it every call is anonymous
    let client = GitHubClient::builder()
        .token_provider(Arc::new(EnvTokenProvider::from_github_token()))
        .build()?;
    let graphql = client.graphql();

    println!("=== GitHub GraphQL Examples ===\n");

    // Example 1: Simple query
    println!("1. Fetching viewer information...");
    let viewer_query = "query { viewer { login name createdAt } }";

    let viewer: ViewerResponse = graphql.query_as(viewer_query, None).await?;
    println!("   Logged in as: {}", viewer.viewer.login);
    if let Some(name) = viewer.viewer.name {
        println!("   Name: {}", name);
    }
    println!("   Account created: {}", viewer.viewer.created_at);

    println!();

    // Example 2: Query with variables and an operation name
    println!("2. Fetching repository information...");
    let repo_query = r#"
        query GetRepository($owner: String!, $name: String!) {
            repository(owner: $owner, name: $name) {
                name
                description
                stargazerCount
                forkCount
            }
        }
    "#;

    let response = graphql
        .execute(
            repo_query,
            Some(json!({ "owner": "rust-lang", "name": "rust" })),
            Some("GetRepository"),
        )
        .await?;

    let repo = response.data_as::<RepositoryResponse>()?.repository;
    println!("   Repository: {}", repo.name);
    if let Some(desc) = repo.description {
        println!("   Description: {}", desc);
    }
    println!("   Stars: {}", repo.stargazer_count);
    println!("   Forks: {}", repo.fork_count);
    if let Some(cost) = response.query_cost() {
        println!("   Query cost: {} points", cost);
    }

    println!();

    // Example 3: Cursor pagination
    println!("3. Fetching repositories with pagination...");
    let pagination_query = r#"
        query($first: Int!, $after: String) {
            viewer {
                repositories(first: $first, after: $after, orderBy: {field: STARGAZERS, direction: DESC}) {
                    totalCount
                    nodes { name stargazerCount }
                    pageInfo { hasNextPage endCursor }
                }
            }
        }
    "#;

    let mut pagination = GraphQLPagination::forward(5);
    for page in 1..=2 {
        let repos: RepositoriesResponse = graphql
            .query_as(pagination_query, Some(pagination.to_variables()))
            .await?;
        let repos = repos.viewer.repositories;

        println!("   Page {} of {} repositories:", page, repos.total_count);
        for node in &repos.nodes {
            println!("   - {} ({} stars)", node.name, node.stargazer_count);
        }

        match repos.page_info {
            PageInfo {
                has_next_page: true,
                end_cursor: Some(cursor),
            } => pagination = GraphQLPagination::forward_after(5, cursor),
            _ => break,
        }
    }

    println!();

    // Example 4: Errors in a 200 response become a GitHubError
    println!("4. Demonstrating error handling...");
    let invalid_query = r#"
        query {
            repository(owner: "nonexistent-user-12345", name: "nonexistent-repo") {
                name
            }
        }
    "#;

    match graphql.query(invalid_query, None).await {
        Ok(_) => println!("   Unexpectedly succeeded"),
        Err(e) => {
            println!("   Kind: {}", e.kind());
            for line in e.to_string().lines() {
                println!("   {}", line);
            }
        }
    }

    println!();

    // Example 5: Pattern-based branch protection rules
    println!("5. Looking up a branch protection rule...");
    match client
        .branch_protection()
        .get_pattern_rule(RepositoryParams::from_names("rust-lang", "rust"), "master")
        .await
    {
        Ok(rule) => println!("   Rule: {}", rule.to_json()),
        Err(e) => println!("   Error: {}", e.message().lines().next().unwrap_or_default()),
    }

    println!();
    println!("=== Examples Complete ===");

    Ok(())
}
