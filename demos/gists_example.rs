//! Example walking through the gist commands.
//!
//! Creates a private gist, edits it, comments on it, saves it to disk and
//! deletes it again.
//!
//! Run with:
//! ```
//! GITHUB_TOKEN=ghp_xxxxxxxxxxxx cargo run --example gists_example
//! ```

use integrations_github_commands::{
    ApiValue, AuthMethod, CreateGistRequest, Gist, GitHubClient, GitHubConfig, ListGistsParams,
};
use std::collections::BTreeMap;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let token = std::env::var("GITHUB_TOKEN").map_err(|_| "GITHUB_TOKEN environment variable must be set")?;

    let config = GitHubConfig::builder()
        .auth(AuthMethod::pat(token))
        .multi_request_progress_threshold(2)
        .build()?;
    let client = GitHubClient::new(config)?;
    let gists = client.gists();

    println!("=== GitHub Gist Examples ===\n");

    // Example 1: List your gists
    println!("1. Listing your gists (first page)...");
    let params = ListGistsParams {
        single_page: true,
        ..Default::default()
    };
    for gist in gists.list(&params).await? {
        let gist: Gist = gist.deserialize_into()?;
        println!(
            "   {} {} ({} files)",
            gist.id,
            gist.description.unwrap_or_default(),
            gist.files.len()
        );
    }

    println!();

    // Example 2: Create a gist
    println!("2. Creating a private gist...");
    let request = CreateGistRequest::new(false)
        .description("Created by gists_example")
        .file("hello.rs", "fn main() {\n    println!(\"Hello, gist!\");\n}\n");
    let created = gists.create(&request).await?;
    let gist_id = created
        .get("gist_id")
        .and_then(ApiValue::as_str)
        .ok_or("created gist has no id")?
        .to_string();
    println!("   Created {}", gist_id);

    // Example 3: Edit files
    println!("3. Adding and renaming files...");
    let mut files = BTreeMap::new();
    files.insert("README.md".to_string(), "# Example gist\n".to_string());
    gists.set_files(&gist_id, files).await?;
    gists.rename_file(&gist_id, "hello.rs", "main.rs").await?;

    // Example 4: Comment
    println!("4. Commenting...");
    let comment = client.gist_comments().create(&gist_id, "Looks good!").await?;
    println!(
        "   Comment {} created",
        comment.get("comment_id").and_then(ApiValue::as_u64).unwrap_or_default()
    );

    // Example 5: Star and save
    println!("5. Starring and saving to disk...");
    gists.star(&gist_id).await?;
    println!("   Starred: {}", gists.is_starred(&gist_id).await?);

    let directory = std::env::temp_dir().join(&gist_id);
    for path in gists.save(&gist_id, &directory, true).await? {
        println!("   Saved {}", path.display());
    }

    // Example 6: Clean up
    println!("6. Deleting the gist...");
    gists.remove(&gist_id).await?;

    println!();
    println!("=== Examples Complete ===");

    Ok(())
}
