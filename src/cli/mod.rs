//! CLI interface for pr-notes

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use crate::changelog;
use crate::config::Config;
use crate::github::{GitHubClient, PrLabelSource};

/// pr-notes: labeled release notes for pull requests
#[derive(Parser)]
#[command(name = "pr-notes")]
#[command(about = "Builds labeled release notes from a pull request's commits", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Target pull request number (defaults to the triggering event's pull request)
    #[arg(long, value_name = "NUMBER")]
    pub pull_number: Option<u64>,

    /// Comma-separated list of recognized heading labels (defaults to INPUT_LABELS)
    #[arg(long, value_name = "LIST")]
    pub labels: Option<String>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = Config::resolve(self.pull_number, self.labels.as_deref())?;
        let client = GitHubClient::new(config.token.clone());
        run(&config, &client).await
    }
}

/// Runs the changelog pipeline end to end.
///
/// Fetches the pull request and its commits, classifies every commit
/// message by the labels of its referenced pull request, renders the
/// sections as markdown and merges the result into the pull request's
/// description.
pub async fn run(config: &Config, client: &GitHubClient) -> Result<()> {
    println!(
        "Working on PR #{} in {}/{}",
        config.pull_number, config.owner, config.repo
    );

    let pull_request = client
        .get_pull_request(&config.owner, &config.repo, config.pull_number)
        .await
        .context("Failed to fetch pull request metadata")?;

    let messages = client
        .list_commit_messages(&config.owner, &config.repo, config.pull_number)
        .await
        .context("Failed to fetch pull request commits")?;

    for message in &messages {
        debug!(message = %message, "found commit message");
    }
    println!("Found {} commit message(s)", messages.len());

    // All label lookups settle here, in message order, before aggregation.
    let lookup = PrLabelSource::new(client, &config.owner, &config.repo);
    let classified = changelog::classify_all(&messages, &config.heading_labels, &lookup).await;

    let sections = changelog::aggregate(&classified);
    let rendered = changelog::render(&sections);

    // Printed before the update so a failed submit never loses the result.
    println!("Changelog:\n{rendered}");

    let body = changelog::merge(pull_request.body.as_deref(), &rendered);

    client
        .update_body(&config.owner, &config.repo, config.pull_number, &body)
        .await
        .context("Failed to update pull request body")?;

    println!("Pull request #{} description updated", config.pull_number);
    Ok(())
}
