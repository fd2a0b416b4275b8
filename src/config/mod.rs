//! Configuration resolution for a pr-notes run.
//!
//! Inputs follow the conventions of a CI action: `INPUT_TOKEN` /
//! `GITHUB_TOKEN` for the credential, `GITHUB_REPOSITORY` for the target
//! repository, and `INPUT_PULL_NUMBER` or the triggering event payload
//! (`GITHUB_EVENT_PATH`) for the target pull request. All of it must
//! resolve before any network call is made.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::utils::settings::{env_var, first_env_var};

/// Fully resolved run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// API credential (opaque).
    pub token: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Target pull request number.
    pub pull_number: u64,
    /// Recognized heading labels, in configuration order.
    pub heading_labels: Vec<String>,
}

impl Config {
    /// Resolves the configuration from CLI overrides and the environment.
    ///
    /// Missing required inputs (credential, repository, resolvable pull
    /// request number) are fatal here, before anything touches the network.
    pub fn resolve(pull_number: Option<u64>, labels: Option<&str>) -> Result<Self> {
        let token = first_env_var(&["INPUT_TOKEN", "GITHUB_TOKEN"]).context(
            "GitHub token not configured. Set the INPUT_TOKEN or GITHUB_TOKEN environment variable",
        )?;

        let repository = env_var("GITHUB_REPOSITORY")
            .context("Target repository not configured. Set the GITHUB_REPOSITORY environment variable")?;
        let (owner, repo) = parse_repository(&repository)?;

        let pull_number = match pull_number {
            Some(number) => number,
            None => resolve_pull_number()?,
        };

        let labels_raw = match labels {
            Some(value) => value.to_string(),
            None => env_var("INPUT_LABELS").unwrap_or_default(),
        };

        Ok(Self {
            token,
            owner,
            repo,
            pull_number,
            heading_labels: parse_labels(&labels_raw),
        })
    }
}

/// Resolves the target pull request number from the environment.
///
/// An explicit `INPUT_PULL_NUMBER` wins; otherwise the triggering event
/// payload must describe a pull request.
fn resolve_pull_number() -> Result<u64> {
    if let Ok(value) = env_var("INPUT_PULL_NUMBER") {
        return value
            .trim()
            .parse()
            .with_context(|| format!("Invalid pull request number: {value}"));
    }

    let event_path = env_var("GITHUB_EVENT_PATH").context(
        "No pull request number configured and no event payload available. \
         Set INPUT_PULL_NUMBER or run from a pull request event",
    )?;
    pull_number_from_event(Path::new(&event_path))
}

/// Triggering event payload, reduced to the one field consumed.
#[derive(Deserialize)]
struct EventPayload {
    #[serde(default)]
    pull_request: Option<EventPullRequest>,
}

#[derive(Deserialize)]
struct EventPullRequest {
    number: u64,
}

/// Reads the pull request number out of an event payload file.
fn pull_number_from_event(path: &Path) -> Result<u64> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event payload: {}", path.display()))?;

    let payload: EventPayload = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse event payload: {}", path.display()))?;

    payload
        .pull_request
        .map(|pr| pr.number)
        .context("Event payload does not describe a pull request")
}

/// Splits an `owner/repo` coordinate into its parts.
fn parse_repository(repository: &str) -> Result<(String, String)> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => bail!("Invalid repository '{repository}', expected 'owner/repo'"),
    }
}

/// Parses a comma-separated label list, trimming entries and dropping
/// duplicates while preserving configuration order.
fn parse_labels(raw: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for label in raw.split(',') {
        let label = label.trim();
        if !label.is_empty() && !labels.iter().any(|existing| existing == label) {
            labels.push(label.to_string());
        }
    }
    labels
}
