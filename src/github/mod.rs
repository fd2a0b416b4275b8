//! GitHub REST API client for pull request data.
//!
//! Covers the three calls the pipeline needs: listing a pull request's
//! commits (paginated), fetching pull request metadata (body and labels),
//! and overwriting a pull request's description.

pub mod error;

use anyhow::Result;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::changelog::LabelLookup;
use error::GitHubError;

const DEFAULT_BASE_URL: &str = "https://api.github.com";
const COMMITS_PER_PAGE: usize = 100;
const USER_AGENT: &str = concat!("pr-notes/", env!("CARGO_PKG_VERSION"));

/// One entry of the pull request commits listing.
#[derive(Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

/// Commit payload nested inside a commits listing entry.
#[derive(Deserialize)]
struct CommitDetail {
    message: String,
}

/// A label attached to a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelEntry {
    /// Label name as shown on the platform.
    pub name: String,
}

/// Pull request metadata, reduced to the fields the pipeline consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// Pull request number.
    pub number: u64,
    /// Current description text, if any.
    #[serde(default)]
    pub body: Option<String>,
    /// Attached labels.
    #[serde(default)]
    pub labels: Vec<LabelEntry>,
}

impl PullRequest {
    /// Returns the names of all attached labels.
    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|label| label.name.clone()).collect()
    }
}

/// Request body for a pull request description update.
#[derive(Serialize)]
struct BodyUpdate<'a> {
    body: &'a str,
}

/// GitHub API client scoped to a single token.
pub struct GitHubClient {
    client: Client,
    token: String,
    base_url: String,
}

impl GitHubClient {
    /// Creates a client against the public GitHub API.
    pub fn new(token: String) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL.to_string())
    }

    /// Creates a client against a custom API base URL (used by tests).
    pub fn with_base_url(token: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            token,
            base_url,
        }
    }

    /// Lists the commit messages of a pull request, in commit order.
    ///
    /// Pages through the listing until a short page so callers see one
    /// ordered sequence regardless of how many commits the PR has.
    pub async fn list_commit_messages(
        &self,
        owner: &str,
        repo: &str,
        pull_number: u64,
    ) -> Result<Vec<String>> {
        let url = format!(
            "{}/repos/{owner}/{repo}/pulls/{pull_number}/commits",
            self.base_url
        );

        let mut messages = Vec::new();
        let mut page = 1u32;
        loop {
            let response = self
                .request(Method::GET, &url)
                .query(&[
                    ("per_page", COMMITS_PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await
                .map_err(|e| GitHubError::NetworkError(e.to_string()))?;

            let response = check_status(response).await?;
            let entries: Vec<CommitEntry> = response
                .json()
                .await
                .map_err(|e| GitHubError::InvalidResponseFormat(e.to_string()))?;

            let count = entries.len();
            messages.extend(entries.into_iter().map(|entry| entry.commit.message));

            if count < COMMITS_PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(pull_number, count = messages.len(), "fetched commit messages");
        Ok(messages)
    }

    /// Fetches a pull request's metadata.
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        pull_number: u64,
    ) -> Result<PullRequest> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{pull_number}", self.base_url);

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| GitHubError::NetworkError(e.to_string()))?;

        let response = check_status(response).await?;
        let pull_request = response
            .json()
            .await
            .map_err(|e| GitHubError::InvalidResponseFormat(e.to_string()))?;

        Ok(pull_request)
    }

    /// Overwrites a pull request's description with `body`.
    pub async fn update_body(
        &self,
        owner: &str,
        repo: &str,
        pull_number: u64,
        body: &str,
    ) -> Result<()> {
        let url = format!("{}/repos/{owner}/{repo}/pulls/{pull_number}", self.base_url);

        let response = self
            .request(Method::PATCH, &url)
            .json(&BodyUpdate { body })
            .send()
            .await
            .map_err(|e| GitHubError::NetworkError(e.to_string()))?;

        check_status(response).await?;
        debug!(pull_number, body_length = body.len(), "updated pull request body");
        Ok(())
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("authorization", format!("Bearer {}", self.token))
            .header("accept", "application/vnd.github+json")
            .header("user-agent", USER_AGENT)
    }
}

/// Converts a non-success response into a [`GitHubError`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(
            GitHubError::ApiRequestFailed(format!("HTTP {}: {}", status, error_text)).into(),
        );
    }
    Ok(response)
}

/// Label lookup backed by the GitHub API, scoped to one repository.
pub struct PrLabelSource<'a> {
    client: &'a GitHubClient,
    owner: &'a str,
    repo: &'a str,
}

impl<'a> PrLabelSource<'a> {
    /// Creates a label source for `owner/repo`.
    pub fn new(client: &'a GitHubClient, owner: &'a str, repo: &'a str) -> Self {
        Self {
            client,
            owner,
            repo,
        }
    }
}

impl LabelLookup for PrLabelSource<'_> {
    async fn labels_of(&self, pull_number: u64) -> Result<Vec<String>> {
        let pull_request = self
            .client
            .get_pull_request(self.owner, self.repo, pull_number)
            .await?;
        Ok(pull_request.label_names())
    }
}
