//! GitHub-specific error handling.

use thiserror::Error;

/// GitHub API specific errors.
#[derive(Error, Debug)]
pub enum GitHubError {
    /// GitHub API request failed with error message.
    #[error("GitHub API request failed: {0}")]
    ApiRequestFailed(String),

    /// Invalid response format from the GitHub API.
    #[error("Invalid response format from GitHub API: {0}")]
    InvalidResponseFormat(String),

    /// Network connectivity error.
    #[error("Network error: {0}")]
    NetworkError(String),
}

// Note: anyhow already has a blanket impl for thiserror::Error types
