//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with the GitHub API
//! through the github_client crate. Every octocrab failure is classified into one of these
//! variants so callers can decide whether a call is worth retrying without inspecting
//! transport details.

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// Each variant provides specific context about what went wrong. Use
/// [`Error::is_transient`] to decide whether the failed call may succeed when retried.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::{Error, IssueClient};
///
/// match client.close_issue("owner", "repo", 42, CloseReason::NotPlanned).await {
///     Ok(issue) => println!("Closed issue #{}", issue.number),
///     Err(Error::NotFound) => eprintln!("Issue does not exist"),
///     Err(e) if e.is_transient() => eprintln!("Transient failure, retry later: {}", e),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// GitHub rejected the request with a client error status.
    ///
    /// This covers validation failures (422), conflicts and other 4xx responses that
    /// are not authentication, rate limit or not-found responses. Retrying will not help.
    #[error("API request failed with status {status}: {message}")]
    ApiError {
        /// HTTP status code returned by GitHub.
        status: u16,
        /// Error message returned by GitHub.
        message: String,
    },

    /// Authentication or GitHub client initialization failure.
    ///
    /// This error occurs when:
    /// - The token is invalid or expired
    /// - The token lacks the permissions needed for the operation
    /// - The octocrab client could not be built
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The GitHub API returned a response in an unexpected format.
    #[error("Invalid response format")]
    InvalidResponse,

    /// The requested resource was not found.
    ///
    /// This error occurs when a GitHub API request returns a 404 status code,
    /// indicating that the requested resource (issue, label, repository) does not
    /// exist or is not accessible with the current authentication.
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded.
    ///
    /// Returned for 429 responses and for 403 responses whose message mentions the
    /// rate limit.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// GitHub answered with a server side error (5xx).
    #[error("GitHub server error with status {status}: {message}")]
    ServerError {
        /// HTTP status code returned by GitHub.
        status: u16,
        /// Error message returned by GitHub.
        message: String,
    },

    /// The request never produced an HTTP response (connection reset, DNS, TLS).
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl Error {
    /// Returns `true` if the failure is likely temporary and the call may be retried.
    ///
    /// Server errors, transport failures and rate limiting are transient. Everything
    /// else describes a request that will fail the same way again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ServerError { .. } | Error::Transport(_) | Error::RateLimitExceeded
        )
    }
}
