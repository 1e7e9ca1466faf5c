//! Crate for interacting with the GitHub issues REST API.
//!
//! This crate provides a client for listing, inspecting, commenting on, labelling and
//! closing issues. The [`IssueClient`] trait is the seam consumers depend on; the
//! [`GitHubClient`] implements it on top of `octocrab`.

use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use http_body_util::combinators::BoxBody;
use octocrab::{service::middleware::retry::RetryConfig, Octocrab, Result as OctocrabResult};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, error, info, instrument};

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::{CloseReason, Comment, Issue, IssueStatus, Label, TimelineEvent, User};

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Default number of items requested per page from list endpoints.
pub const DEFAULT_PAGE_SIZE: u8 = 100;

/// Response as returned by octocrab's unprocessed request methods.
type RawResponse = http::Response<BoxBody<Bytes, octocrab::Error>>;

/// Operations on issues that the issue lifecycle consumes.
///
/// All methods address an issue by repository owner, repository name and issue
/// number. Pull requests are addressed through the same methods because GitHub
/// treats them as issues.
#[async_trait]
pub trait IssueClient: Send + Sync {
    /// Lists all open issues (and pull requests) that carry the given label.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] classified from the first failing page request.
    async fn list_issues_by_label(
        &self,
        owner: &str,
        repo: &str,
        label: &str,
    ) -> Result<Vec<Issue>, Error>;

    /// Fetches a single issue.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the issue does not exist.
    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, Error>;

    /// Fetches the complete timeline of an issue, oldest entry first.
    async fn get_issue_timeline(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<TimelineEvent>, Error>;

    /// Closes an issue, recording the given reason.
    async fn close_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        reason: CloseReason,
    ) -> Result<Issue, Error>;

    /// Posts a comment on an issue.
    async fn post_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<Comment, Error>;

    /// Removes a label from an issue.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the label is not applied to the issue.
    async fn remove_label(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        label: &str,
    ) -> Result<(), Error>;
}

/// A client for interacting with the GitHub issues API.
#[derive(Debug)]
pub struct GitHubClient {
    client: Octocrab,
    page_size: u8,
}

impl GitHubClient {
    /// Creates a new `GitHubClient` wrapping an already authenticated `Octocrab` instance.
    pub fn new(client: Octocrab) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Overrides the number of items requested per page from list endpoints.
    ///
    /// Values of zero are raised to one.
    pub fn with_page_size(mut self, page_size: u8) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Requests every page of a list endpoint until a short page is returned.
    async fn get_all_pages<T, Q>(
        &self,
        operation: &str,
        path: &str,
        query: Q,
    ) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
        Q: Fn(u32, u8) -> PageQuery,
    {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let uri = query(page, self.page_size).append_to(path);
            debug!(path = path, page = page, "Requesting page");

            let batch: Vec<T> = self.read_json(operation, self.client._get(uri).await).await?;

            let received = batch.len();
            items.extend(batch);
            if received < usize::from(self.page_size) {
                break;
            }
            page += 1;
        }

        Ok(items)
    }

    /// Reads the body of a raw response.
    ///
    /// Failures are classified from the HTTP status before the body is looked at,
    /// so a 5xx stays a server error even when GitHub's edge answers with an HTML
    /// page or an empty body.
    async fn read_body(
        &self,
        operation: &str,
        response: OctocrabResult<RawResponse>,
    ) -> Result<String, Error> {
        let response = response.map_err(|e| classify_octocrab_error(operation, e))?;
        let status = response.status();

        if !status.is_success() {
            let body = self.client.body_to_string(response).await.unwrap_or_default();
            let message = error_message(status, &body);
            error!(
                error_message = %message,
                status = status.as_u16(),
                "{}. Received an error from GitHub",
                operation
            );
            return Err(classify_status(status, &message));
        }

        self.client
            .body_to_string(response)
            .await
            .map_err(|e| classify_octocrab_error(operation, e))
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        response: OctocrabResult<RawResponse>,
    ) -> Result<T, Error> {
        let body = self.read_body(operation, response).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(error_message = %e, "{}. Failed to deserialize the response", operation);
            Error::Deserialization(e)
        })
    }
}

/// Query string parameters for paginated list requests.
#[derive(Debug)]
struct PageQuery {
    state: Option<&'static str>,
    labels: Option<String>,
    per_page: u8,
    page: u32,
}

impl PageQuery {
    /// Appends the parameters to `path` as an encoded query string.
    fn append_to(&self, path: &str) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(state) = self.state {
            query.append_pair("state", state);
        }
        if let Some(labels) = &self.labels {
            query.append_pair("labels", labels);
        }
        query.append_pair("per_page", &self.per_page.to_string());
        query.append_pair("page", &self.page.to_string());

        format!("{}?{}", path, query.finish())
    }
}

/// Error body GitHub sends with most failure responses.
#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

#[async_trait]
impl IssueClient for GitHubClient {
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, label = %label))]
    async fn list_issues_by_label(
        &self,
        owner: &str,
        repo: &str,
        label: &str,
    ) -> Result<Vec<Issue>, Error> {
        let path = format!("/repos/{}/{}/issues", owner, repo);
        let issues: Vec<Issue> = self
            .get_all_pages("Failed to list issues by label", &path, |page, per_page| {
                PageQuery {
                    state: Some("open"),
                    labels: Some(label.to_string()),
                    per_page,
                    page,
                }
            })
            .await?;

        info!(count = issues.len(), "Listed open issues carrying label");
        Ok(issues)
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, issue = number))]
    async fn get_issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, Error> {
        let path = format!("/repos/{}/{}/issues/{}", owner, repo, number);
        self.read_json("Failed to get issue", self.client._get(path).await).await
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, issue = number))]
    async fn get_issue_timeline(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<TimelineEvent>, Error> {
        let path = format!("/repos/{}/{}/issues/{}/timeline", owner, repo, number);
        let events: Vec<TimelineEvent> = self
            .get_all_pages("Failed to get issue timeline", &path, |page, per_page| {
                PageQuery {
                    state: None,
                    labels: None,
                    per_page,
                    page,
                }
            })
            .await?;

        debug!(count = events.len(), "Retrieved issue timeline");
        Ok(events)
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, issue = number))]
    async fn close_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        reason: CloseReason,
    ) -> Result<Issue, Error> {
        let path = format!("/repos/{}/{}/issues/{}", owner, repo, number);
        let payload = models::UpdateIssueStatePayload {
            state: IssueStatus::Closed,
            state_reason: Some(reason),
        };

        let response = self.client._patch(path, Some(&payload)).await;
        let issue: Issue = self.read_json("Failed to close issue", response).await?;

        info!(reason = ?reason, "Closed issue");
        Ok(issue)
    }

    #[instrument(skip(self, body), fields(owner = %owner, repo = %repo, issue = number))]
    async fn post_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<Comment, Error> {
        let path = format!("/repos/{}/{}/issues/{}/comments", owner, repo, number);
        let payload = models::CreateCommentPayload { body };

        let response = self.client._post(path, Some(&payload)).await;
        let comment: Comment = self.read_json("Failed to post comment", response).await?;

        info!(comment_id = comment.id, "Posted comment");
        Ok(comment)
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo, issue = number, label = %label))]
    async fn remove_label(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        label: &str,
    ) -> Result<(), Error> {
        let path = format!(
            "/repos/{}/{}/issues/{}/labels/{}",
            owner,
            repo,
            number,
            encode_path_segment(label)
        );

        let response = self.client._delete(path, None::<&()>).await;
        self.read_body("Failed to remove label", response).await?;

        info!("Removed label from issue");
        Ok(())
    }
}

/// Creates an `Octocrab` client authenticated with a pre-issued token.
///
/// The token is used as-is; it is never refreshed. Octocrab's internal retry layer
/// is disabled so that callers own the retry budget.
///
/// # Arguments
///
/// * `token` - A personal access token or an Actions `GITHUB_TOKEN`.
/// * `base_uri` - Optional API root, e.g. for GitHub Enterprise Server.
///
/// # Errors
///
/// Returns `Error::AuthError` if the base URI is invalid or the client cannot be built.
#[instrument(skip(token))]
pub fn create_token_client(token: &str, base_uri: Option<&str>) -> Result<Octocrab, Error> {
    let mut builder = Octocrab::builder()
        .personal_token(token.to_string())
        .add_retry_config(RetryConfig::None);

    if let Some(uri) = base_uri {
        builder = builder.base_uri(uri).map_err(|e| {
            error!(base_uri = uri, error = %e, "Invalid GitHub API base URI");
            Error::AuthError(format!("Invalid GitHub API base URI '{}': {}", uri, e))
        })?;
    }

    builder.build().map_err(|e| {
        error!(error = ?e, "Failed to build Octocrab client with token credentials");
        Error::AuthError("Failed to build a GitHub client for the token.".to_string())
    })
}

/// Percent-encodes a single URL path segment (label names may contain spaces or `/`).
fn encode_path_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn classify_status(status: StatusCode, message: &str) -> Error {
    let message = message.to_string();
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => Error::NotFound,
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimitExceeded,
        StatusCode::FORBIDDEN if message.to_ascii_lowercase().contains("rate limit") => {
            Error::RateLimitExceeded
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::AuthError(message),
        s if s.is_server_error() => Error::ServerError {
            status: s.as_u16(),
            message,
        },
        s => Error::ApiError {
            status: s.as_u16(),
            message,
        },
    }
}

/// Extracts GitHub's error message, falling back to the status reason for
/// bodies that are not GitHub JSON.
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<GitHubErrorBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}

fn classify_octocrab_error(operation: &str, e: octocrab::Error) -> Error {
    let classified = match &e {
        octocrab::Error::GitHub { source, .. } => {
            classify_status(source.status_code, &source.message)
        }
        octocrab::Error::Serde { .. }
        | octocrab::Error::Json { .. }
        | octocrab::Error::InvalidUtf8 { .. } => Error::InvalidResponse,
        other => Error::Transport(other.to_string()),
    };

    log_octocrab_error(operation, e);
    classified
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = source;
            error!(
                error_message = err.message,
                status = err.status_code.as_u16(),
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),
        octocrab::Error::Uri { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}, Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        octocrab::Error::InvalidUtf8 { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. The message wasn't valid UTF-8.",
            message,
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}
