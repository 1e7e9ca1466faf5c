//! # Models
//!
//! This module contains the data models the GitHub client exchanges with the
//! issues REST API.
//!
//! The models only carry the fields the issue lifecycle needs. Unknown fields in
//! GitHub responses are ignored during deserialization so the models stay stable
//! when GitHub adds new properties.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Represents a GitHub user account.
///
/// # Examples
///
/// ```rust
/// use github_client::models::User;
///
/// let user = User {
///     id: 12345,
///     login: "octocat".to_string(),
///     user_type: Some("User".to_string()),
/// };
///
/// assert!(!user.is_bot());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    /// The unique numeric ID of the user
    #[serde(default)]
    pub id: u64,
    /// The login name of the user
    pub login: String,
    /// The account type reported by GitHub (`User`, `Bot`, `Organization`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
}

impl User {
    /// Returns `true` if GitHub reports this account as a bot account.
    pub fn is_bot(&self) -> bool {
        self.user_type.as_deref() == Some("Bot")
    }
}

/// Represents a label on a pull request or issue.
///
/// # Examples
///
/// ```
/// use github_client::models::Label;
///
/// let label = Label {
///     name: "info-needed".to_string(),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// The name of the label
    pub name: String,
}

/// The open/closed state of an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Open,
    Closed,
}

/// The reason recorded by GitHub when an issue is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The work described by the issue was done.
    Completed,
    /// The issue will not be acted on (duplicate, stale, missing information).
    NotPlanned,
}

/// Represents a GitHub issue.
///
/// GitHub models pull requests as issues as well; for those the `pull_request`
/// field is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// The issue number, unique within the repository
    pub number: u64,
    /// The issue title
    #[serde(default)]
    pub title: String,
    /// Whether the issue is open or closed
    pub state: IssueStatus,
    /// The labels currently applied to the issue
    #[serde(default)]
    pub labels: Vec<Label>,
    /// The account that opened the issue
    #[serde(default)]
    pub user: Option<User>,
    /// When the issue was created
    pub created_at: DateTime<Utc>,
    /// When the issue was last updated
    pub updated_at: DateTime<Utc>,
    /// Present when the issue is a pull request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    /// Returns `true` if the issue is open.
    pub fn is_open(&self) -> bool {
        self.state == IssueStatus::Open
    }

    /// Returns `true` if the issue is actually a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Returns `true` if the issue currently carries the given label.
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }

    /// Returns the names of all labels on the issue.
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.name.as_str())
    }
}

/// Represents a comment on an issue or pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// The unique ID of the comment
    pub id: u64,
    /// The comment body in markdown
    #[serde(default)]
    pub body: Option<String>,
    /// The comment author
    #[serde(default)]
    pub user: Option<User>,
    /// When the comment was created
    pub created_at: DateTime<Utc>,
}

/// One entry of an issue timeline.
///
/// Only the fields shared by the `labeled`, `unlabeled`, `commented`, `closed` and
/// `reopened` events are modelled. Other timeline entries deserialize fine but are
/// ignored by consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// The event kind, e.g. `labeled` or `commented`
    pub event: String,
    /// When the event happened. Missing for commit entries.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// The account that triggered the event
    #[serde(default)]
    pub actor: Option<User>,
    /// The comment author, only present for `commented` events
    #[serde(default)]
    pub user: Option<User>,
    /// The comment text, only present for `commented` events
    #[serde(default)]
    pub body: Option<String>,
    /// The label, only present for `labeled` and `unlabeled` events
    #[serde(default)]
    pub label: Option<Label>,
}

impl TimelineEvent {
    /// Returns the login of the account responsible for the event.
    ///
    /// Comment entries report the author in `user`; all other entries use `actor`.
    pub fn author_login(&self) -> Option<&str> {
        self.user
            .as_ref()
            .or(self.actor.as_ref())
            .map(|u| u.login.as_str())
    }
}

/// Payload for posting a new issue comment.
#[derive(Debug, Clone, Serialize)]
pub struct CreateCommentPayload<'a> {
    pub body: &'a str,
}

/// Payload for updating the state of an issue.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateIssueStatePayload {
    pub state: IssueStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<CloseReason>,
}
