//! Event intake.
//!
//! Turns the event name and webhook payload handed to the process by the CI runner
//! into a typed [`Event`]. Intake has no side effects; anything it cannot interpret
//! is either ignored (unrelated events) or rejected with a [`MalformedEventError`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::{errors::MalformedEventError, identifiers::IssueNumber};

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;

/// An event the lifecycle manager reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A cron tick or manual dispatch: evaluate every tracked issue.
    ScheduledTick { at: DateTime<Utc> },
    IssueLabeled {
        issue: IssueNumber,
        label: String,
        at: DateTime<Utc>,
    },
    PullRequestLabeled {
        pull_request: IssueNumber,
        label: String,
        at: DateTime<Utc>,
    },
    CommentCreated {
        issue: IssueNumber,
        author: String,
        at: DateTime<Utc>,
    },
    /// An event or action the lifecycle manager does not handle.
    Ignored {
        event: String,
        action: Option<String>,
    },
}

impl Event {
    /// The issue or pull request the event targets, if any.
    pub fn target(&self) -> Option<IssueNumber> {
        match self {
            Event::IssueLabeled { issue, .. } | Event::CommentCreated { issue, .. } => Some(*issue),
            Event::PullRequestLabeled { pull_request, .. } => Some(*pull_request),
            Event::ScheduledTick { .. } | Event::Ignored { .. } => None,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ScheduledTick { .. } => "scheduled-tick",
            Event::IssueLabeled { .. } => "issue-labeled",
            Event::PullRequestLabeled { .. } => "pr-labeled",
            Event::CommentCreated { .. } => "comment-created",
            Event::Ignored { .. } => "ignored",
        }
    }
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    issue: Option<IssuePayload>,
    #[serde(default)]
    pull_request: Option<IssuePayload>,
    #[serde(default)]
    label: Option<NamedPayload>,
    #[serde(default)]
    comment: Option<CommentPayload>,
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct NamedPayload {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentPayload {
    #[serde(default)]
    user: Option<LoginPayload>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    #[serde(default)]
    login: Option<String>,
}

/// Parses an event.
///
/// `event_name` follows the `GITHUB_EVENT_NAME` vocabulary. `payload` is the raw
/// webhook JSON, which scheduled ticks do not need. Timestamps missing from the
/// payload default to `now`.
///
/// # Errors
///
/// Returns a [`MalformedEventError`] if a handled event has no payload, the payload
/// is not JSON, or a required field (issue number, label name, comment author) is
/// absent.
pub fn parse_event(
    event_name: &str,
    payload: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Event, MalformedEventError> {
    let expected_action = match event_name {
        "schedule" | "workflow_dispatch" => return Ok(Event::ScheduledTick { at: now }),
        "issues" | "pull_request" | "pull_request_target" => "labeled",
        "issue_comment" => "created",
        _ => {
            debug!(event = event_name, "Ignoring unhandled event");
            return Ok(Event::Ignored {
                event: event_name.to_string(),
                action: None,
            });
        }
    };

    let raw = payload.ok_or_else(|| MalformedEventError::MissingPayload {
        event: event_name.to_string(),
    })?;
    let payload: WebhookPayload = serde_json::from_str(raw)?;

    let missing = |field: &'static str| MalformedEventError::MissingField {
        event: event_name.to_string(),
        field,
    };

    let action = payload.action.clone().ok_or_else(|| missing("action"))?;
    if action != expected_action {
        debug!(event = event_name, action = %action, "Ignoring unhandled action");
        return Ok(Event::Ignored {
            event: event_name.to_string(),
            action: Some(action),
        });
    }

    let event = match event_name {
        "issues" => {
            let issue = payload.issue.as_ref().ok_or_else(|| missing("issue"))?;
            Event::IssueLabeled {
                issue: issue.number.ok_or_else(|| missing("issue.number"))?.into(),
                label: label_name(&payload).ok_or_else(|| missing("label.name"))?,
                at: issue.updated_at.unwrap_or(now),
            }
        }
        "issue_comment" => {
            let issue = payload.issue.as_ref().ok_or_else(|| missing("issue"))?;
            let comment = payload.comment.as_ref().ok_or_else(|| missing("comment"))?;
            Event::CommentCreated {
                issue: issue.number.ok_or_else(|| missing("issue.number"))?.into(),
                author: comment
                    .user
                    .as_ref()
                    .and_then(|u| u.login.clone())
                    .ok_or_else(|| missing("comment.user.login"))?,
                at: comment.created_at.unwrap_or(now),
            }
        }
        _ => {
            let pull_request = payload.pull_request.as_ref();
            let number = pull_request
                .and_then(|pr| pr.number)
                .or(payload.number)
                .ok_or_else(|| missing("pull_request.number"))?;
            Event::PullRequestLabeled {
                pull_request: number.into(),
                label: label_name(&payload).ok_or_else(|| missing("label.name"))?,
                at: pull_request.and_then(|pr| pr.updated_at).unwrap_or(now),
            }
        }
    };

    Ok(event)
}

fn label_name(payload: &WebhookPayload) -> Option<String> {
    payload
        .label
        .as_ref()
        .and_then(|l| l.name.clone())
        .filter(|name| !name.is_empty())
}
