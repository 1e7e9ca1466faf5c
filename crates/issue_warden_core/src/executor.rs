//! Action execution.
//!
//! The [`ActionExecutor`] carries out a [`Decision`] against the platform. It
//! re-reads the issue before mutating anything, which makes repeated execution of
//! the same decision a no-op. A policy message already posted since the staleness
//! clock started is not posted again, so a run that failed between commenting and
//! closing only closes on the next attempt.

use chrono::{DateTime, Utc};
use github_client::{CloseReason, IssueClient};
use tracing::{info, instrument};

use crate::{
    configuration::Configuration,
    errors::PlatformApiError,
    evaluator::Decision,
    identifiers::{IssueNumber, RepositoryRef},
    retry::{call_with_retry, call_with_retry_checked},
    state::{IssueEvent, IssueState},
};

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

/// Why an executed decision did not change anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoActionReason {
    /// The decision was [`Decision::NoAction`].
    NothingToDo,
    /// The issue was already closed.
    AlreadyClosed,
    /// The label the decision is about is no longer on the issue.
    LabelAbsent,
    /// Dry run; the decision was only logged.
    DryRun,
}

/// Result of executing one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Closed,
    LabelRemoved,
    NoAction(NoActionReason),
}

/// Executes decisions for issues of one repository.
pub struct ActionExecutor<'a, C: IssueClient + ?Sized> {
    client: &'a C,
    repository: &'a RepositoryRef,
    config: &'a Configuration,
}

impl<'a, C: IssueClient + ?Sized> ActionExecutor<'a, C> {
    pub fn new(client: &'a C, repository: &'a RepositoryRef, config: &'a Configuration) -> Self {
        Self {
            client,
            repository,
            config,
        }
    }

    /// Executes `decision` for the issue described by `state`.
    ///
    /// Every platform call goes through the configured timeout and retry policy.
    ///
    /// # Errors
    ///
    /// Returns a [`PlatformApiError`] if a call still fails after retrying. A
    /// comment may already have been posted when closing fails.
    #[instrument(
        skip(self, state, decision),
        fields(repository = %self.repository, issue = %state.number())
    )]
    pub async fn execute(
        &self,
        state: &IssueState,
        decision: &Decision,
    ) -> Result<ExecutionOutcome, PlatformApiError> {
        match decision {
            Decision::NoAction => Ok(ExecutionOutcome::NoAction(NoActionReason::NothingToDo)),
            Decision::CloseWithMessage {
                label,
                message,
                reason,
            } => self.close(state, label, message, *reason).await,
            Decision::RemoveLabel { label, message } => {
                self.remove_label(state, label, message.as_deref()).await
            }
        }
    }

    async fn close(
        &self,
        state: &IssueState,
        label: &str,
        message: &str,
        reason: CloseReason,
    ) -> Result<ExecutionOutcome, PlatformApiError> {
        let issue = state.number();
        if let Some(skip) = self.precondition(issue, label).await? {
            return Ok(ExecutionOutcome::NoAction(skip));
        }

        if self.config.is_dry_run() {
            info!(label, "Dry run: would comment and close issue");
            return Ok(ExecutionOutcome::NoAction(NoActionReason::DryRun));
        }

        self.post_message(state, label, message).await?;

        let policy = self.config.retry();
        call_with_retry(policy, "close issue", || {
            self.client.close_issue(
                self.repository.owner(),
                self.repository.name(),
                issue.as_u64(),
                reason,
            )
        })
        .await?;

        info!(label, reason = ?reason, "Closed stale issue");
        Ok(ExecutionOutcome::Closed)
    }

    async fn remove_label(
        &self,
        state: &IssueState,
        label: &str,
        message: Option<&str>,
    ) -> Result<ExecutionOutcome, PlatformApiError> {
        let issue = state.number();
        if let Some(skip) = self.precondition(issue, label).await? {
            return Ok(ExecutionOutcome::NoAction(skip));
        }

        if self.config.is_dry_run() {
            info!(label, "Dry run: would remove label");
            return Ok(ExecutionOutcome::NoAction(NoActionReason::DryRun));
        }

        if let Some(message) = message {
            self.post_message(state, label, message).await?;
        }

        let policy = self.config.retry();
        let removed = call_with_retry(policy, "remove label", || {
            self.client.remove_label(
                self.repository.owner(),
                self.repository.name(),
                issue.as_u64(),
                label,
            )
        })
        .await;

        match removed {
            Ok(()) => {
                info!(label, "Removed label");
                Ok(ExecutionOutcome::LabelRemoved)
            }
            Err(e) if e.is_not_found() => {
                info!(label, "Label was removed concurrently");
                Ok(ExecutionOutcome::NoAction(NoActionReason::LabelAbsent))
            }
            Err(e) => Err(e),
        }
    }

    /// Re-reads the issue and reports why acting on it would be pointless, if so.
    async fn precondition(
        &self,
        issue: IssueNumber,
        label: &str,
    ) -> Result<Option<NoActionReason>, PlatformApiError> {
        let current = call_with_retry(self.config.retry(), "get issue", || {
            self.client
                .get_issue(self.repository.owner(), self.repository.name(), issue.as_u64())
        })
        .await?;

        if !current.is_open() {
            info!("Issue is already closed, nothing to do");
            return Ok(Some(NoActionReason::AlreadyClosed));
        }
        if !current.has_label(label) {
            info!(label, "Label is no longer on the issue, nothing to do");
            return Ok(Some(NoActionReason::LabelAbsent));
        }

        Ok(None)
    }

    /// Posts the policy message unless it is already on the issue.
    async fn post_message(
        &self,
        state: &IssueState,
        label: &str,
        body: &str,
    ) -> Result<(), PlatformApiError> {
        if state.message_posted(label, body) {
            info!(label, "Policy message was posted by an earlier run, not repeating it");
            return Ok(());
        }

        let issue = state.number();
        let since = state.staleness_baseline(label);
        call_with_retry_checked(
            self.config.retry(),
            "post comment",
            || {
                self.client.post_comment(
                    self.repository.owner(),
                    self.repository.name(),
                    issue.as_u64(),
                    body,
                )
            },
            || self.comment_landed(issue, body, since),
        )
        .await?;
        Ok(())
    }

    /// Re-reads the timeline to see whether a timed out comment was posted anyway.
    async fn comment_landed(
        &self,
        issue: IssueNumber,
        body: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<bool, PlatformApiError> {
        let Some(since) = since else {
            return Ok(false);
        };

        let timeline = call_with_retry(self.config.retry(), "get issue timeline", || {
            self.client
                .get_issue_timeline(self.repository.owner(), self.repository.name(), issue.as_u64())
        })
        .await?;

        let mut latest = IssueState::new(issue);
        for event in timeline.iter().filter_map(IssueEvent::from_timeline) {
            latest.apply(&event, self.config);
        }
        Ok(latest.automation_posted_since(body, since))
    }
}
