//! Policy evaluation.
//!
//! The evaluator is a pure function of the run configuration, the rebuilt
//! [`IssueState`] and the current time. It never talks to the platform.

use chrono::{DateTime, Duration, Utc};
use github_client::CloseReason;
use tracing::{debug, warn};

use crate::{
    configuration::Configuration,
    intake::Event,
    policy::{LabelPolicy, PolicyAction},
    state::IssueState,
};

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;

/// What should happen to an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NoAction,
    /// Post `message` and close the issue.
    CloseWithMessage {
        label: String,
        message: String,
        reason: CloseReason,
    },
    /// Remove `label`, posting `message` first when present.
    RemoveLabel {
        label: String,
        message: Option<String>,
    },
}

impl Decision {
    /// Returns `true` unless the decision is [`Decision::NoAction`].
    pub fn requires_action(&self) -> bool {
        !matches!(self, Decision::NoAction)
    }

    fn for_stale(policy: &LabelPolicy) -> Self {
        match policy.action() {
            PolicyAction::Close => Decision::CloseWithMessage {
                label: policy.label().to_string(),
                message: policy.message().unwrap_or_default().to_string(),
                reason: policy.close_reason(),
            },
            PolicyAction::RemoveLabel => Decision::RemoveLabel {
                label: policy.label().to_string(),
                message: policy.message().map(str::to_string),
            },
        }
    }
}

/// Applies the configured label policies to issue states.
#[derive(Debug, Clone, Copy)]
pub struct PolicyEvaluator<'a> {
    config: &'a Configuration,
}

impl<'a> PolicyEvaluator<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Decides what to do with `state` in response to `event`.
    pub fn evaluate(&self, event: &Event, state: &IssueState, now: DateTime<Utc>) -> Decision {
        match event {
            Event::ScheduledTick { .. } => self.evaluate_tick(state, now),
            Event::CommentCreated { author, .. } => self.evaluate_comment(author, state),
            Event::IssueLabeled { .. } | Event::PullRequestLabeled { .. } | Event::Ignored { .. } => {
                Decision::NoAction
            }
        }
    }

    /// Checks every managed label on the issue for staleness.
    ///
    /// When several policies apply, the one with the smallest remaining delay
    /// governs. Ties go to the label that sorts first.
    pub fn evaluate_tick(&self, state: &IssueState, now: DateTime<Utc>) -> Decision {
        if !state.is_open() {
            return Decision::NoAction;
        }

        let mut governing: Option<(&LabelPolicy, Duration)> = None;
        for policy in self.config.policies().iter() {
            if !state.has_label(policy.label()) {
                continue;
            }

            let Some(remaining) = self.remaining(state, policy, now) else {
                warn!(
                    issue = %state.number(),
                    label = policy.label(),
                    "Managed label has no recorded applied time, leaving issue alone"
                );
                continue;
            };

            if governing.map_or(true, |(_, current)| remaining < current) {
                governing = Some((policy, remaining));
            }
        }

        match governing {
            Some((policy, remaining)) if remaining <= Duration::zero() => {
                debug!(
                    issue = %state.number(),
                    label = policy.label(),
                    overdue_seconds = -remaining.num_seconds(),
                    "Label policy delay has elapsed"
                );
                Decision::for_stale(policy)
            }
            Some((policy, remaining)) => {
                debug!(
                    issue = %state.number(),
                    label = policy.label(),
                    remaining_seconds = remaining.num_seconds(),
                    "Label policy delay has not elapsed yet"
                );
                Decision::NoAction
            }
            None => Decision::NoAction,
        }
    }

    /// Handles a new comment.
    ///
    /// A comment always resets the staleness clock through the rebuilt state. It
    /// additionally removes a managed label whose policy asks for that, choosing the
    /// policy with the shortest delay if several do.
    pub fn evaluate_comment(&self, author: &str, state: &IssueState) -> Decision {
        if self.config.is_automation(author) {
            debug!(issue = %state.number(), author, "Ignoring comment by automation identity");
            return Decision::NoAction;
        }
        if !state.is_open() {
            return Decision::NoAction;
        }

        self.config
            .policies()
            .iter()
            .filter(|policy| policy.remove_label_on_activity() && state.has_label(policy.label()))
            .min_by_key(|policy| policy.delay())
            .map(|policy| Decision::RemoveLabel {
                label: policy.label().to_string(),
                message: None,
            })
            .unwrap_or(Decision::NoAction)
    }

    /// Time left before `policy` fires for `state`. Negative once overdue, `None`
    /// when the label's applied time is unknown.
    pub fn remaining(
        &self,
        state: &IssueState,
        policy: &LabelPolicy,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let baseline = state.staleness_baseline(policy.label())?;
        Some(baseline + policy.delay().as_duration() - now)
    }
}
