//! Per-issue lifecycle state.
//!
//! Runs are stateless, so the state of an issue is rebuilt on every invocation
//! from the issue itself and its timeline. The only way to change an
//! [`IssueState`] is to [`apply`](IssueState::apply) an [`IssueEvent`].

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use github_client::{Issue, TimelineEvent};
use tracing::trace;

use crate::{configuration::Configuration, identifiers::IssueNumber};

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

/// A change to an issue that matters for its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueEvent {
    Labeled { label: String, at: DateTime<Utc> },
    Unlabeled { label: String, at: DateTime<Utc> },
    Commented {
        author: String,
        body: Option<String>,
        at: DateTime<Utc>,
    },
    Closed { at: DateTime<Utc> },
    Reopened { at: DateTime<Utc> },
}

impl IssueEvent {
    /// Converts a timeline entry. Entries that do not affect the lifecycle, or that
    /// lack the fields needed to interpret them, yield `None`.
    pub fn from_timeline(entry: &TimelineEvent) -> Option<Self> {
        let at = entry.created_at?;
        match entry.event.as_str() {
            "labeled" => Some(Self::Labeled {
                label: entry.label.as_ref()?.name.clone(),
                at,
            }),
            "unlabeled" => Some(Self::Unlabeled {
                label: entry.label.as_ref()?.name.clone(),
                at,
            }),
            "commented" => Some(Self::Commented {
                author: entry.author_login()?.to_string(),
                body: entry.body.clone(),
                at,
            }),
            "closed" => Some(Self::Closed { at }),
            "reopened" => Some(Self::Reopened { at }),
            _ => None,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Labeled { at, .. }
            | Self::Unlabeled { at, .. }
            | Self::Commented { at, .. }
            | Self::Closed { at }
            | Self::Reopened { at } => *at,
        }
    }
}

/// What the warden knows about one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueState {
    number: IssueNumber,
    labels: BTreeSet<String>,
    label_applied_at: HashMap<String, DateTime<Utc>>,
    last_comment_at: Option<DateTime<Utc>>,
    automation_comments: Vec<(DateTime<Utc>, String)>,
    is_open: bool,
}

impl IssueState {
    /// An open issue without labels or history.
    pub fn new(number: IssueNumber) -> Self {
        Self {
            number,
            labels: BTreeSet::new(),
            label_applied_at: HashMap::new(),
            last_comment_at: None,
            automation_comments: Vec::new(),
            is_open: true,
        }
    }

    /// Rebuilds the state from the current issue and its timeline.
    ///
    /// The timeline is replayed in chronological order. The current label set and
    /// open flag of `issue` win over the replay, so an incomplete timeline can
    /// never resurrect a removed label. A label that is present but has no
    /// `labeled` entry ends up without an applied timestamp.
    pub fn from_timeline(
        issue: &Issue,
        timeline: &[TimelineEvent],
        config: &Configuration,
    ) -> Self {
        let mut events: Vec<IssueEvent> = timeline
            .iter()
            .filter_map(IssueEvent::from_timeline)
            .collect();
        events.sort_by_key(IssueEvent::at);

        let mut state = Self::new(IssueNumber::new(issue.number));
        for event in &events {
            state.apply(event, config);
        }

        state.labels = issue.label_names().map(str::to_string).collect();
        let labels = &state.labels;
        state.label_applied_at.retain(|label, _| labels.contains(label));
        state.is_open = issue.is_open();

        trace!(
            issue = %state.number,
            replayed = events.len(),
            labels = ?state.labels,
            "Rebuilt issue state from timeline"
        );

        state
    }

    /// Applies one event.
    ///
    /// Comments by the automation identity never count as activity; they are only
    /// remembered so a policy message is not posted twice. Re-applying a label
    /// moves its applied timestamp forward.
    pub fn apply(&mut self, event: &IssueEvent, config: &Configuration) {
        match event {
            IssueEvent::Labeled { label, at } => {
                self.labels.insert(label.clone());
                self.label_applied_at.insert(label.clone(), *at);
            }
            IssueEvent::Unlabeled { label, .. } => {
                self.labels.remove(label);
                self.label_applied_at.remove(label);
            }
            IssueEvent::Commented { author, body, at } => {
                if config.is_automation(author) {
                    if let Some(body) = body {
                        self.automation_comments.push((*at, body.clone()));
                    }
                    return;
                }
                if self.last_comment_at.map_or(true, |last| *at > last) {
                    self.last_comment_at = Some(*at);
                }
            }
            IssueEvent::Closed { .. } => self.is_open = false,
            IssueEvent::Reopened { .. } => self.is_open = true,
        }
    }

    pub fn number(&self) -> IssueNumber {
        self.number
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// When the label was last applied, if known.
    pub fn label_applied_at(&self, label: &str) -> Option<DateTime<Utc>> {
        self.label_applied_at.get(label).copied()
    }

    /// Time of the latest comment that counts as activity.
    pub fn last_comment_at(&self) -> Option<DateTime<Utc>> {
        self.last_comment_at
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// The instant the staleness clock for `label` started: the later of the
    /// label's applied time and the latest qualifying comment.
    pub fn staleness_baseline(&self, label: &str) -> Option<DateTime<Utc>> {
        let applied_at = self.label_applied_at(label)?;
        Some(match self.last_comment_at {
            Some(commented_at) if commented_at > applied_at => commented_at,
            _ => applied_at,
        })
    }

    /// Returns `true` if the automation identity posted `body` after `since`.
    pub fn automation_posted_since(&self, body: &str, since: DateTime<Utc>) -> bool {
        self.automation_comments
            .iter()
            .any(|(at, posted)| *at >= since && posted.trim() == body.trim())
    }

    /// Returns `true` if `message` was already posted since the staleness clock
    /// for `label` started. Only the close or label removal is left to do then.
    pub fn message_posted(&self, label: &str, message: &str) -> bool {
        self.staleness_baseline(label)
            .is_some_and(|since| self.automation_posted_since(message, since))
    }
}
