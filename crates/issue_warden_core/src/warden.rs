//! Batch runner.
//!
//! A [`Warden`] drives one invocation: it turns an event into the set of issues to
//! look at, rebuilds their state, evaluates the policies and executes the
//! resulting decisions. Issues are processed one at a time and a failure on one
//! issue never stops the others; everything that went wrong ends up in the
//! [`RunReport`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use github_client::{Issue, IssueClient};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    configuration::Configuration,
    errors::PlatformApiError,
    evaluator::{Decision, PolicyEvaluator},
    executor::{ActionExecutor, ExecutionOutcome},
    identifiers::{IssueNumber, RepositoryRef, RunId},
    intake::{parse_event, Event},
    retry::call_with_retry,
    state::IssueState,
};

#[cfg(test)]
#[path = "warden_tests.rs"]
mod tests;

/// What a failure was about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureTarget {
    /// Processing of a single issue failed.
    Issue(IssueNumber),
    /// Listing the open issues for a policy label failed.
    LabelListing(String),
}

impl std::fmt::Display for FailureTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureTarget::Issue(number) => write!(f, "issue {}", number),
            FailureTarget::LabelListing(label) => {
                write!(f, "listing issues labeled '{}'", label)
            }
        }
    }
}

/// A platform failure that survived the retry budget.
#[derive(Debug)]
pub struct RunFailure {
    pub target: FailureTarget,
    pub error: PlatformApiError,
}

/// Summary of one invocation.
#[derive(Debug)]
pub struct RunReport {
    /// Correlates the report with the run's log output
    pub run_id: RunId,

    /// Number of issues whose policies were evaluated
    pub evaluated: usize,

    /// Issues closed during the run
    pub closed: Vec<IssueNumber>,

    /// Issues that had a policy label removed
    pub labels_removed: Vec<IssueNumber>,

    /// Evaluated issues that needed no change
    pub skipped: usize,

    /// Events that could not be interpreted
    pub malformed_events: usize,

    /// Platform failures, in the order they happened
    pub failures: Vec<RunFailure>,
}

impl RunReport {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            evaluated: 0,
            closed: Vec::new(),
            labels_removed: Vec::new(),
            skipped: 0,
            malformed_events: 0,
            failures: Vec::new(),
        }
    }

    /// Returns `true` if every event was understood and every platform call succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.malformed_events == 0
    }
}

/// Runs the issue lifecycle for one repository.
pub struct Warden<'a, C: IssueClient + ?Sized> {
    client: &'a C,
    repository: &'a RepositoryRef,
    config: &'a Configuration,
    run_id: RunId,
}

impl<'a, C: IssueClient + ?Sized> Warden<'a, C> {
    pub fn new(client: &'a C, repository: &'a RepositoryRef, config: &'a Configuration) -> Self {
        Self {
            client,
            repository,
            config,
            run_id: RunId::new_random(),
        }
    }

    /// Uses a caller supplied run identifier instead of a random one.
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Parses a raw event and runs it.
    ///
    /// A malformed event is logged and counted in the report instead of aborting
    /// the process.
    pub async fn handle(
        &self,
        event_name: &str,
        payload: Option<&str>,
        now: DateTime<Utc>,
    ) -> RunReport {
        match parse_event(event_name, payload, now) {
            Ok(event) => self.run(&event).await,
            Err(e) => {
                error!(
                    run_id = %self.run_id,
                    event = event_name,
                    error = %e,
                    "Discarding malformed event"
                );
                let mut report = RunReport::new(self.run_id);
                report.malformed_events = 1;
                report
            }
        }
    }

    /// Runs the lifecycle for one event.
    #[instrument(
        skip(self, event),
        fields(
            run_id = %self.run_id,
            repository = %self.repository,
            event = event.kind(),
            issue = event.target().map(|issue| issue.as_u64())
        )
    )]
    pub async fn run(&self, event: &Event) -> RunReport {
        let mut report = RunReport::new(self.run_id);

        match event {
            Event::ScheduledTick { at } => self.run_tick(event, *at, &mut report).await,
            Event::IssueLabeled { issue, label, at }
            | Event::PullRequestLabeled {
                pull_request: issue,
                label,
                at,
            } => {
                if self.config.policies().manages(label) {
                    info!(
                        issue = %issue,
                        label = label.as_str(),
                        applied_at = %at,
                        "Policy label applied, staleness clock started"
                    );
                    report.evaluated += 1;
                    report.skipped += 1;
                } else {
                    debug!(issue = %issue, label = label.as_str(), "Label is not policy-managed");
                }
            }
            Event::CommentCreated { issue, at, .. } => {
                self.run_single(event, *issue, *at, &mut report).await
            }
            Event::Ignored { event: name, action } => {
                info!(
                    event = name.as_str(),
                    action = ?action,
                    "Event does not concern the issue lifecycle"
                );
            }
        }

        info!(
            evaluated = report.evaluated,
            closed = report.closed.len(),
            labels_removed = report.labels_removed.len(),
            skipped = report.skipped,
            failures = report.failures.len(),
            "Run complete"
        );

        report
    }

    async fn run_tick(&self, event: &Event, now: DateTime<Utc>, report: &mut RunReport) {
        let mut issues: BTreeMap<u64, Issue> = BTreeMap::new();
        for label in self.config.policies().labels() {
            let listed = call_with_retry(self.config.retry(), "list issues by label", || {
                self.client
                    .list_issues_by_label(self.repository.owner(), self.repository.name(), label)
            })
            .await;

            match listed {
                Ok(found) => {
                    debug!(label, count = found.len(), "Listed open issues for label");
                    for issue in found.into_iter().filter(Issue::is_open) {
                        issues.entry(issue.number).or_insert(issue);
                    }
                }
                Err(e) => {
                    warn!(label, error = %e, "Failed to list issues for label");
                    report.failures.push(RunFailure {
                        target: FailureTarget::LabelListing(label.to_string()),
                        error: e,
                    });
                }
            }
        }

        info!(count = issues.len(), "Evaluating tracked issues");
        for issue in issues.values() {
            self.process_issue(event, issue, now, report).await;
        }
    }

    async fn run_single(
        &self,
        event: &Event,
        number: IssueNumber,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) {
        let fetched = call_with_retry(self.config.retry(), "get issue", || {
            self.client
                .get_issue(self.repository.owner(), self.repository.name(), number.as_u64())
        })
        .await;

        match fetched {
            Ok(issue) => {
                let managed = issue
                    .label_names()
                    .any(|label| self.config.policies().manages(label));
                if !issue.is_open() || !managed {
                    debug!(issue = %number, "Issue is closed or carries no policy label");
                    return;
                }
                self.process_issue(event, &issue, now, report).await;
            }
            Err(e) => self.record_failure(report, number, e),
        }
    }

    async fn process_issue(
        &self,
        event: &Event,
        issue: &Issue,
        now: DateTime<Utc>,
        report: &mut RunReport,
    ) {
        let number = IssueNumber::new(issue.number);
        report.evaluated += 1;

        let timeline = call_with_retry(self.config.retry(), "get issue timeline", || {
            self.client
                .get_issue_timeline(self.repository.owner(), self.repository.name(), issue.number)
        })
        .await;
        let timeline = match timeline {
            Ok(timeline) => timeline,
            Err(e) => return self.record_failure(report, number, e),
        };

        let state = IssueState::from_timeline(issue, &timeline, self.config);
        let decision = PolicyEvaluator::new(self.config).evaluate(event, &state, now);
        if decision == Decision::NoAction {
            report.skipped += 1;
            return;
        }

        info!(issue = %number, decision = ?decision, "Policy requires action");
        let executor = ActionExecutor::new(self.client, self.repository, self.config);
        match executor.execute(&state, &decision).await {
            Ok(ExecutionOutcome::Closed) => report.closed.push(number),
            Ok(ExecutionOutcome::LabelRemoved) => report.labels_removed.push(number),
            Ok(ExecutionOutcome::NoAction(reason)) => {
                debug!(issue = %number, reason = ?reason, "Decision required no change");
                report.skipped += 1;
            }
            Err(e) => self.record_failure(report, number, e),
        }
    }

    fn record_failure(&self, report: &mut RunReport, number: IssueNumber, error: PlatformApiError) {
        error!(issue = %number, error = %error, "Failed to process issue");
        report.failures.push(RunFailure {
            target: FailureTarget::Issue(number),
            error,
        });
    }
}
