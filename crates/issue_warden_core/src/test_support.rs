//! Shared fixtures for the unit tests of this crate.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use github_client::{
    CloseReason, Comment, Error, Issue, IssueClient, IssueStatus, Label, TimelineEvent, User,
};

use crate::{configuration::Configuration, identifiers::RepositoryRef, policy::PolicySet};

pub const AUTOMATION_LOGIN: &str = "github-actions[bot]";

pub const POLICY_BLOB: &str = r#"{
    "info-needed": {
        "delay": "P14D",
        "message": "Closing due to missing information."
    }
}"#;

/// Midnight UTC on day `day` of the test calendar.
pub fn day(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
}

pub fn config(policy_blob: &str) -> Configuration {
    Configuration::new(PolicySet::from_json(policy_blob).unwrap())
}

pub fn repository() -> RepositoryRef {
    RepositoryRef::new("octo-org", "octo-repo").unwrap()
}

pub fn user(login: &str) -> User {
    User {
        id: 1,
        login: login.to_string(),
        user_type: None,
    }
}

pub fn open_issue(number: u64, labels: &[&str]) -> Issue {
    Issue {
        number,
        title: format!("Issue {}", number),
        state: IssueStatus::Open,
        labels: labels
            .iter()
            .map(|name| Label {
                name: name.to_string(),
            })
            .collect(),
        user: Some(user("reporter")),
        created_at: day(0),
        updated_at: day(0),
        pull_request: None,
    }
}

pub fn closed_issue(number: u64, labels: &[&str]) -> Issue {
    Issue {
        state: IssueStatus::Closed,
        ..open_issue(number, labels)
    }
}

pub fn labeled(label: &str, at: DateTime<Utc>) -> TimelineEvent {
    TimelineEvent {
        event: "labeled".to_string(),
        created_at: Some(at),
        actor: Some(user("maintainer")),
        user: None,
        body: None,
        label: Some(Label {
            name: label.to_string(),
        }),
    }
}

pub fn unlabeled(label: &str, at: DateTime<Utc>) -> TimelineEvent {
    TimelineEvent {
        event: "unlabeled".to_string(),
        ..labeled(label, at)
    }
}

pub fn commented(author: &str, at: DateTime<Utc>) -> TimelineEvent {
    commented_with(author, "Any update on this?", at)
}

pub fn commented_with(author: &str, body: &str, at: DateTime<Utc>) -> TimelineEvent {
    TimelineEvent {
        event: "commented".to_string(),
        created_at: Some(at),
        actor: Some(user(author)),
        user: Some(user(author)),
        body: Some(body.to_string()),
        label: None,
    }
}

pub fn timeline_entry(event: &str, at: DateTime<Utc>) -> TimelineEvent {
    TimelineEvent {
        event: event.to_string(),
        created_at: Some(at),
        actor: Some(user("maintainer")),
        user: None,
        body: None,
        label: None,
    }
}

#[derive(Debug, Default)]
struct MockState {
    issues: BTreeMap<u64, Issue>,
    timelines: HashMap<u64, Vec<TimelineEvent>>,
    close_failures: HashMap<u64, u32>,
    comment_failures: HashMap<u64, u32>,
    comment_timeouts: HashMap<u64, u32>,
    failing_listings: HashSet<String>,
    comments: Vec<(u64, String)>,
    closed: Vec<(u64, CloseReason)>,
    removed_labels: Vec<(u64, String)>,
    close_attempts: HashMap<u64, u32>,
    list_calls: u32,
}

/// In-memory stand-in for the GitHub issues API.
///
/// Mutations are applied to the stored issues, so a second run against the same
/// mock observes the effects of the first.
#[derive(Debug, Default)]
pub struct MockIssueClient {
    state: Mutex<MockState>,
}

impl MockIssueClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(self, issue: Issue, timeline: Vec<TimelineEvent>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.timelines.insert(issue.number, timeline);
            state.issues.insert(issue.number, issue);
        }
        self
    }

    /// The next `failures` close calls for the issue fail with a 502.
    pub fn with_close_failures(self, number: u64, failures: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .close_failures
            .insert(number, failures);
        self
    }

    /// The next `failures` comment calls for the issue fail with a 502.
    pub fn with_comment_failures(self, number: u64, failures: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .comment_failures
            .insert(number, failures);
        self
    }

    /// The next `timeouts` comment calls for the issue post the comment but never answer.
    pub fn with_comment_timeouts(self, number: u64, timeouts: u32) -> Self {
        self.state
            .lock()
            .unwrap()
            .comment_timeouts
            .insert(number, timeouts);
        self
    }

    /// Listing issues by this label always fails.
    pub fn with_failing_listing(self, label: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_listings
            .insert(label.to_string());
        self
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().comments.clone()
    }

    pub fn closed(&self) -> Vec<u64> {
        self.state
            .lock()
            .unwrap()
            .closed
            .iter()
            .map(|(number, _)| *number)
            .collect()
    }

    pub fn close_reasons(&self) -> Vec<CloseReason> {
        self.state
            .lock()
            .unwrap()
            .closed
            .iter()
            .map(|(_, reason)| *reason)
            .collect()
    }

    pub fn removed_labels(&self) -> Vec<(u64, String)> {
        self.state.lock().unwrap().removed_labels.clone()
    }

    pub fn close_attempts(&self, number: u64) -> u32 {
        self.state
            .lock()
            .unwrap()
            .close_attempts
            .get(&number)
            .copied()
            .unwrap_or_default()
    }

    pub fn list_calls(&self) -> u32 {
        self.state.lock().unwrap().list_calls
    }

    /// Number of mutating calls seen so far.
    pub fn mutation_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.comments.len() + state.closed.len() + state.removed_labels.len()
    }
}

fn bad_gateway() -> Error {
    Error::ServerError {
        status: 502,
        message: "Bad Gateway".to_string(),
    }
}

fn consume_failure(failures: &mut HashMap<u64, u32>, number: u64) -> bool {
    match failures.get_mut(&number) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

#[async_trait]
impl IssueClient for MockIssueClient {
    async fn list_issues_by_label(
        &self,
        _owner: &str,
        _repo: &str,
        label: &str,
    ) -> Result<Vec<Issue>, Error> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.failing_listings.contains(label) {
            return Err(bad_gateway());
        }

        Ok(state
            .issues
            .values()
            .filter(|issue| issue.is_open() && issue.has_label(label))
            .cloned()
            .collect())
    }

    async fn get_issue(&self, _owner: &str, _repo: &str, number: u64) -> Result<Issue, Error> {
        let state = self.state.lock().unwrap();
        state.issues.get(&number).cloned().ok_or(Error::NotFound)
    }

    async fn get_issue_timeline(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
    ) -> Result<Vec<TimelineEvent>, Error> {
        let state = self.state.lock().unwrap();
        if !state.issues.contains_key(&number) {
            return Err(Error::NotFound);
        }
        Ok(state.timelines.get(&number).cloned().unwrap_or_default())
    }

    async fn close_issue(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        reason: CloseReason,
    ) -> Result<Issue, Error> {
        let mut state = self.state.lock().unwrap();
        *state.close_attempts.entry(number).or_default() += 1;
        if consume_failure(&mut state.close_failures, number) {
            return Err(bad_gateway());
        }

        let issue = state.issues.get_mut(&number).ok_or(Error::NotFound)?;
        issue.state = IssueStatus::Closed;
        let issue = issue.clone();
        state.closed.push((number, reason));
        Ok(issue)
    }

    async fn post_comment(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        body: &str,
    ) -> Result<Comment, Error> {
        let (comment, hang) = {
            let mut state = self.state.lock().unwrap();
            if consume_failure(&mut state.comment_failures, number) {
                return Err(bad_gateway());
            }
            if !state.issues.contains_key(&number) {
                return Err(Error::NotFound);
            }

            let created_at = Utc::now();
            state.comments.push((number, body.to_string()));
            state
                .timelines
                .entry(number)
                .or_default()
                .push(commented_with(AUTOMATION_LOGIN, body, created_at));

            let comment = Comment {
                id: state.comments.len() as u64,
                body: Some(body.to_string()),
                user: Some(user(AUTOMATION_LOGIN)),
                created_at,
            };
            let hang = consume_failure(&mut state.comment_timeouts, number);
            (comment, hang)
        };

        if hang {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
        Ok(comment)
    }

    async fn remove_label(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        label: &str,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let issue = state.issues.get_mut(&number).ok_or(Error::NotFound)?;
        if !issue.has_label(label) {
            return Err(Error::NotFound);
        }

        issue.labels.retain(|l| l.name != label);
        state.removed_labels.push((number, label.to_string()));
        Ok(())
    }
}
