use std::time::Duration;

use super::*;
use crate::{
    configuration::RetryPolicy,
    test_support::{
        closed_issue, commented_with, config, day, labeled, open_issue, repository,
        MockIssueClient, AUTOMATION_LOGIN, POLICY_BLOB,
    },
};

const MESSAGE: &str = "Closing due to missing information.";

fn close_decision() -> Decision {
    Decision::CloseWithMessage {
        label: "info-needed".to_string(),
        message: MESSAGE.to_string(),
        reason: CloseReason::NotPlanned,
    }
}

/// State of an issue that received `info-needed` on day zero.
fn stale_state(number: u64) -> IssueState {
    IssueState::from_timeline(
        &open_issue(number, &["info-needed"]),
        &[labeled("info-needed", day(0))],
        &fast_config(),
    )
}

fn fast_config() -> Configuration {
    config(POLICY_BLOB).with_retry(RetryPolicy::new(
        Duration::from_secs(30),
        Duration::from_millis(10),
    ))
}

#[tokio::test]
async fn test_close_posts_message_then_closes() {
    let client = MockIssueClient::new().with_issue(open_issue(1, &["info-needed"]), vec![]);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor
        .execute(&stale_state(1), &close_decision())
        .await
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::Closed);
    assert_eq!(
        client.comments(),
        vec![(1, MESSAGE.to_string())]
    );
    assert_eq!(client.closed(), vec![1]);
    assert_eq!(client.close_reasons(), vec![CloseReason::NotPlanned]);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let client = MockIssueClient::new().with_issue(open_issue(1, &["info-needed"]), vec![]);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let first = executor.execute(&stale_state(1), &close_decision()).await;
    let second = executor.execute(&stale_state(1), &close_decision()).await;

    assert_eq!(first.unwrap(), ExecutionOutcome::Closed);
    assert_eq!(
        second.unwrap(),
        ExecutionOutcome::NoAction(NoActionReason::AlreadyClosed)
    );
    assert_eq!(client.comments().len(), 1);
    assert_eq!(client.closed(), vec![1]);
}

#[tokio::test]
async fn test_already_closed_issue_is_left_alone() {
    let client = MockIssueClient::new().with_issue(closed_issue(4, &["info-needed"]), vec![]);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor
        .execute(&stale_state(4), &close_decision())
        .await
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::NoAction(NoActionReason::AlreadyClosed));
    assert_eq!(client.mutation_count(), 0);
}

#[tokio::test]
async fn test_label_removed_since_evaluation_is_left_alone() {
    let client = MockIssueClient::new().with_issue(open_issue(4, &["bug"]), vec![]);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor
        .execute(&stale_state(4), &close_decision())
        .await
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::NoAction(NoActionReason::LabelAbsent));
    assert_eq!(client.mutation_count(), 0);
}

#[tokio::test]
async fn test_dry_run_never_mutates() {
    let client = MockIssueClient::new().with_issue(open_issue(1, &["info-needed"]), vec![]);
    let repository = repository();
    let config = fast_config().with_dry_run(true);
    let executor = ActionExecutor::new(&client, &repository, &config);

    let close = executor.execute(&stale_state(1), &close_decision()).await;
    let remove = executor
        .execute(
            &stale_state(1),
            &Decision::RemoveLabel {
                label: "info-needed".to_string(),
                message: Some("bye".to_string()),
            },
        )
        .await;

    assert_eq!(close.unwrap(), ExecutionOutcome::NoAction(NoActionReason::DryRun));
    assert_eq!(remove.unwrap(), ExecutionOutcome::NoAction(NoActionReason::DryRun));
    assert_eq!(client.mutation_count(), 0);
}

#[tokio::test]
async fn test_no_action_decision_does_not_call_platform() {
    let client = MockIssueClient::new();
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor
        .execute(&stale_state(99), &Decision::NoAction)
        .await
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::NoAction(NoActionReason::NothingToDo));
}

#[tokio::test]
async fn test_remove_label_with_message() {
    let client =
        MockIssueClient::new().with_issue(open_issue(2, &["awaiting-response", "bug"]), vec![]);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor
        .execute(
            &stale_state(2),
            &Decision::RemoveLabel {
                label: "awaiting-response".to_string(),
                message: Some("No response received, removing label.".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::LabelRemoved);
    assert_eq!(client.removed_labels(), vec![(2, "awaiting-response".to_string())]);
    assert_eq!(client.comments().len(), 1);
    assert!(client.closed().is_empty());
}

#[tokio::test]
async fn test_remove_absent_label_is_no_action() {
    let client = MockIssueClient::new().with_issue(open_issue(2, &["bug"]), vec![]);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor
        .execute(
            &stale_state(2),
            &Decision::RemoveLabel {
                label: "awaiting-response".to_string(),
                message: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::NoAction(NoActionReason::LabelAbsent));
    assert!(client.removed_labels().is_empty());
}

#[tokio::test]
async fn test_transient_close_failure_is_retried_once() {
    let client = MockIssueClient::new()
        .with_issue(open_issue(1, &["info-needed"]), vec![])
        .with_close_failures(1, 1);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor
        .execute(&stale_state(1), &close_decision())
        .await
        .unwrap();

    assert_eq!(outcome, ExecutionOutcome::Closed);
    assert_eq!(client.close_attempts(1), 2);
    assert_eq!(client.comments().len(), 1);
}

#[tokio::test]
async fn test_persistent_close_failure_is_returned() {
    let client = MockIssueClient::new()
        .with_issue(open_issue(1, &["info-needed"]), vec![])
        .with_close_failures(1, 2);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let result = executor.execute(&stale_state(1), &close_decision()).await;

    let error = result.unwrap_err();
    assert!(error.is_transient());
    assert_eq!(client.close_attempts(1), 2);
    assert!(client.closed().is_empty());
}

#[tokio::test]
async fn test_missing_issue_is_reported() {
    let client = MockIssueClient::new();
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let result = executor.execute(&stale_state(5), &close_decision()).await;

    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_message_posted_by_earlier_run_is_not_repeated() {
    let timeline = vec![
        labeled("info-needed", day(0)),
        commented_with(AUTOMATION_LOGIN, MESSAGE, day(20)),
    ];
    let client =
        MockIssueClient::new().with_issue(open_issue(2, &["info-needed"]), timeline.clone());
    let repository = repository();
    let config = fast_config();
    let state = IssueState::from_timeline(&open_issue(2, &["info-needed"]), &timeline, &config);
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor.execute(&state, &close_decision()).await.unwrap();

    assert_eq!(outcome, ExecutionOutcome::Closed);
    assert!(client.comments().is_empty());
    assert_eq!(client.closed(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_comment_that_landed_is_not_posted_again() {
    let client = MockIssueClient::new()
        .with_issue(open_issue(1, &["info-needed"]), vec![labeled("info-needed", day(0))])
        .with_comment_timeouts(1, 1);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor.execute(&stale_state(1), &close_decision()).await.unwrap();

    assert_eq!(outcome, ExecutionOutcome::Closed);
    assert_eq!(client.comments(), vec![(1, MESSAGE.to_string())]);
    assert_eq!(client.closed(), vec![1]);
}

#[tokio::test]
async fn test_transient_comment_failure_is_retried_once() {
    let client = MockIssueClient::new()
        .with_issue(open_issue(1, &["info-needed"]), vec![labeled("info-needed", day(0))])
        .with_comment_failures(1, 1);
    let repository = repository();
    let config = fast_config();
    let executor = ActionExecutor::new(&client, &repository, &config);

    let outcome = executor.execute(&stale_state(1), &close_decision()).await.unwrap();

    assert_eq!(outcome, ExecutionOutcome::Closed);
    assert_eq!(client.comments().len(), 1);
}
