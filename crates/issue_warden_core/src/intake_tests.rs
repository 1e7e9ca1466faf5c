use super::*;
use crate::test_support::day;

#[test]
fn test_schedule_and_dispatch_are_ticks() {
    for name in ["schedule", "workflow_dispatch"] {
        let event = parse_event(name, None, day(3)).unwrap();

        assert_eq!(event, Event::ScheduledTick { at: day(3) });
        assert_eq!(event.target(), None);
    }
}

#[test]
fn test_issue_labeled() {
    let payload = r#"{
        "action": "labeled",
        "issue": {"number": 42, "updated_at": "2024-01-02T00:00:00Z", "title": "Crash"},
        "label": {"name": "info-needed", "color": "ededed"},
        "sender": {"login": "maintainer"}
    }"#;

    let event = parse_event("issues", Some(payload), day(10)).unwrap();

    assert_eq!(
        event,
        Event::IssueLabeled {
            issue: IssueNumber::new(42),
            label: "info-needed".to_string(),
            at: day(1),
        }
    );
    assert_eq!(event.kind(), "issue-labeled");
}

#[test]
fn test_pull_request_labeled() {
    for name in ["pull_request", "pull_request_target"] {
        let payload = r#"{
            "action": "labeled",
            "number": 7,
            "pull_request": {"number": 7},
            "label": {"name": "info-needed"}
        }"#;

        let event = parse_event(name, Some(payload), day(5)).unwrap();

        assert_eq!(
            event,
            Event::PullRequestLabeled {
                pull_request: IssueNumber::new(7),
                label: "info-needed".to_string(),
                at: day(5),
            }
        );
    }
}

#[test]
fn test_pull_request_number_falls_back_to_top_level() {
    let payload = r#"{"action": "labeled", "number": 9, "label": {"name": "x"}}"#;

    let event = parse_event("pull_request", Some(payload), day(0)).unwrap();

    assert_eq!(event.target(), Some(IssueNumber::new(9)));
}

#[test]
fn test_comment_created() {
    let payload = r#"{
        "action": "created",
        "issue": {"number": 3},
        "comment": {
            "id": 99,
            "body": "Here are the logs",
            "user": {"login": "reporter"},
            "created_at": "2024-01-11T00:00:00Z"
        }
    }"#;

    let event = parse_event("issue_comment", Some(payload), day(20)).unwrap();

    assert_eq!(
        event,
        Event::CommentCreated {
            issue: IssueNumber::new(3),
            author: "reporter".to_string(),
            at: day(10),
        }
    );
}

#[test]
fn test_other_actions_are_ignored() {
    let unlabeled = r#"{"action": "unlabeled", "issue": {"number": 1}, "label": {"name": "x"}}"#;
    let edited = r#"{"action": "edited", "issue": {"number": 1}}"#;

    assert_eq!(
        parse_event("issues", Some(unlabeled), day(0)).unwrap(),
        Event::Ignored {
            event: "issues".to_string(),
            action: Some("unlabeled".to_string()),
        }
    );
    assert!(matches!(
        parse_event("issue_comment", Some(edited), day(0)).unwrap(),
        Event::Ignored { .. }
    ));
}

#[test]
fn test_unknown_events_are_ignored_without_payload() {
    let event = parse_event("push", None, day(0)).unwrap();

    assert_eq!(
        event,
        Event::Ignored {
            event: "push".to_string(),
            action: None,
        }
    );
}

#[test]
fn test_missing_payload_is_malformed() {
    let result = parse_event("issues", None, day(0));

    assert!(matches!(
        result,
        Err(MalformedEventError::MissingPayload { ref event }) if event == "issues"
    ));
}

#[test]
fn test_invalid_json_is_malformed() {
    let result = parse_event("issue_comment", Some("{not json"), day(0));

    assert!(matches!(result, Err(MalformedEventError::InvalidJson(_))));
}

#[test]
fn test_missing_required_fields_are_reported() {
    let cases = [
        ("issues", r#"{"issue": {"number": 1}}"#, "action"),
        ("issues", r#"{"action": "labeled", "label": {"name": "x"}}"#, "issue"),
        ("issues", r#"{"action": "labeled", "issue": {}, "label": {"name": "x"}}"#, "issue.number"),
        ("issues", r#"{"action": "labeled", "issue": {"number": 1}}"#, "label.name"),
        ("issues", r#"{"action": "labeled", "issue": {"number": 1}, "label": {"name": ""}}"#, "label.name"),
        ("pull_request", r#"{"action": "labeled", "label": {"name": "x"}}"#, "pull_request.number"),
        ("issue_comment", r#"{"action": "created", "issue": {"number": 1}}"#, "comment"),
        ("issue_comment", r#"{"action": "created", "issue": {"number": 1}, "comment": {}}"#, "comment.user.login"),
    ];

    for (name, payload, expected) in cases {
        match parse_event(name, Some(payload), day(0)) {
            Err(MalformedEventError::MissingField { field, .. }) => {
                assert_eq!(field, expected, "payload: {payload}")
            }
            other => panic!("Expected MissingField({expected}) for {payload}, got {other:?}"),
        }
    }
}
