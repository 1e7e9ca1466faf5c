use super::*;

const INFO_NEEDED_BLOB: &str = r#"{
    "info-needed": {
        "delay": "P14D",
        "message": "Closing this issue because the requested information was not provided."
    }
}"#;

#[test]
fn test_parse_single_closing_policy() {
    let set = PolicySet::from_json(INFO_NEEDED_BLOB).expect("blob should parse");

    let policy = set.get("info-needed").expect("policy should exist");
    assert_eq!(set.len(), 1);
    assert_eq!(policy.delay().to_string(), "P14D");
    assert_eq!(policy.action(), PolicyAction::Close);
    assert_eq!(policy.close_reason(), CloseReason::NotPlanned);
    assert!(!policy.remove_label_on_activity());
    assert!(policy.message().unwrap().starts_with("Closing this issue"));
}

#[test]
fn test_parse_remove_label_policy_without_message() {
    let blob = r#"{
        "awaiting-response": {
            "delay": "P7D",
            "action": "remove-label",
            "remove_label_on_activity": true
        }
    }"#;

    let set = PolicySet::from_json(blob).expect("blob should parse");

    let policy = set.get("awaiting-response").unwrap();
    assert_eq!(policy.action(), PolicyAction::RemoveLabel);
    assert!(policy.message().is_none());
    assert!(policy.remove_label_on_activity());
}

#[test]
fn test_parse_close_reason() {
    let blob = r#"{"answered": {"delay": "PT12H", "message": "Done", "close_reason": "completed"}}"#;

    let set = PolicySet::from_json(blob).unwrap();

    assert_eq!(set.get("answered").unwrap().close_reason(), CloseReason::Completed);
}

#[test]
fn test_labels_are_ordered() {
    let blob = r#"{
        "zeta": {"delay": "P1D", "message": "z"},
        "alpha": {"delay": "P2D", "message": "a"},
        "info-needed": {"delay": "P3D", "message": "i"}
    }"#;

    let set = PolicySet::from_json(blob).unwrap();

    assert_eq!(
        set.labels().collect::<Vec<_>>(),
        vec!["alpha", "info-needed", "zeta"]
    );
    assert!(set.manages("zeta"));
    assert!(!set.manages("bug"));
}

#[test]
fn test_closing_policy_requires_message() {
    let missing = PolicySet::from_json(r#"{"info-needed": {"delay": "P14D"}}"#);
    let blank = PolicySet::from_json(r#"{"info-needed": {"delay": "P14D", "message": "   "}}"#);

    assert!(matches!(
        missing,
        Err(ConfigurationError::MissingMessage { ref label }) if label == "info-needed"
    ));
    assert!(matches!(blank, Err(ConfigurationError::MissingMessage { .. })));
}

#[test]
fn test_invalid_delay_is_reported_with_label() {
    let result = PolicySet::from_json(r#"{"info-needed": {"delay": "14 days", "message": "m"}}"#);

    match result {
        Err(ConfigurationError::InvalidDelay { label, value, .. }) => {
            assert_eq!(label, "info-needed");
            assert_eq!(value, "14 days");
        }
        other => panic!("Expected InvalidDelay, got {other:?}"),
    }
}

#[test]
fn test_malformed_json_is_rejected() {
    let result = PolicySet::from_json("{ info-needed: P14D ");

    assert!(matches!(result, Err(ConfigurationError::InvalidJson(_))));
}

#[test]
fn test_unknown_keys_are_rejected() {
    let result =
        PolicySet::from_json(r#"{"info-needed": {"delay": "P14D", "message": "m", "dealy": "P1D"}}"#);

    assert!(matches!(result, Err(ConfigurationError::InvalidJson(_))));
}

#[test]
fn test_empty_blob_is_rejected() {
    assert!(matches!(
        PolicySet::from_json("{}"),
        Err(ConfigurationError::NoPolicies)
    ));
}

#[test]
fn test_empty_label_is_rejected() {
    let result = PolicySet::from_json(r#"{"": {"delay": "P1D", "message": "m"}}"#);

    assert!(matches!(result, Err(ConfigurationError::EmptyLabel)));
}

#[test]
fn test_programmatic_construction() {
    let delay = IsoDuration::from_days(14).unwrap();
    let close = LabelPolicy::close_after("info-needed", delay, "bye").unwrap();
    let remove = LabelPolicy::remove_after("waiting", delay, None)
        .unwrap()
        .with_remove_label_on_activity(true);

    let set = PolicySet::from_policies([close, remove]);

    assert_eq!(set.len(), 2);
    assert!(set.get("waiting").unwrap().remove_label_on_activity());
    assert!(LabelPolicy::close_after("info-needed", delay, "").is_err());
}
