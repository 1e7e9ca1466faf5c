use super::*;
use std::error::Error as StdError;

#[test]
fn test_config_error_display() {
    let error = Error::Config("timeout_seconds must be greater than zero".to_string());

    assert_eq!(
        error.to_string(),
        "Configuration error: timeout_seconds must be greater than zero"
    );
}

#[test]
fn test_policy_error_is_transparent() {
    let error = Error::from(ConfigurationError::NoPolicies);

    assert_eq!(error.to_string(), "No label policies are configured");
}

#[test]
fn test_invalid_arguments_error_display() {
    let error = Error::InvalidArguments("no policies provided".to_string());

    assert_eq!(error.to_string(), "Invalid arguments: no policies provided");
}

#[test]
fn test_load_file_error_keeps_source() {
    let error = Error::LoadFile {
        path: PathBuf::from("policies.json"),
        source: io::Error::new(io::ErrorKind::NotFound, "File not found"),
    };

    assert_eq!(
        error.to_string(),
        "Failed to load file 'policies.json': File not found"
    );
    assert!(error.source().is_some());
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}
