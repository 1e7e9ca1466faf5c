//! Error types for the issue lifecycle.
//!
//! Three error families exist, each with a different blast radius:
//!
//! - [`ConfigurationError`] is fatal at startup. No issue is processed.
//! - [`MalformedEventError`] is fatal for one event only.
//! - [`PlatformApiError`] is fatal for one issue only. Transient failures are retried
//!   once before they are reported.

use std::time::Duration;

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Invalid policy blob or run settings.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// The policy blob could not be parsed as a label → policy JSON object.
    #[error("Policy configuration is not valid: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A policy was declared under an empty label name.
    #[error("Policy label names must not be empty")]
    EmptyLabel,

    /// A policy delay is not a supported ISO-8601 duration.
    #[error("Policy for label '{label}' has an invalid delay '{value}': {reason}")]
    InvalidDelay {
        label: String,
        value: String,
        reason: String,
    },

    /// A closing policy was declared without a message to post.
    #[error("Policy for label '{label}' must define a non-empty message")]
    MissingMessage { label: String },

    /// The policy blob contained no policies at all.
    #[error("No label policies are configured")]
    NoPolicies,

    /// A run setting has an unusable value.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// An incoming event that cannot be interpreted.
#[derive(Error, Debug)]
pub enum MalformedEventError {
    /// The event payload is not valid JSON.
    #[error("Event payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A payload is required for this event but none was supplied.
    #[error("'{event}' event requires a payload but none was provided")]
    MissingPayload { event: String },

    /// A required field is absent from the payload.
    #[error("'{event}' event is missing required field '{field}'")]
    MissingField { event: String, field: &'static str },
}

/// A host platform call that failed after the retry budget was spent.
#[derive(Error, Debug)]
pub enum PlatformApiError {
    /// The call did not complete within the configured timeout.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    /// The call completed with an error response or a transport failure.
    #[error("{operation} failed: {source}")]
    Api {
        operation: String,
        #[source]
        source: github_client::Error,
    },
}

impl PlatformApiError {
    /// Returns `true` if retrying the call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlatformApiError::Timeout { .. } => true,
            PlatformApiError::Api { source, .. } => source.is_transient(),
        }
    }

    /// Returns `true` if the call timed out. The platform may still have applied it.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PlatformApiError::Timeout { .. })
    }

    /// Returns `true` if the platform reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PlatformApiError::Api {
                source: github_client::Error::NotFound,
                ..
            }
        )
    }
}
