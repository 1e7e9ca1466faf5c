//! # Issue Warden Core
//!
//! This crate holds the issue lifecycle logic of Issue Warden: label policies that
//! close or unlabel issues after a period without activity.
//!
//! ## Overview
//!
//! One invocation follows a fixed path:
//! 1. [`intake`] turns the CI event name and webhook payload into an [`Event`]
//! 2. [`Warden`] collects the issues the event concerns and rebuilds their
//!    [`IssueState`] from the issue timeline
//! 3. [`PolicyEvaluator`] decides what each issue needs
//! 4. [`ActionExecutor`] carries the [`Decision`] out through an
//!    [`IssueClient`](github_client::IssueClient)
//!
//! The crate performs no process-level I/O. Policies and settings arrive as a
//! [`Configuration`] and all platform access goes through the client trait, so the
//! whole lifecycle can be driven by an in-memory client.
//!
//! ## Examples
//!
//! ```no_run
//! use chrono::Utc;
//! use github_client::{create_token_client, GitHubClient};
//! use issue_warden_core::{Configuration, PolicySet, RepositoryRef, Warden};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let policies = PolicySet::from_json(
//!     r#"{"info-needed": {"delay": "P14D", "message": "Closing due to missing information."}}"#,
//! )?;
//! let config = Configuration::new(policies);
//! let repository: RepositoryRef = "octo-org/octo-repo".parse()?;
//! let client = GitHubClient::new(create_token_client("token", None)?);
//!
//! let report = Warden::new(&client, &repository, &config)
//!     .handle("schedule", None, Utc::now())
//!     .await;
//! println!("Closed {} issues", report.closed.len());
//! # Ok(())
//! # }
//! ```

pub mod configuration;
pub mod duration;
pub mod errors;
pub mod evaluator;
pub mod executor;
pub mod identifiers;
pub mod intake;
pub mod policy;
pub mod retry;
pub mod state;
pub mod warden;

#[cfg(test)]
mod test_support;

pub use configuration::{
    Configuration, RetryPolicy, DEFAULT_AUTOMATION_LOGIN, DEFAULT_CALL_TIMEOUT,
    DEFAULT_RETRY_BACKOFF, MAX_RETRIES,
};
pub use duration::IsoDuration;
pub use errors::{ConfigurationError, MalformedEventError, PlatformApiError};
pub use evaluator::{Decision, PolicyEvaluator};
pub use executor::{ActionExecutor, ExecutionOutcome, NoActionReason};
pub use identifiers::{IssueNumber, RepositoryRef, RunId};
pub use intake::{parse_event, Event};
pub use policy::{LabelPolicy, PolicyAction, PolicyCloseReason, PolicySet};
pub use state::{IssueEvent, IssueState};
pub use warden::{FailureTarget, RunFailure, RunReport, Warden};
