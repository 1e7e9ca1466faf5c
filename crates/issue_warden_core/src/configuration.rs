//! Run configuration.
//!
//! A [`Configuration`] is assembled once per invocation and shared read-only with
//! every component of the run.

use std::time::Duration;

use crate::policy::PolicySet;

#[cfg(test)]
#[path = "configuration_tests.rs"]
mod tests;

/// Login used by the GitHub Actions token when it posts comments.
pub const DEFAULT_AUTOMATION_LOGIN: &str = "github-actions[bot]";

/// Default per-call timeout for host platform calls.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default pause before a transient failure is retried.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Number of retries allowed for a transient failure.
pub const MAX_RETRIES: u32 = 1;

/// Timeout and retry settings applied to each host platform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound for a single attempt
    pub timeout: Duration,
    /// Fixed pause between the first attempt and the retry
    pub backoff: Duration,
    /// Retries after the first attempt. Transient failures only.
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, backoff: Duration) -> Self {
        Self {
            timeout,
            backoff,
            max_retries: MAX_RETRIES,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_CALL_TIMEOUT, DEFAULT_RETRY_BACKOFF)
    }
}

/// Immutable settings for one run.
#[derive(Debug, Clone)]
pub struct Configuration {
    policies: PolicySet,
    automation_login: String,
    retry: RetryPolicy,
    dry_run: bool,
}

impl Configuration {
    /// Creates a configuration with default automation identity and retry settings.
    pub fn new(policies: PolicySet) -> Self {
        Self {
            policies,
            automation_login: DEFAULT_AUTOMATION_LOGIN.to_string(),
            retry: RetryPolicy::default(),
            dry_run: false,
        }
    }

    /// Sets the login whose comments never count as activity.
    pub fn with_automation_login(mut self, login: impl Into<String>) -> Self {
        self.automation_login = login.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Evaluate and log decisions without mutating anything on the platform.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn automation_login(&self) -> &str {
        &self.automation_login
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns `true` if the login belongs to the automation identity.
    ///
    /// GitHub logins are case-insensitive.
    pub fn is_automation(&self, login: &str) -> bool {
        login.eq_ignore_ascii_case(&self.automation_login)
    }
}
