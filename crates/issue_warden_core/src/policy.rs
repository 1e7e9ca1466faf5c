//! Label policies.
//!
//! A policy set maps a label name to what should happen to issues that keep that
//! label without activity for longer than the policy delay. The set is parsed from
//! a single JSON object:
//!
//! ```json
//! {
//!   "info-needed": {
//!     "delay": "P14D",
//!     "message": "Closing because we did not receive the requested information."
//!   },
//!   "awaiting-response": {
//!     "delay": "P7D",
//!     "action": "remove-label",
//!     "remove_label_on_activity": true
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use github_client::CloseReason;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{duration::IsoDuration, errors::ConfigurationError};

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;

/// What a policy does once its label has gone stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyAction {
    /// Post the policy message and close the issue.
    #[default]
    Close,
    /// Remove the label, posting the message first when one is configured.
    RemoveLabel,
}

/// Close reason as written in the policy blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCloseReason {
    Completed,
    #[default]
    NotPlanned,
}

impl From<PolicyCloseReason> for CloseReason {
    fn from(value: PolicyCloseReason) -> Self {
        match value {
            PolicyCloseReason::Completed => CloseReason::Completed,
            PolicyCloseReason::NotPlanned => CloseReason::NotPlanned,
        }
    }
}

/// One entry of the policy blob before validation.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPolicy {
    delay: String,

    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    action: PolicyAction,

    #[serde(default)]
    close_reason: PolicyCloseReason,

    #[serde(default)]
    remove_label_on_activity: bool,
}

/// A validated policy for one label.
///
/// Invariants: the delay is non-negative and a closing policy always has a
/// non-empty message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPolicy {
    label: String,
    delay: IsoDuration,
    message: Option<String>,
    action: PolicyAction,
    close_reason: PolicyCloseReason,
    remove_label_on_activity: bool,
}

impl LabelPolicy {
    /// Creates a closing policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::EmptyLabel` or `ConfigurationError::MissingMessage`
    /// when an invariant is violated.
    pub fn close_after(
        label: impl Into<String>,
        delay: IsoDuration,
        message: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        Self::validated(
            label.into(),
            delay,
            Some(message.into()),
            PolicyAction::Close,
            PolicyCloseReason::default(),
            false,
        )
    }

    /// Creates a policy that removes the label once it has gone stale.
    pub fn remove_after(
        label: impl Into<String>,
        delay: IsoDuration,
        message: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        Self::validated(
            label.into(),
            delay,
            message,
            PolicyAction::RemoveLabel,
            PolicyCloseReason::default(),
            false,
        )
    }

    /// Makes qualifying activity remove the label instead of only resetting the clock.
    pub fn with_remove_label_on_activity(mut self, enabled: bool) -> Self {
        self.remove_label_on_activity = enabled;
        self
    }

    fn validated(
        label: String,
        delay: IsoDuration,
        message: Option<String>,
        action: PolicyAction,
        close_reason: PolicyCloseReason,
        remove_label_on_activity: bool,
    ) -> Result<Self, ConfigurationError> {
        if label.trim().is_empty() {
            return Err(ConfigurationError::EmptyLabel);
        }

        let message = message.filter(|m| !m.trim().is_empty());
        if action == PolicyAction::Close && message.is_none() {
            return Err(ConfigurationError::MissingMessage { label });
        }

        Ok(Self {
            label,
            delay,
            message,
            action,
            close_reason,
            remove_label_on_activity,
        })
    }

    fn from_raw(label: String, raw: RawPolicy) -> Result<Self, ConfigurationError> {
        let delay = raw
            .delay
            .parse::<IsoDuration>()
            .map_err(|reason| ConfigurationError::InvalidDelay {
                label: label.clone(),
                value: raw.delay.clone(),
                reason,
            })?;

        Self::validated(
            label,
            delay,
            raw.message,
            raw.action,
            raw.close_reason,
            raw.remove_label_on_activity,
        )
    }

    /// The label this policy manages
    pub fn label(&self) -> &str {
        &self.label
    }

    /// How long the label may sit without qualifying activity
    pub fn delay(&self) -> IsoDuration {
        self.delay
    }

    /// The comment to post when the policy fires, if any
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn action(&self) -> PolicyAction {
        self.action
    }

    pub fn close_reason(&self) -> CloseReason {
        self.close_reason.into()
    }

    pub fn remove_label_on_activity(&self) -> bool {
        self.remove_label_on_activity
    }
}

/// The label → policy mapping for one run.
///
/// Iteration is ordered by label name so decisions are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet {
    policies: BTreeMap<String, LabelPolicy>,
}

impl PolicySet {
    /// Parses and validates a policy blob.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the JSON is malformed, contains unknown
    /// keys, an invalid delay, a closing policy without message, or no policies.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let raw: BTreeMap<String, RawPolicy> = serde_json::from_str(json)?;
        if raw.is_empty() {
            return Err(ConfigurationError::NoPolicies);
        }

        let mut set = Self::default();
        for (label, raw_policy) in raw {
            let policy = LabelPolicy::from_raw(label, raw_policy)?;
            debug!(
                label = policy.label(),
                delay = %policy.delay(),
                action = ?policy.action(),
                "Loaded label policy"
            );
            set.insert(policy);
        }

        Ok(set)
    }

    /// Builds a set from already validated policies. Later duplicates replace earlier ones.
    pub fn from_policies(policies: impl IntoIterator<Item = LabelPolicy>) -> Self {
        let mut set = Self::default();
        for policy in policies {
            set.insert(policy);
        }
        set
    }

    fn insert(&mut self, policy: LabelPolicy) {
        self.policies.insert(policy.label.clone(), policy);
    }

    /// Looks up the policy for a label.
    pub fn get(&self, label: &str) -> Option<&LabelPolicy> {
        self.policies.get(label)
    }

    /// Returns `true` if the label is policy-managed.
    pub fn manages(&self, label: &str) -> bool {
        self.policies.contains_key(label)
    }

    /// All policy-managed labels, in order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelPolicy> {
        self.policies.values()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
