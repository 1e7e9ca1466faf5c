//! Identifier types
//!
//! Newtypes for the repository, issue and run identities that flow through the
//! lifecycle. Each wraps a primitive so an issue number cannot be confused with any
//! other integer.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ConfigurationError;

#[cfg(test)]
#[path = "identifiers_tests.rs"]
mod tests;

/// Number of an issue or pull request within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IssueNumber(u64);

impl IssueNumber {
    /// Create a new issue number
    pub fn new(number: u64) -> Self {
        Self(number)
    }

    /// Get the issue number as a u64
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for IssueNumber {
    fn from(number: u64) -> Self {
        Self::new(number)
    }
}

/// A repository addressed as `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Create a repository reference with validation
    ///
    /// # Validation Rules
    /// - Owner and name must be non-empty
    /// - Neither part may contain `/` or whitespace
    ///
    /// # Errors
    /// Returns `ConfigurationError::InvalidValue` if validation fails
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let owner = owner.into();
        let name = name.into();

        for (field, value) in [("owner", &owner), ("name", &name)] {
            if value.is_empty() {
                return Err(ConfigurationError::InvalidValue {
                    field: format!("repository {}", field),
                    reason: "must not be empty".to_string(),
                });
            }

            if value.contains('/') || value.chars().any(char::is_whitespace) {
                return Err(ConfigurationError::InvalidValue {
                    field: format!("repository {}", field),
                    reason: format!("'{}' must not contain '/' or whitespace", value),
                });
            }
        }

        Ok(Self { owner, name })
    }

    /// The account that owns the repository
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepositoryRef {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) =
            s.trim()
                .split_once('/')
                .ok_or_else(|| ConfigurationError::InvalidValue {
                    field: "repository".to_string(),
                    reason: format!("'{}' is not in 'owner/name' form", s),
                })?;

        Self::new(owner, name)
    }
}

impl std::fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Identifies one invocation of the lifecycle manager.
///
/// Generated fresh for every run and attached to the run span so all activity from
/// a single invocation can be correlated in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
