//! Settings and policy loading for the Issue Warden CLI.
//!
//! Two inputs configure a run:
//!
//! - the optional `issue-warden.toml` settings file, holding the automation identity
//!   and the GitHub API timeouts
//! - the label policy blob, passed inline, read from a file, or taken from the
//!   `ISSUE_WARDEN_POLICIES` environment variable
//!
//! # Example TOML Configuration
//!
//! ```toml
//! [automation]
//! login = "github-actions[bot]"
//!
//! [api]
//! timeout_seconds = 30
//! retry_backoff_seconds = 2
//! base_uri = "https://api.github.com"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use issue_warden_core::{
    Configuration, PolicySet, RetryPolicy, DEFAULT_AUTOMATION_LOGIN, DEFAULT_CALL_TIMEOUT,
    DEFAULT_RETRY_BACKOFF,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::Error;

/// Default settings file name
pub const DEFAULT_CONFIG_FILENAME: &str = "issue-warden.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Contents of the settings file.
///
/// Every section and key is optional; missing values fall back to the defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppSettings {
    #[serde(default)]
    pub automation: AutomationSettings,

    #[serde(default)]
    pub api: ApiSettings,
}

impl AppSettings {
    /// Loads settings from a TOML file at the specified path.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file does not exist, cannot be read or
    /// contains invalid TOML.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading settings from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!("Settings file not found: {:?}", path)));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings file: {}", e)))?;

        let settings: AppSettings = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse settings file: {}", e)))?;

        Ok(settings)
    }

    /// Loads the explicitly requested settings file, or `issue-warden.toml` from
    /// the working directory when it exists. Falls back to the defaults otherwise.
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = config_path {
            return Self::load(path);
        }

        let path = get_config_path(None);
        if path.exists() {
            info!("Using settings file {:?}", path);
            Self::load(&path)
        } else {
            debug!("No settings file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Builds the run configuration from these settings and a policy set.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the timeout is zero or the automation login is blank.
    pub fn configuration(
        &self,
        policies: PolicySet,
        dry_run: bool,
    ) -> Result<Configuration, Error> {
        if self.api.timeout_seconds == 0 {
            return Err(Error::Config(
                "api.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.automation.login.trim().is_empty() {
            return Err(Error::Config("automation.login must not be empty".to_string()));
        }

        let retry = RetryPolicy::new(
            Duration::from_secs(self.api.timeout_seconds),
            Duration::from_secs(self.api.retry_backoff_seconds),
        );

        Ok(Configuration::new(policies)
            .with_automation_login(self.automation.login.trim())
            .with_retry(retry)
            .with_dry_run(dry_run))
    }
}

/// Identity of the account the warden acts as.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutomationSettings {
    /// Login whose comments never count as activity on an issue
    #[serde(default = "AutomationSettings::default_login")]
    pub login: String,
}

impl AutomationSettings {
    fn default_login() -> String {
        DEFAULT_AUTOMATION_LOGIN.to_string()
    }
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            login: Self::default_login(),
        }
    }
}

/// GitHub API call settings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSettings {
    #[serde(default = "ApiSettings::default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "ApiSettings::default_retry_backoff_seconds")]
    pub retry_backoff_seconds: u64,

    /// Alternative API root, e.g. for GitHub Enterprise Server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
}

impl ApiSettings {
    fn default_timeout_seconds() -> u64 {
        DEFAULT_CALL_TIMEOUT.as_secs()
    }

    fn default_retry_backoff_seconds() -> u64 {
        DEFAULT_RETRY_BACKOFF.as_secs()
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: Self::default_timeout_seconds(),
            retry_backoff_seconds: Self::default_retry_backoff_seconds(),
            base_uri: None,
        }
    }
}

/// Resolves the path to the settings file.
///
/// Returns `config_path` when given, otherwise `issue-warden.toml` in the current
/// directory.
pub fn get_config_path(config_path: Option<&str>) -> PathBuf {
    if let Some(path) = config_path {
        PathBuf::from(path)
    } else {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        current_dir.join(DEFAULT_CONFIG_FILENAME)
    }
}

/// Loads the policy blob from the inline value or from a file.
///
/// # Errors
///
/// Returns `Error::InvalidArguments` when neither or both sources are given,
/// `Error::LoadFile` when the file cannot be read and `Error::Policy` when the blob
/// is invalid.
pub fn load_policies(inline: Option<&str>, file: Option<&Path>) -> Result<PolicySet, Error> {
    let blob = match (inline, file) {
        (Some(_), Some(_)) => {
            return Err(Error::InvalidArguments(
                "use either --policies or --policies-file, not both".to_string(),
            ))
        }
        (Some(blob), None) => blob.to_string(),
        (None, Some(path)) => fs::read_to_string(path).map_err(|source| Error::LoadFile {
            path: path.to_path_buf(),
            source,
        })?,
        (None, None) => {
            return Err(Error::InvalidArguments(
                "no policies provided, use --policies, --policies-file or ISSUE_WARDEN_POLICIES"
                    .to_string(),
            ))
        }
    };

    let policies = PolicySet::from_json(&blob)?;
    info!(count = policies.len(), "Loaded label policies");
    Ok(policies)
}
