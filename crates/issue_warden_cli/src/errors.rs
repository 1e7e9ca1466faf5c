use std::{io, path::PathBuf};

use issue_warden_core::ConfigurationError;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that stop the Issue Warden CLI before or while setting up a run.
///
/// Failures on individual issues are not errors at this level. They are collected
/// in the run report instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The settings file is missing, unreadable or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The policy blob or a run setting failed validation.
    #[error(transparent)]
    Policy(#[from] ConfigurationError),

    /// Invalid or incompatible command-line arguments were provided.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Failed to read an input file, such as the policy file or the event payload.
    #[error("Failed to load file '{}': {source}", path.display())]
    LoadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The GitHub client could not be created.
    #[error("Failed to create GitHub client: {0}")]
    GitHub(#[from] github_client::Error),
}

impl Error {
    /// Process exit code for errors that abort a run before it starts.
    pub const EXIT_CODE: i32 = 2;
}
