//! Command modules for the Issue Warden CLI.
//!
//! - `run_cmd`: process one event against a repository
//! - `check_cmd`: validate a policy blob without touching GitHub

pub mod check_cmd;
pub mod run_cmd;

use std::path::PathBuf;

use clap::Args;
use issue_warden_core::PolicySet;

use crate::{config::load_policies, errors::Error};

/// Where to read the label policies from.
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    /// Label policies as a JSON object
    #[arg(long, env = "ISSUE_WARDEN_POLICIES", conflicts_with = "policies_file")]
    pub policies: Option<String>,

    /// Path to a JSON file holding the label policies
    #[arg(long)]
    pub policies_file: Option<PathBuf>,
}

impl PolicyArgs {
    /// Loads and validates the policy blob.
    pub fn load(&self) -> Result<PolicySet, Error> {
        load_policies(self.policies.as_deref(), self.policies_file.as_deref())
    }
}
