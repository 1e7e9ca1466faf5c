//! The `run` command.
//!
//! Loads settings and policies, reads the event handed over by the CI runner and
//! lets a [`Warden`] process it against one repository.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;
use clap::Args;
use github_client::{create_token_client, GitHubClient, IssueClient};
use issue_warden_core::{Configuration, RepositoryRef, RunReport, Warden};
use tracing::info;

use crate::{commands::PolicyArgs, config::AppSettings, errors::Error};

#[cfg(test)]
#[path = "run_cmd_tests.rs"]
mod tests;

/// Arguments for the `run` command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Repository to manage, as `owner/name`
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repo: String,

    #[command(flatten)]
    pub policies: PolicyArgs,

    /// Name of the event that triggered the run
    #[arg(long, env = "GITHUB_EVENT_NAME", default_value = "schedule")]
    pub event_name: String,

    /// Path to the JSON webhook payload of the event
    #[arg(long, env = "GITHUB_EVENT_PATH")]
    pub event_path: Option<PathBuf>,

    /// Path to the settings file. Defaults to ./issue-warden.toml when present
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log decisions without changing any issue
    #[arg(long)]
    pub dry_run: bool,

    /// GitHub token used for API calls
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the run cannot start: invalid settings, policies or
/// repository, an unreadable event payload, or a client that cannot be built.
/// Problems during the run are reported through the returned [`RunReport`].
pub async fn execute(args: &RunArgs) -> Result<RunReport, Error> {
    let settings = AppSettings::load_or_default(args.config.as_deref())?;
    let policies = args.policies.load()?;
    let repository: RepositoryRef = args.repo.parse()?;
    let config = settings.configuration(policies, args.dry_run)?;
    let payload = read_event_payload(args.event_path.as_deref())?;

    let octocrab = create_token_client(&args.token, settings.api.base_uri.as_deref())?;
    let client = GitHubClient::new(octocrab);

    Ok(run_with_client(
        &client,
        &repository,
        &config,
        &args.event_name,
        payload.as_deref(),
    )
    .await)
}

/// Processes one event with an already constructed client.
pub async fn run_with_client<C: IssueClient + ?Sized>(
    client: &C,
    repository: &RepositoryRef,
    config: &Configuration,
    event_name: &str,
    payload: Option<&str>,
) -> RunReport {
    let warden = Warden::new(client, repository, config);
    info!(
        run_id = %warden.run_id(),
        repository = %repository,
        event = event_name,
        policies = config.policies().len(),
        dry_run = config.is_dry_run(),
        "Starting issue warden run"
    );

    warden.handle(event_name, payload, Utc::now()).await
}

fn read_event_payload(path: Option<&Path>) -> Result<Option<String>, Error> {
    path.map(|path| {
        fs::read_to_string(path).map_err(|source| Error::LoadFile {
            path: path.to_path_buf(),
            source,
        })
    })
    .transpose()
}

/// Renders the end-of-run summary printed to stdout.
pub fn summarize(report: &RunReport) -> String {
    let mut summary = format!(
        "Run {}: evaluated {}, closed {}, labels removed {}, skipped {}, failures {}",
        report.run_id,
        report.evaluated,
        report.closed.len(),
        report.labels_removed.len(),
        report.skipped,
        report.failures.len(),
    );

    if report.malformed_events > 0 {
        summary.push_str(&format!(", malformed events {}", report.malformed_events));
    }
    for failure in &report.failures {
        summary.push_str(&format!("\n  {}: {}", failure.target, failure.error));
    }

    summary
}
