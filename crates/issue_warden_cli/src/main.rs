use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use issue_warden_cli::{
    commands::{
        check_cmd::{self, CheckArgs},
        run_cmd::{self, RunArgs},
    },
    errors::Error,
};

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Environment variable holding the log filter directives
const LOG_ENV_VAR: &str = "ISSUE_WARDEN_LOG";

/// Exit code when at least one issue could not be processed
const EXIT_RUN_FAILURES: i32 = 1;

/// Issue Warden: close or unlabel issues whose policy labels have gone stale
#[derive(Parser)]
#[command(name = "issue-warden")]
#[command(about = "Apply label-based lifecycle policies to GitHub issues", long_about = None)]
struct Cli {
    /// Write logs as JSON lines instead of human readable text
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one event (or a scheduled tick) for a repository
    Run(RunArgs),

    /// Validate label policies and show what they do
    CheckPolicies(CheckArgs),

    /// Show the CLI version
    Version,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match &cli.command {
        Commands::Run(args) => match run_cmd::execute(args).await {
            Ok(report) => {
                println!("{}", run_cmd::summarize(&report));
                if report.is_success() {
                    std::process::exit(0);
                }
                std::process::exit(EXIT_RUN_FAILURES);
            }
            Err(e) => {
                error!("Error: {e}");
                std::process::exit(Error::EXIT_CODE);
            }
        },
        Commands::CheckPolicies(args) => match check_cmd::execute(args) {
            Ok(policies) => {
                for line in check_cmd::describe(&policies) {
                    println!("{}", line);
                }
                std::process::exit(0);
            }
            Err(e) => {
                error!("Error: {e}");
                std::process::exit(Error::EXIT_CODE);
            }
        },
        Commands::Version => {
            println!(
                "issue-warden version {}",
                option_env!("ISSUE_WARDEN_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
            );
            std::process::exit(0);
        }
    }
}
