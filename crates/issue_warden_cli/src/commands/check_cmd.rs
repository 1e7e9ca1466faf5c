//! The `check-policies` command validates a policy blob and prints what each
//! policy will do.

use clap::Args;
use issue_warden_core::{LabelPolicy, PolicyAction, PolicySet};

use crate::{commands::PolicyArgs, errors::Error};

#[cfg(test)]
#[path = "check_cmd_tests.rs"]
mod tests;

/// Arguments for the `check-policies` command.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub policies: PolicyArgs,
}

/// Loads and validates the policies.
pub fn execute(args: &CheckArgs) -> Result<PolicySet, Error> {
    args.policies.load()
}

/// One line per policy, in label order.
pub fn describe(policies: &PolicySet) -> Vec<String> {
    policies.iter().map(describe_policy).collect()
}

fn describe_policy(policy: &LabelPolicy) -> String {
    let action = match policy.action() {
        PolicyAction::Close => "close the issue",
        PolicyAction::RemoveLabel => "remove the label",
    };

    let mut line = format!(
        "{}: {} after {} without activity",
        policy.label(),
        action,
        policy.delay()
    );
    if policy.message().is_some() {
        line.push_str(", with comment");
    }
    if policy.remove_label_on_activity() {
        line.push_str(", label removed on new comments");
    }
    line
}
