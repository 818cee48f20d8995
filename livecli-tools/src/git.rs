//! Fixed add/commit/push workflow expressed as a setup plan.

use livecli_core::process::ShellSpec;
use livecli_core::setup::{SetupPlan, SetupStep};

/// Build the `git add` → `git commit` → `git push` plan for `message`.
///
/// The message is quoted for `shell` so it reaches git as a single argument.
pub fn git_workflow_plan(message: &str, shell: &ShellSpec) -> SetupPlan {
    SetupPlan::new(vec![
        SetupStep::new("git add .", "Stage all changes"),
        SetupStep::new(
            format!("git commit -m {}", quote_arg(shell, message)),
            "Commit staged changes",
        ),
        SetupStep::new("git push", "Push to the remote"),
    ])
}

/// Quote `arg` as a single word for `shell`.
pub fn quote_arg(shell: &ShellSpec, arg: &str) -> String {
    if shell.flag == "/C" {
        // cmd.exe: double quotes, embedded quotes doubled
        format!("\"{}\"", arg.replace('"', "\"\""))
    } else if shell.flag == "-Command" {
        // PowerShell: verbatim string, embedded single quotes doubled
        format!("'{}'", arg.replace('\'', "''"))
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
