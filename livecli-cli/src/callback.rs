//! Terminal rendering and prompts for plan execution.

use livecli_core::error::InvalidUserResponse;
use livecli_core::setup::{
    ExecutionReport, SetupCallback, SetupPlan, SetupStatus, SetupStep, StepOutcome,
};
use std::io::{self, BufRead, Write};

/// Prints plan progress to stdout and reads answers from stdin.
pub(crate) struct TerminalCallback {
    heading: &'static str,
}

impl TerminalCallback {
    pub(crate) fn new(heading: &'static str) -> Self {
        Self { heading }
    }
}

/// Read one answer line from `reader`: trimmed and lowercased, empty on EOF.
pub(crate) fn read_answer<R: BufRead>(reader: &mut R) -> String {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(_) => line.trim().to_lowercase(),
        Err(_) => String::new(),
    }
}

/// Render one step for the plan listing.
fn format_step(index: usize, step: &SetupStep) -> String {
    let marker = if step.optional {
        " \x1b[90m[OPTIONAL]\x1b[0m"
    } else {
        ""
    };
    let description = if step.description.is_empty() {
        step.command.as_str()
    } else {
        step.description.as_str()
    };
    format!(
        "  {}. {}{}\n     \x1b[36m$ {}\x1b[0m",
        index, description, marker, step.command
    )
}

#[async_trait::async_trait]
impl SetupCallback for TerminalCallback {
    async fn on_plan(&self, plan: &SetupPlan) {
        println!("\n\x1b[1;36m📝 {} ({} steps):\x1b[0m\n", self.heading, plan.len());
        for (i, step) in plan.steps.iter().enumerate() {
            println!("{}", format_step(i + 1, step));
        }
    }

    async fn prompt(&self, question: &str) -> String {
        print!("\n\x1b[33m{}\x1b[0m > ", question);
        let _ = io::stdout().flush();
        let stdin = io::stdin();
        read_answer(&mut stdin.lock())
    }

    async fn on_nothing_to_do(&self) {
        println!(
            "\n\x1b[33m⚠️  No setup steps were generated. The task might already be complete or unclear.\x1b[0m"
        );
    }

    async fn on_cancelled(&self) {
        println!("\n\x1b[33m✗ Cancelled. No commands were executed.\x1b[0m");
    }

    async fn on_step_start(&self, index: usize, total: usize, step: &SetupStep) {
        let optional = if step.optional { " (optional)" } else { "" };
        println!(
            "\n\x1b[1;34m[{}/{}]\x1b[0m {}{}",
            index, total, step.description, optional
        );
        println!("\x1b[36m$ {}\x1b[0m", step.command);
    }

    async fn on_invalid_response(&self, error: &InvalidUserResponse) {
        println!(
            "\x1b[33mUnrecognized answer '{}'; skipping this step.\x1b[0m",
            error.answer
        );
    }

    async fn on_skip_all(&self, _index: usize) {
        println!("\n\x1b[33m⏭️  Skipping remaining steps\x1b[0m");
    }

    async fn on_step_finished(&self, index: usize, _step: &SetupStep, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Succeeded => println!("\x1b[32m✓ Step {} completed\x1b[0m", index),
            StepOutcome::Failed(e) => println!("\x1b[1;31m✗ Step {} failed: {}\x1b[0m", index, e),
            StepOutcome::SkippedByUser => println!("\x1b[33m⏭️  Skipped\x1b[0m"),
            StepOutcome::SkippedAsRemaining | StepOutcome::NotReached => {}
        }
    }

    async fn on_summary(&self, report: &ExecutionReport) {
        match report.status {
            SetupStatus::Completed | SetupStatus::CompletedWithSkips => println!(
                "\n\x1b[1;32m✓ Executed {}/{} steps successfully\x1b[0m",
                report.executed, report.total
            ),
            SetupStatus::Aborted { step } => println!(
                "\n\x1b[1;31m✗ Stopped at step {}. Executed {}/{} steps successfully\x1b[0m",
                step, report.executed, report.total
            ),
            SetupStatus::DryRun => {
                println!("\n\x1b[90mDry run: no commands were executed.\x1b[0m")
            }
            SetupStatus::NothingToDo | SetupStatus::Cancelled => {}
        }
    }
}
