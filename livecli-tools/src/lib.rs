//! # LiveCLI Tools
//!
//! Process execution for LiveCLI: the streaming [`ShellRunner`] used by
//! `exec`, `setup` and `git`, and the fixed git workflow plan.

pub mod git;
pub mod shell;

pub use git::git_workflow_plan;
pub use shell::{OutputLine, OutputStream, ShellRunner};
