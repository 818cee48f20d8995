//! Process runner contract.
//!
//! The executor only knows how to ask a [`CommandRunner`] to run a command
//! string through a shell; the streaming implementation lives in
//! `livecli-tools`.

use crate::error::ExecutionError;
use async_trait::async_trait;
use std::path::Path;

/// A shell program and the flag that makes it run a command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSpec {
    pub program: String,
    pub flag: String,
}

impl ShellSpec {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        let flag = Self::command_flag(&program).to_string();
        Self { program, flag }
    }

    /// Resolve the shell to use: `preferred`, then `$SHELL`, then the
    /// platform default (`sh`, or `cmd` on Windows).
    pub fn resolve(preferred: Option<&str>) -> Self {
        let env_shell = std::env::var("SHELL").ok();
        Self::resolve_with(preferred, env_shell.as_deref())
    }

    /// Resolution with an explicit `$SHELL` value.
    pub fn resolve_with(preferred: Option<&str>, env_shell: Option<&str>) -> Self {
        fn pick(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }

        if let Some(shell) = pick(preferred) {
            return Self::new(shell);
        }
        if cfg!(windows) {
            return Self::new("cmd");
        }
        Self::new(pick(env_shell).unwrap_or("sh"))
    }

    /// The flag that passes a command string to `program`.
    fn command_flag(program: &str) -> &'static str {
        let name = Path::new(program)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(program)
            .to_lowercase();
        match name.as_str() {
            "cmd" => "/C",
            "powershell" | "pwsh" => "-Command",
            _ => "-c",
        }
    }
}

impl std::fmt::Display for ShellSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program, self.flag)
    }
}

/// Runs a single command to completion.
///
/// Implementations return only after the child has exited and all of its
/// output has been forwarded.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        shell: &ShellSpec,
        working_dir: &Path,
        command: &str,
    ) -> Result<(), ExecutionError>;
}
