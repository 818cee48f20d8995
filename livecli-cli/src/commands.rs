//! CLI subcommand handlers.

use crate::callback::TerminalCallback;
use crate::{Commands, ConfigAction};
use livecli_core::config::{
    LiveCliConfig, load_config, user_config_path, workspace_config_path, write_default_config,
};
use livecli_core::error::{ExecutionError, GenerationError};
use livecli_core::setup::{ExecutionLedger, ExecutorOptions, PlanExecutor, PlanGenerator};
use livecli_core::{CommandRunner, ShellSpec, create_provider, detect_platform};
use livecli_tools::{ShellRunner, git_workflow_plan};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

const RULE: &str = "─────────────────────────────────────────────────────────────";

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    config: LiveCliConfig,
    workspace: &Path,
) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Exec {
            command,
            shell,
            dir,
        } => {
            let shell = ShellSpec::resolve(shell.as_deref().or(config.exec.shell.as_deref()));
            let dir = dir.unwrap_or_else(|| working_dir(&config, workspace));
            let result = run_exec(&command.join(" "), &shell, &dir).await;
            Ok(ExitCode::from(exec_exit_code(&result)))
        }
        Commands::Setup { task, yes, dry_run } => {
            run_setup(&task.join(" "), yes, dry_run, &config, workspace).await
        }
        Commands::Git { message, yes } => {
            run_git(&message.join(" "), yes, &config, workspace).await
        }
        Commands::Ask { question } => run_ask(&question.join(" "), &config).await,
        Commands::Chat {
            system,
            max_tokens,
            temperature,
        } => {
            let mut chat = config.chat.clone();
            if let Some(system) = system {
                chat.system_prompt = system;
            }
            if let Some(max_tokens) = max_tokens {
                chat.max_tokens = max_tokens;
            }
            if let Some(temperature) = temperature {
                chat.temperature = temperature;
            }
            crate::repl::run_chat(&config, &chat).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Interactive => {
            crate::repl::run_interactive(&config, workspace).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => handle_config(action, workspace, None),
    }
}

/// Handle `config init` and `config show`.
pub fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    match action {
        ConfigAction::Init => {
            let config_path = config_file
                .map(Path::to_path_buf)
                .unwrap_or_else(|| workspace_config_path(workspace));
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(ExitCode::SUCCESS);
            }

            write_default_config(&config_path)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(ExitCode::SUCCESS)
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), config_file)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            if let Some(user) = user_config_path() {
                println!("# user config:      {}", user.display());
            }
            println!(
                "# workspace config: {}",
                workspace_config_path(workspace).display()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Working directory for commands: configured, else the workspace.
pub(crate) fn working_dir(config: &LiveCliConfig, workspace: &Path) -> PathBuf {
    config
        .exec
        .working_dir
        .clone()
        .unwrap_or_else(|| workspace.to_path_buf())
}

/// Run one command with a banner and a success/failure footer.
pub(crate) async fn run_exec(
    command: &str,
    shell: &ShellSpec,
    dir: &Path,
) -> Result<(), ExecutionError> {
    println!("\n\x1b[1;32m▶ Executing: {}\x1b[0m", command);
    println!("\x1b[36m{}\x1b[0m", RULE);

    let result = ShellRunner::new().run(shell, dir, command).await;
    match &result {
        Ok(()) => println!("\n\x1b[1;32m✓ Command completed successfully\x1b[0m"),
        Err(e) => println!("\n\x1b[1;31m✗ Command failed: {}\x1b[0m", e),
    }
    println!("\x1b[36m{}\x1b[0m\n", RULE);
    result
}

/// Map a command result to the process exit status.
fn exec_exit_code(result: &Result<(), ExecutionError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(ExecutionError::NonZeroExit { code }) => {
            u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1)
        }
        Err(ExecutionError::Spawn { .. }) => 127,
    }
}

async fn run_setup(
    task: &str,
    yes: bool,
    dry_run: bool,
    config: &LiveCliConfig,
    workspace: &Path,
) -> anyhow::Result<ExitCode> {
    let provider = create_provider(&config.llm)?;
    let platform = detect_platform();

    println!("\n\x1b[1;36m🔧 Setup Assistant\x1b[0m");
    println!("\n📋 Task: {}", task);
    println!("🖥️  Detected OS: {}", platform);
    println!("\x1b[33m\n🤖 Generating setup plan...\x1b[0m");

    let plan = match PlanGenerator::from_config(provider.as_ref(), &config.setup)
        .generate(task, &platform)
        .await
    {
        Ok(plan) => plan,
        Err(GenerationError::InvalidPlan(e)) => {
            eprintln!("\n\x1b[31mThe AI response could not be used as a setup plan:\x1b[0m");
            eprintln!("\x1b[90m{}\x1b[0m", e.text());
            anyhow::bail!("{}", e);
        }
        Err(e) => anyhow::bail!("{}", e),
    };

    let options = ExecutorOptions {
        auto_confirm: yes || config.setup.auto_confirm,
        dry_run,
        confirm_each_step: true,
    };
    let status = execute_plan(&plan, "Setup Plan", options, config, workspace).await;
    Ok(ExitCode::from(status))
}

async fn run_git(
    message: &str,
    yes: bool,
    config: &LiveCliConfig,
    workspace: &Path,
) -> anyhow::Result<ExitCode> {
    let shell = ShellSpec::resolve(config.exec.shell.as_deref());
    let plan = git_workflow_plan(message, &shell);

    let options = ExecutorOptions {
        auto_confirm: yes,
        dry_run: false,
        confirm_each_step: false,
    };
    let status = execute_plan(&plan, "Git Workflow", options, config, workspace).await;
    Ok(ExitCode::from(status))
}

/// Execute `plan` against the terminal and return the exit status byte.
async fn execute_plan(
    plan: &livecli_core::SetupPlan,
    heading: &'static str,
    options: ExecutorOptions,
    config: &LiveCliConfig,
    workspace: &Path,
) -> u8 {
    let executor = PlanExecutor::new(
        Arc::new(ShellRunner::new()),
        Arc::new(TerminalCallback::new(heading)),
        ShellSpec::resolve(config.exec.shell.as_deref()),
        working_dir(config, workspace),
    )
    .with_options(options);

    let mut ledger = ExecutionLedger::new();
    let report = executor.execute(plan, &mut ledger).await;
    u8::try_from(report.status.exit_code()).unwrap_or(1)
}

async fn run_ask(question: &str, config: &LiveCliConfig) -> anyhow::Result<ExitCode> {
    let provider = create_provider(&config.llm)?;

    println!("\n\x1b[1;36m❓ Question:\x1b[0m {}", question);
    println!("\x1b[33m🤔 Thinking...\x1b[0m\n");

    let answer = livecli_core::ask(provider.as_ref(), question, &config.chat).await?;
    println!("\x1b[1;32m💡 Answer:\x1b[0m");
    println!("{}\n", answer);
    Ok(ExitCode::SUCCESS)
}

/// Print the banner shown when no subcommand is given.
pub fn print_welcome() {
    println!("\n\x1b[1;36m╔═══════════════════════════════════════════════════════════╗\x1b[0m");
    println!("\x1b[1;36m║            🚀 Welcome to LiveCLI v{:<24}║\x1b[0m", env!("CARGO_PKG_VERSION"));
    println!("\x1b[1;36m╚═══════════════════════════════════════════════════════════╝\x1b[0m");
    println!("\nAvailable Commands:");
    println!("\x1b[33m  livecli exec <command>    - Execute system commands\x1b[0m");
    println!("\x1b[33m  livecli setup <task>      - AI-powered setup assistant\x1b[0m");
    println!("\x1b[33m  livecli git <message>     - Automate git add, commit, push\x1b[0m");
    println!("\x1b[33m  livecli chat              - Start AI chat session\x1b[0m");
    println!("\x1b[33m  livecli interactive       - Interactive mode (exec + chat)\x1b[0m");
    println!("\x1b[33m  livecli ask <question>    - Quick AI question\x1b[0m");
    println!("\x1b[33m  livecli config init|show  - Manage configuration\x1b[0m");
    println!("\nExamples:");
    println!("  livecli exec \"ls -la\"");
    println!("  livecli setup \"rust into my system\"");
    println!("  livecli git \"fix typo in README\"");
    println!("  livecli ask \"How do I list all running processes?\"");
    println!("\nUse 'livecli <command> --help' for more information about a command.\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_exit_codes() {
        assert_eq!(exec_exit_code(&Ok(())), 0);
        assert_eq!(
            exec_exit_code(&Err(ExecutionError::NonZeroExit { code: 2 })),
            2
        );
        assert_eq!(
            exec_exit_code(&Err(ExecutionError::NonZeroExit { code: -1 })),
            1
        );
        assert_eq!(
            exec_exit_code(&Err(ExecutionError::NonZeroExit { code: 256 })),
            1
        );
        assert_eq!(
            exec_exit_code(&Err(ExecutionError::Spawn {
                shell: "x".into(),
                message: "y".into()
            })),
            127
        );
    }

    #[test]
    fn test_working_dir_prefers_config() {
        let mut config = LiveCliConfig::default();
        assert_eq!(working_dir(&config, Path::new("/ws")), PathBuf::from("/ws"));
        config.exec.working_dir = Some(PathBuf::from("/elsewhere"));
        assert_eq!(
            working_dir(&config, Path::new("/ws")),
            PathBuf::from("/elsewhere")
        );
    }

    #[test]
    fn test_config_init_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        handle_config(ConfigAction::Init, dir.path(), None).unwrap();
        let path = workspace_config_path(dir.path());
        assert!(path.exists());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[setup]"));

        std::fs::write(&path, "# custom\n").unwrap();
        handle_config(ConfigAction::Init, dir.path(), None).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# custom\n");
    }
}
