//! LiveCLI: AI-powered command-line assistant.
//!
//! Runs shell commands, answers questions, chats, and turns natural-language
//! setup requests into confirmed, step-by-step command plans.

mod callback;
mod commands;
mod repl;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// LiveCLI: your AI-powered terminal assistant
#[derive(Parser, Debug)]
#[command(name = "livecli", version, about, long_about = None)]
struct Cli {
    /// API key for the LLM provider (overrides the environment)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// LLM model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// LLM provider: openai or gemini
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace directory
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Execute a system command with live output
    Exec {
        /// Command to run
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
        /// Shell to run the command with
        #[arg(short, long)]
        shell: Option<String>,
        /// Working directory for the command
        #[arg(short = 'd', long = "dir")]
        dir: Option<PathBuf>,
    },
    /// AI-powered setup assistant
    Setup {
        /// What to set up, e.g. "rust into my system"
        #[arg(required = true)]
        task: Vec<String>,
        /// Run every step without asking
        #[arg(short, long)]
        yes: bool,
        /// Show the plan without executing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Stage, commit and push in one go
    Git {
        /// Commit message
        #[arg(required = true)]
        message: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Ask the AI a quick question
    Ask {
        /// The question
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Start an AI chat session
    Chat {
        /// System prompt for the session
        #[arg(short, long)]
        system: Option<String>,
        /// Maximum tokens per reply
        #[arg(short = 't', long)]
        max_tokens: Option<usize>,
        /// Sampling temperature
        #[arg(short = 'T', long)]
        temperature: Option<f32>,
    },
    /// Interactive mode: commands, questions and chat in one prompt
    Interactive,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file
    Init,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "livecli", "livecli")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "livecli.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let Some(command) = cli.command else {
        commands::print_welcome();
        return Ok(ExitCode::SUCCESS);
    };

    if let Commands::Config { action } = command {
        return commands::handle_config(action, &workspace, cli.config.as_deref());
    }

    let mut config = livecli_core::load_config(Some(&workspace), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // CLI flags override every other layer
    if let Some(provider) = cli.provider {
        config.llm.provider = provider;
    }
    if let Some(model) = cli.model {
        config.llm.model = Some(model);
    }
    if let Some(key) = cli.api_key {
        config.llm.api_key = Some(key);
    }
    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }

    commands::handle_command(command, config, &workspace).await
}
