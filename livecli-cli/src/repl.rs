//! Chat and interactive REPL loops.

use crate::commands::{run_exec, working_dir};
use livecli_core::config::{ChatConfig, LiveCliConfig};
use livecli_core::{ChatSession, ShellSpec, create_provider};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// One parsed line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum ReplInput<'a> {
    Empty,
    Exit,
    Clear,
    Exec(&'a str),
    Ask(&'a str),
    Chat(&'a str),
}

fn parse_input(line: &str) -> ReplInput<'_> {
    let line = line.trim();
    match line {
        "" => ReplInput::Empty,
        "/exit" | "/quit" => ReplInput::Exit,
        "/clear" => ReplInput::Clear,
        _ => {
            if let Some(rest) = command_arg(line, "/exec") {
                ReplInput::Exec(rest)
            } else if let Some(rest) = command_arg(line, "@ask") {
                ReplInput::Ask(rest)
            } else {
                ReplInput::Chat(line)
            }
        }
    }
}

/// `"/exec ls"` with prefix `"/exec"` → `Some("ls")`. The prefix must be a whole word.
fn command_arg<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Print `prompt` and read a line. `None` on EOF.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

/// Run a multi-turn chat session until `/exit`, `/quit` or EOF.
pub async fn run_chat(config: &LiveCliConfig, chat: &ChatConfig) -> anyhow::Result<()> {
    let provider = create_provider(&config.llm)?;
    let mut session = ChatSession::new(provider, chat);

    println!("\n\x1b[1;36m╔═══════════════════════════════════════════════════════════╗\x1b[0m");
    println!("\x1b[1;36m║           💬 AI Chat Session Started                      ║\x1b[0m");
    println!("\x1b[1;36m╚═══════════════════════════════════════════════════════════╝\x1b[0m");
    println!("\x1b[33m\nCommands: /clear (clear history), /exit or /quit (leave)\x1b[0m");
    println!("Model: {}\n", session.model_name());

    while let Some(line) = read_line("\x1b[1;35mYou>\x1b[0m ") {
        match parse_input(&line) {
            ReplInput::Empty => continue,
            ReplInput::Exit => break,
            ReplInput::Clear => {
                session.clear();
                println!("\x1b[32m✓ Conversation history cleared\x1b[0m");
            }
            _ => send_chat(&mut session, line.trim()).await,
        }
    }

    println!("\n\x1b[1;32m👋 Goodbye!\x1b[0m");
    Ok(())
}

/// Interactive mode: `/exec` runs commands, `@ask` asks one-off questions,
/// anything else continues the chat.
pub async fn run_interactive(config: &LiveCliConfig, workspace: &Path) -> anyhow::Result<()> {
    let provider = create_provider(&config.llm)?;
    let mut session = ChatSession::new(provider.clone(), &config.chat);
    let shell = ShellSpec::resolve(config.exec.shell.as_deref());
    let dir = working_dir(config, workspace);

    println!("\n\x1b[1;36m╔═══════════════════════════════════════════════════════════╗\x1b[0m");
    println!("\x1b[1;36m║         🎮 Interactive Mode - LiveCLI                     ║\x1b[0m");
    println!("\x1b[1;36m╚═══════════════════════════════════════════════════════════╝\x1b[0m");
    println!("\nMode Guide:");
    println!("\x1b[33m  /exec <command>  → Execute system command\x1b[0m");
    println!("\x1b[33m  @ask <question>  → Ask AI a quick question\x1b[0m");
    println!("\x1b[33m  <message>        → Chat with AI\x1b[0m");
    println!("\x1b[33m  /clear           → Clear chat history\x1b[0m");
    println!("\x1b[33m  /exit            → Exit interactive mode\x1b[0m\n");

    while let Some(line) = read_line("\x1b[1;36mlivecli>\x1b[0m ") {
        match parse_input(&line) {
            ReplInput::Empty => continue,
            ReplInput::Exit => break,
            ReplInput::Clear => {
                session.clear();
                println!("\x1b[32m✓ Chat history cleared\x1b[0m");
            }
            ReplInput::Exec("") => println!("\x1b[33mUsage: /exec <command>\x1b[0m"),
            ReplInput::Exec(command) => {
                // Failures are already reported by run_exec
                let _ = run_exec(command, &shell, &dir).await;
            }
            ReplInput::Ask("") => println!("\x1b[33mUsage: @ask <question>\x1b[0m"),
            ReplInput::Ask(question) => {
                match livecli_core::ask(provider.as_ref(), question, &config.chat).await {
                    Ok(answer) => println!("\n\x1b[1;32m💡\x1b[0m {}\n", answer),
                    Err(e) => println!("\x1b[31mError: {}\x1b[0m\n", e),
                }
            }
            ReplInput::Chat(message) => send_chat(&mut session, message).await,
        }
    }

    println!("\n\x1b[1;32m👋 Exiting interactive mode. Goodbye!\x1b[0m");
    Ok(())
}

async fn send_chat(session: &mut ChatSession, message: &str) {
    print!("\n\x1b[1;34mAI>\x1b[0m ");
    let _ = io::stdout().flush();
    match session.send(message).await {
        Ok(reply) => println!("{}\n", reply),
        Err(e) => println!("\x1b[31mError: {}\x1b[0m\n", e),
    }
}
