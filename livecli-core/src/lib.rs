//! # LiveCLI Core
//!
//! Core library for the LiveCLI terminal assistant. Provides LLM provider
//! access, chat sessions, configuration, platform detection, and the guided
//! setup pipeline (plan generation, parsing, and confirmed execution).

pub mod brain;
pub mod chat;
pub mod config;
pub mod error;
pub mod platform;
pub mod process;
pub mod providers;
pub mod setup;
pub mod types;

pub use brain::{LlmProvider, MockLlmProvider, TextGenerator};
pub use chat::{ChatSession, ask};
pub use config::{LiveCliConfig, load_config};
pub use error::{LiveCliError, Result};
pub use platform::detect_platform;
pub use process::{CommandRunner, ShellSpec};
pub use providers::create_provider;
pub use setup::{
    ExecutionLedger, ExecutionReport, ExecutorOptions, PlanExecutor, PlanGenerator, SetupCallback,
    SetupPlan, SetupStatus, SetupStep, StepOutcome,
};
pub use types::{CompletionRequest, CompletionResponse, Message, Role};
