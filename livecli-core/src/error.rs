//! Error types for the LiveCLI core library.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering LLM, process execution, setup plan, and configuration domains.

use std::path::PathBuf;

/// Top-level error type for the LiveCLI core library.
#[derive(Debug, thiserror::Error)]
pub enum LiveCliError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Plan error: {0}")]
    Plan(#[from] PlanParseError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("No response from AI")]
    EmptyResponse,

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from running a shell command as a child process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("failed to start '{shell}': {message}")]
    Spawn { shell: String, message: String },

    #[error("command exited with status {code}")]
    NonZeroExit { code: i32 },
}

/// Errors from turning model output into a [`SetupPlan`](crate::setup::SetupPlan).
#[derive(Debug, thiserror::Error)]
pub enum PlanParseError {
    #[error("malformed plan: {reason}")]
    MalformedPlan {
        reason: String,
        /// 1-based index of the offending step, when a single step is at fault.
        step: Option<usize>,
        /// The normalized text that failed to parse.
        text: String,
    },
}

impl PlanParseError {
    /// The normalized model output that was rejected.
    pub fn text(&self) -> &str {
        match self {
            PlanParseError::MalformedPlan { text, .. } => text,
        }
    }
}

/// Errors from producing a setup plan.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("AI request failed: {0}")]
    ModelUnavailable(#[from] LlmError),

    #[error("AI returned an unusable plan: {0}")]
    InvalidPlan(#[from] PlanParseError),
}

/// A confirmation answer that matched none of the accepted tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized response '{answer}'")]
pub struct InvalidUserResponse {
    pub answer: String,
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("API key not set. Use --api-key or set the {var} environment variable.")]
    ApiKeyMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `LiveCliError`.
pub type Result<T> = std::result::Result<T, LiveCliError>;
