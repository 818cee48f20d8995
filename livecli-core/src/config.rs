//! Configuration system for LiveCLI.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/livecli/config.toml` and/or `.livecli/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default system instruction for `ask` and `chat`.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant specialized in programming, system administration, and command-line tools.";

/// Top-level configuration for LiveCLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveCliConfig {
    pub llm: LlmConfig,
    pub chat: ChatConfig,
    pub setup: SetupConfig,
    pub exec: ExecConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: "openai" or "gemini".
    pub provider: String,
    /// Model identifier. Falls back to the provider's default model when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Environment variable name containing the API key.
    /// Falls back to `OPENAI_API_KEY` / `GEMINI_API_KEY` depending on the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// API key passed directly (e.g. via `--api-key`). Never written to disk.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Optional base URL override for the API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            api_key_env: None,
            api_key: None,
            base_url: None,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// The model to use, honoring the provider's default when none is configured.
    pub fn resolved_model(&self) -> &str {
        match self.model.as_deref() {
            Some(model) if !model.trim().is_empty() => model,
            _ => match self.provider.as_str() {
                "gemini" => "gemini-1.5-flash",
                _ => "gpt-4o-mini",
            },
        }
    }

    /// The environment variable consulted for the API key.
    pub fn resolved_api_key_env(&self) -> &str {
        match self.api_key_env.as_deref() {
            Some(var) if !var.is_empty() => var,
            _ => match self.provider.as_str() {
                "gemini" => "GEMINI_API_KEY",
                _ => "OPENAI_API_KEY",
            },
        }
    }

    /// Resolve the API key from the explicit value or the environment.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                std::env::var(self.resolved_api_key_env())
                    .ok()
                    .filter(|k| !k.is_empty())
            })
            .ok_or_else(|| ConfigError::ApiKeyMissing {
                var: self.resolved_api_key_env().to_string(),
            })
    }

    /// Validate this LLM config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !matches!(self.provider.as_str(), "openai" | "gemini") {
            warnings.push(format!(
                "unknown provider '{}'; requests will use the OpenAI-compatible API",
                self.provider
            ));
        }
        if self.timeout_secs == 0 {
            warnings.push("timeout_secs is 0; requests will fail immediately".to_string());
        }
        warnings
    }
}

/// Settings for `ask`, `chat`, and interactive mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System instruction sent with every chat request.
    pub system_prompt: String,
    /// Sampling temperature (0.0-2.0).
    pub temperature: f32,
    /// Maximum tokens in a response.
    pub max_tokens: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// Settings for setup plan generation and execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Sampling temperature for plan generation. Low values keep plans stable.
    pub temperature: f32,
    /// Output token ceiling for plan generation.
    pub max_tokens: usize,
    /// Skip all confirmation prompts.
    pub auto_confirm: bool,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 2000,
            auto_confirm: false,
        }
    }
}

/// Settings for running shell commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Shell used for `-c` invocations. Defaults to `$SHELL`, then `sh`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Working directory for commands. Defaults to the current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
}

impl LiveCliConfig {
    /// Validate the whole configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.llm.validate();
        for (name, temperature) in [
            ("chat.temperature", self.chat.temperature),
            ("setup.temperature", self.setup.temperature),
        ] {
            if !(0.0..=2.0).contains(&temperature) {
                warnings.push(format!(
                    "{} ({}) is outside the 0.0-2.0 range",
                    name, temperature
                ));
            }
        }
        if self.setup.max_tokens == 0 || self.chat.max_tokens == 0 {
            warnings.push("max_tokens of 0 leaves no room for a response".to_string());
        }
        warnings
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "livecli", "livecli")
}

/// Path of the user-level configuration file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// Path of the workspace-level configuration file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".livecli").join("config.toml")
}

/// Load configuration from all layers.
///
/// `config_file`, when given, replaces the user and workspace files and must exist.
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<LiveCliConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(LiveCliConfig::default()));

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        figment = figment.merge(Toml::file(path));
    } else {
        // User-level config
        if let Some(user_config) = user_config_path()
            && user_config.exists()
        {
            figment = figment.merge(Toml::file(&user_config));
        }

        // Workspace-level config
        if let Some(ws) = workspace {
            let ws_config = workspace_config_path(ws);
            if ws_config.exists() {
                figment = figment.merge(Toml::file(&ws_config));
            }
        }
    }

    // Environment variables (LIVECLI_LLM__MODEL, LIVECLI_SETUP__AUTO_CONFIRM, etc.)
    figment = figment.merge(Env::prefixed("LIVECLI_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

/// Write the default configuration to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> crate::error::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents =
        toml::to_string_pretty(&LiveCliConfig::default()).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
    std::fs::write(path, contents)?;
    Ok(())
}
