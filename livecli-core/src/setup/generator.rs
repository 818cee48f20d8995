//! Plan generation: ask the model for a setup plan and parse its reply.

use super::plan::{SetupPlan, parse_plan};
use crate::brain::TextGenerator;
use crate::config::SetupConfig;
use crate::error::GenerationError;
use tracing::{debug, info, warn};

/// Build the system instruction for a setup task on `platform`.
pub fn build_system_prompt(platform: &str, task: &str) -> String {
    format!(
        r#"You are an expert system administrator and DevOps engineer. Generate a precise, safe setup plan for the user's request.

Operating System: {platform}
Task: {task}

IMPORTANT RULES:
1. Generate ONLY the necessary commands for THIS specific OS
2. Use the system's package manager (apt, dnf, yum, pacman, apk, zypper, brew, winget, etc.)
3. Each command should be safe and commonly used
4. Include verification commands when helpful
5. Mark non-essential steps as optional
6. Keep commands simple and atomic (one logical action per command)
7. Include sudo only when absolutely necessary
8. For URLs/downloads, use official sources only

Respond with ONLY a valid JSON object in this EXACT format (no markdown, no explanation):
{{
  "steps": [
    {{
      "command": "the exact command to run",
      "description": "brief description of what this does",
      "optional": false
    }}
  ]
}}

Example for "install docker":
{{
  "steps": [
    {{"command": "sudo apt update", "description": "Update package index", "optional": false}},
    {{"command": "sudo apt install -y docker.io", "description": "Install Docker", "optional": false}},
    {{"command": "sudo systemctl start docker", "description": "Start Docker service", "optional": false}},
    {{"command": "sudo systemctl enable docker", "description": "Enable Docker on boot", "optional": false}},
    {{"command": "sudo usermod -aG docker $USER", "description": "Add user to docker group", "optional": true}},
    {{"command": "docker --version", "description": "Verify Docker installation", "optional": false}}
  ]
}}"#
    )
}

/// The user turn sent alongside the system instruction.
pub fn build_user_prompt(task: &str) -> String {
    format!("Generate setup commands for: {}", task)
}

/// Produces setup plans from a single model request.
pub struct PlanGenerator<'a, G: TextGenerator + ?Sized> {
    generator: &'a G,
    temperature: f32,
    max_tokens: usize,
}

impl<'a, G: TextGenerator + ?Sized> PlanGenerator<'a, G> {
    pub fn new(generator: &'a G, temperature: f32, max_tokens: usize) -> Self {
        Self {
            generator,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(generator: &'a G, config: &SetupConfig) -> Self {
        Self::new(generator, config.temperature, config.max_tokens)
    }

    /// Generate a plan for `task` on `platform`. One attempt; no re-prompting.
    pub async fn generate(&self, task: &str, platform: &str) -> Result<SetupPlan, GenerationError> {
        let system = build_system_prompt(platform, task);
        let user = build_user_prompt(task);

        info!(task, platform, "Generating setup plan");
        let raw = self
            .generator
            .generate_text(&system, &user, self.temperature, self.max_tokens)
            .await?;
        debug!(chars = raw.len(), "Received plan text");

        let plan = parse_plan(&raw)
            .inspect_err(|e| warn!(error = %e, "Model returned an unusable plan"))?;
        info!(steps = plan.len(), "Setup plan parsed");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::error::{LlmError, PlanParseError};
    use crate::types::Role;

    const ONE_STEP: &str = r#"{"steps":[{"command":"node --version","description":"Check node","optional":false}]}"#;

    #[test]
    fn test_system_prompt_mentions_platform_and_task() {
        let prompt = build_system_prompt("Fedora Linux (dnf)", "install node");
        assert!(prompt.contains("Operating System: Fedora Linux (dnf)"));
        assert!(prompt.contains("Task: install node"));
        assert!(prompt.contains("\"steps\": ["));
        assert!(prompt.contains("\"optional\": false"));
        assert!(prompt.contains("sudo only when absolutely necessary"));
    }

    #[test]
    fn test_user_prompt() {
        assert_eq!(
            build_user_prompt("setup rust"),
            "Generate setup commands for: setup rust"
        );
    }

    #[tokio::test]
    async fn test_generate_sends_single_turn_request() {
        let provider = MockLlmProvider::with_response(ONE_STEP);
        let generator = PlanGenerator::from_config(&provider, &SetupConfig::default());

        let plan = generator.generate("install node", "macOS").await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].command, "node --version");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("Operating System: macOS"));
        assert_eq!(
            request.messages[1].content,
            "Generate setup commands for: install node"
        );
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, Some(2000));
    }

    #[tokio::test]
    async fn test_generate_accepts_fenced_reply() {
        let fenced = format!("```json\n{}\n```", ONE_STEP);
        let provider = MockLlmProvider::with_response(&fenced);
        let plan = PlanGenerator::new(&provider, 0.3, 2000)
            .generate("install node", "macOS")
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_is_model_unavailable() {
        let provider = MockLlmProvider::with_error(LlmError::AuthFailed {
            provider: "OpenAI-compatible".into(),
        });
        let err = PlanGenerator::new(&provider, 0.3, 2000)
            .generate("install node", "macOS")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::ModelUnavailable(LlmError::AuthFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_prose_is_invalid_plan() {
        let provider = MockLlmProvider::with_response("Just run the installer.");
        let err = PlanGenerator::new(&provider, 0.3, 2000)
            .generate("install node", "macOS")
            .await
            .unwrap_err();
        match err {
            GenerationError::InvalidPlan(PlanParseError::MalformedPlan { text, .. }) => {
                assert_eq!(text, "Just run the installer.");
            }
            other => panic!("Expected InvalidPlan, got: {:?}", other),
        }
        assert_eq!(provider.requests().len(), 1);
    }
}
