//! Setup plan schema and parser.
//!
//! The model is asked for a single JSON object:
//!
//! ```json
//! {"steps": [{"command": "sudo apt update", "description": "Update package index", "optional": false}]}
//! ```
//!
//! Models often wrap that object in Markdown code fences, so the raw text is
//! normalized before decoding.

use crate::error::PlanParseError;
use serde::{Deserialize, Serialize};

/// One command in a setup plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupStep {
    pub command: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub optional: bool,
}

impl SetupStep {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// An ordered list of setup steps. Execution order is list order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupPlan {
    pub steps: Vec<SetupStep>,
}

impl SetupPlan {
    pub fn new(steps: Vec<SetupStep>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Parse model output into a plan. See [`parse_plan`].
    pub fn parse(raw: &str) -> Result<Self, PlanParseError> {
        parse_plan(raw)
    }
}

/// Strip surrounding whitespace and Markdown code fences.
///
/// A leading fence may carry a language tag (```` ```json ````); the tag runs
/// to the end of the fence line.
pub fn normalize_model_output(raw: &str) -> &str {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the language tag, if any, up to the first newline.
        text = match rest.find('\n') {
            Some(idx) if is_fence_tag(rest[..idx].trim()) => &rest[idx + 1..],
            Some(_) => rest,
            // Single-line fenced text: only a tag made of letters is removable
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }

    text.trim()
}

fn is_fence_tag(tag: &str) -> bool {
    tag.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ' ')
}

/// Parse raw model output into a [`SetupPlan`].
///
/// Either the whole plan is valid or the call fails; no partial plan is returned.
pub fn parse_plan(raw: &str) -> Result<SetupPlan, PlanParseError> {
    let text = normalize_model_output(raw);

    let malformed = |reason: String, step: Option<usize>| PlanParseError::MalformedPlan {
        reason,
        step,
        text: text.to_string(),
    };

    let plan: SetupPlan =
        serde_json::from_str(text).map_err(|e| malformed(format!("invalid JSON: {}", e), None))?;

    let steps = plan
        .steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| {
            let command = step.command.trim();
            if command.is_empty() {
                return Err(malformed(
                    format!("step {} has an empty command", i + 1),
                    Some(i + 1),
                ));
            }
            Ok(SetupStep {
                command: command.to_string(),
                description: step.description.trim().to_string(),
                optional: step.optional,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SetupPlan { steps })
}
