//! Conversational sessions with the LLM.
//!
//! A `ChatSession` keeps the running message history for multi-turn chat;
//! `ask` is the stateless one-shot variant.

use crate::brain::{LlmProvider, TextGenerator};
use crate::config::ChatConfig;
use crate::error::LlmError;
use crate::types::{CompletionRequest, Message};
use std::sync::Arc;
use tracing::debug;

/// System instruction for one-shot questions.
pub const ASK_SYSTEM_PROMPT: &str = "You are a helpful AI assistant specialized in programming, system administration, and command-line tools. Provide concise and accurate answers.";

/// A multi-turn conversation with a fixed system instruction.
pub struct ChatSession {
    provider: Arc<dyn LlmProvider>,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &ChatConfig) -> Self {
        Self {
            provider,
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            history: Vec::new(),
        }
    }

    /// Send a user message and return the assistant's reply.
    ///
    /// On failure the user message is dropped from history so the next turn
    /// doesn't carry an unanswered question.
    pub async fn send(&mut self, text: &str) -> Result<String, LlmError> {
        self.history.push(Message::user(text));

        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend(self.history.iter().cloned());

        let request = CompletionRequest {
            messages,
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            model: None,
        };

        debug!(turns = self.history.len(), "Sending chat turn");
        let reply = match self.provider.complete(request).await {
            Ok(response) if !response.message.content.trim().is_empty() => {
                response.message.content
            }
            Ok(_) => {
                self.history.pop();
                return Err(LlmError::EmptyResponse);
            }
            Err(e) => {
                self.history.pop();
                return Err(e);
            }
        };

        self.history.push(Message::assistant(reply.as_str()));
        Ok(reply)
    }

    /// Forget the conversation so far.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }
}

/// Ask a single question without conversation state.
pub async fn ask<G: TextGenerator + ?Sized>(
    generator: &G,
    question: &str,
    config: &ChatConfig,
) -> Result<String, LlmError> {
    generator
        .generate_text(
            ASK_SYSTEM_PROMPT,
            question,
            config.temperature,
            config.max_tokens,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::types::Role;

    #[tokio::test]
    async fn test_chat_keeps_history() {
        let provider = Arc::new(MockLlmProvider::new());
        provider.queue_response(MockLlmProvider::text_response("Hi, I'm here."));
        provider.queue_response(MockLlmProvider::text_response("You said hello."));

        let mut session = ChatSession::new(provider.clone(), &ChatConfig::default());
        assert_eq!(session.send("hello").await.unwrap(), "Hi, I'm here.");
        assert_eq!(
            session.send("what did I say?").await.unwrap(),
            "You said hello."
        );
        assert_eq!(session.history().len(), 4);

        let requests = provider.requests();
        let second = &requests[1];
        assert_eq!(second.messages[0].role, Role::System);
        assert_eq!(second.messages.len(), 4);
        assert_eq!(second.messages[1].content, "hello");
        assert_eq!(second.messages[2].content, "Hi, I'm here.");
        assert_eq!(second.messages[3].content, "what did I say?");
        assert_eq!(second.max_tokens, Some(1000));
    }

    #[tokio::test]
    async fn test_chat_clear() {
        let provider = Arc::new(MockLlmProvider::with_response("ok"));
        let mut session = ChatSession::new(provider.clone(), &ChatConfig::default());
        session.send("one").await.unwrap();
        session.clear();
        assert!(session.history().is_empty());

        session.send("two").await.unwrap();
        let last = provider.requests().pop().unwrap();
        assert_eq!(last.messages.len(), 2);
        assert_eq!(last.messages[1].content, "two");
    }

    #[tokio::test]
    async fn test_chat_error_drops_unanswered_turn() {
        let provider = Arc::new(MockLlmProvider::with_error(LlmError::Connection {
            message: "offline".into(),
        }));
        let mut session = ChatSession::new(provider, &ChatConfig::default());
        assert!(session.send("hello?").await.is_err());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_chat_custom_system_prompt() {
        let provider = Arc::new(MockLlmProvider::with_response("arr"));
        let config = ChatConfig {
            system_prompt: "Talk like a pirate.".to_string(),
            ..Default::default()
        };
        let mut session = ChatSession::new(provider.clone(), &config);
        session.send("hi").await.unwrap();
        assert_eq!(
            provider.requests()[0].messages[0].content,
            "Talk like a pirate."
        );
    }

    #[tokio::test]
    async fn test_ask_uses_fixed_system_prompt() {
        let provider = MockLlmProvider::with_response("Use `ps aux`.");
        let answer = ask(
            &provider,
            "How do I list processes?",
            &ChatConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(answer, "Use `ps aux`.");
        let request = &provider.requests()[0];
        assert_eq!(request.messages[0].content, ASK_SYSTEM_PROMPT);
        assert_eq!(request.messages[1].content, "How do I list processes?");
    }
}
