//! The generation adapter seam and its LLM-backed implementation.

use std::time::Duration;

use futures::future::BoxFuture;
use lessonmap_core::{Error, Result};
use reqwest::Client;
use tracing::debug;

use crate::config::LLMConfig;
use crate::prompts;
use crate::providers;
use crate::types::{ChatMessage, GenerationRequest, Stage};

/// Produces raw model text for a chunk.
///
/// Implementations own model choice, credentials and timeouts. Retries are
/// the caller's business.
pub trait Generator: Send + Sync {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<String>>;
}

/// [`Generator`] backed by an external chat-completion API.
pub struct LlmGenerator {
    client: Client,
    config: LLMConfig,
}

impl LlmGenerator {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Reuse an existing client (connection pool) with a config snapshot.
    pub fn with_client(client: Client, config: LLMConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }

    async fn run(&self, request: &GenerationRequest) -> Result<String> {
        let resolved = self
            .config
            .resolve_provider()
            .ok_or_else(|| Error::Config("No LLM provider configured".into()))?;

        debug!(
            "Generating {:?} stage with {} ({} chars of content)",
            request.stage,
            resolved.provider,
            request.content.chars().count()
        );

        providers::complete(
            &self.client,
            resolved.provider,
            &build_messages(request),
            &resolved.model,
            &resolved.api_key,
            self.config.sampling(),
        )
        .await
    }
}

impl Generator for LlmGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.run(request))
    }
}

/// Conversation for one request. A main request with an outline replays
/// the planning exchange before asking for the JSON.
pub fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let language = request.language;
    let mut messages = vec![ChatMessage::system(prompts::system_message(language))];

    match request.stage {
        Stage::Planning => {
            messages.push(ChatMessage::user(prompts::render(
                prompts::planning_template(language),
                &request.content,
            )));
        }
        Stage::Main => {
            if let Some(outline) = request.outline.as_deref().filter(|o| !o.trim().is_empty()) {
                messages.push(ChatMessage::user(prompts::render(
                    prompts::planning_template(language),
                    &request.content,
                )));
                messages.push(ChatMessage::assistant(outline));
            }
            messages.push(ChatMessage::user(prompts::render(
                prompts::main_template(language),
                &request.content,
            )));
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessonmap_core::Language;

    #[test]
    fn test_planning_messages() {
        let msgs = build_messages(&GenerationRequest::planning("Cells divide.", Language::English));
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert!(msgs[1].content.contains("planning outline"));
        assert!(msgs[1].content.ends_with("Cells divide."));
    }

    #[test]
    fn test_main_messages_replay_outline() {
        let request = GenerationRequest::main("Cells divide.", Language::English, Some("1. Mitosis".into()));
        let msgs = build_messages(&request);
        let roles: Vec<&str> = msgs.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(msgs[2].content, "1. Mitosis");
        assert!(msgs[3].content.contains("nodeDataArray"));
    }

    #[test]
    fn test_blank_outline_is_ignored() {
        let request = GenerationRequest::main("x", Language::Arabic, Some("   ".into()));
        let msgs = build_messages(&request);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].content.contains("خرائط"));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_errors() {
        let generator = LlmGenerator::new(LLMConfig::default()).unwrap();
        let request = GenerationRequest::main("x", Language::English, None);
        let result = generator.generate(&request).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
