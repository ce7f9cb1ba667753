//! Generation and LLM configuration types.

use lessonmap_core::Language;
use serde::{Deserialize, Serialize};

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Anthropic,
    Groq,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

/// One message of a provider conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Which call of a generation this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Free-text outline that primes the main call.
    Planning,
    /// The call expected to return the map JSON.
    Main,
}

/// Input of one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub content: String,
    pub language: Language,
    pub stage: Stage,
    /// Planning outline replayed before the main prompt.
    pub outline: Option<String>,
}

impl GenerationRequest {
    pub fn planning(content: impl Into<String>, language: Language) -> Self {
        Self {
            content: content.into(),
            language,
            stage: Stage::Planning,
            outline: None,
        }
    }

    pub fn main(content: impl Into<String>, language: Language, outline: Option<String>) -> Self {
        Self {
            content: content.into(),
            language,
            stage: Stage::Main,
            outline,
        }
    }
}

/// Sampling parameters sent with every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: usize,
}

/// LLM config response (keys masked).
#[derive(Debug, Clone, Serialize)]
pub struct LLMConfigResponse {
    #[serde(rename = "preferredProvider")]
    pub preferred_provider: String,
    #[serde(rename = "openaiConfigured")]
    pub openai_configured: bool,
    #[serde(rename = "anthropicConfigured")]
    pub anthropic_configured: bool,
    #[serde(rename = "groqConfigured")]
    pub groq_configured: bool,
    #[serde(rename = "openaiModel")]
    pub openai_model: String,
    #[serde(rename = "anthropicModel")]
    pub anthropic_model: String,
    #[serde(rename = "groqModel")]
    pub groq_model: String,
    pub temperature: f64,
    #[serde(rename = "topP")]
    pub top_p: f64,
    #[serde(rename = "maxTokens")]
    pub max_tokens: usize,
    #[serde(rename = "activeProvider")]
    pub active_provider: Option<String>,
}

/// LLM config update request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LLMConfigUpdate {
    #[serde(rename = "preferredProvider")]
    pub preferred_provider: Option<String>,
    #[serde(rename = "openaiApiKey")]
    pub openai_api_key: Option<String>,
    #[serde(rename = "anthropicApiKey")]
    pub anthropic_api_key: Option<String>,
    #[serde(rename = "groqApiKey")]
    pub groq_api_key: Option<String>,
    #[serde(rename = "openaiModel")]
    pub openai_model: Option<String>,
    #[serde(rename = "anthropicModel")]
    pub anthropic_model: Option<String>,
    #[serde(rename = "groqModel")]
    pub groq_model: Option<String>,
    pub temperature: Option<f64>,
    #[serde(rename = "topP")]
    pub top_p: Option<f64>,
    #[serde(rename = "maxTokens")]
    pub max_tokens: Option<usize>,
}
