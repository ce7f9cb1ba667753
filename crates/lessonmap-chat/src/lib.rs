//! Generation adapter for mind maps.
//!
//! Prompt templates, LLM configuration and non-streaming calls to external
//! providers (OpenAI/Anthropic/Groq) behind the [`Generator`] trait.

pub mod config;
pub mod generator;
pub mod prompts;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use generator::{Generator, LlmGenerator};
pub use types::*;
