//! LLM configuration persistence and provider selection.

use std::path::{Path, PathBuf};

use lessonmap_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{LLMConfigResponse, LLMConfigUpdate, LLMProvider, SamplingParams};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.9;
pub const DEFAULT_MAX_TOKENS: usize = 8192;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Stored LLM configuration (persisted to llm-config.json).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    #[serde(default = "default_preferred")]
    pub preferred_provider: String,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    #[serde(default = "default_anthropic_model")]
    pub anthropic_model: String,
    #[serde(default = "default_groq_model")]
    pub groq_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_preferred() -> String {
    "auto".into()
}
fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.into()
}
fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.into()
}
fn default_groq_model() -> String {
    DEFAULT_GROQ_MODEL.into()
}
fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}
fn default_top_p() -> f64 {
    DEFAULT_TOP_P
}
fn default_max_tokens() -> usize {
    DEFAULT_MAX_TOKENS
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.into(),
            groq_model: DEFAULT_GROQ_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            config_path: PathBuf::new(),
        }
    }
}

/// Provider, model and key chosen for a call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub provider: LLMProvider,
    pub model: String,
    pub api_key: String,
}

impl LLMConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// Load config from file, filling missing API keys through `lookup`.
    pub fn load_with(config_path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config: LLMConfig = match std::fs::read_to_string(config_path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!("Ignoring unreadable {}: {}", config_path.display(), e);
                LLMConfig::default()
            }),
            Err(_) => LLMConfig::default(),
        };

        config.config_path = config_path.to_path_buf();

        // Env vars as fallback for API keys
        if config.openai_api_key.is_none() {
            config.openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty());
        }
        if config.anthropic_api_key.is_none() {
            config.anthropic_api_key = lookup("ANTHROPIC_API_KEY").filter(|k| !k.is_empty());
        }
        if config.groq_api_key.is_none() {
            config.groq_api_key = lookup("GROQ_API_KEY").filter(|k| !k.is_empty());
        }

        config
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved LLM config to {}", self.config_path.display());
        Ok(())
    }

    /// Apply an update, merging with existing config.
    pub fn apply_update(&mut self, update: &LLMConfigUpdate) -> Result<()> {
        if let Some(p) = &update.preferred_provider {
            if !matches!(p.as_str(), "auto" | "openai" | "anthropic" | "groq") {
                return Err(Error::Config(format!("Unknown provider: {}", p)));
            }
            self.preferred_provider = p.clone();
        }
        if let Some(k) = &update.openai_api_key {
            self.openai_api_key = Some(k.clone());
        }
        if let Some(k) = &update.anthropic_api_key {
            self.anthropic_api_key = Some(k.clone());
        }
        if let Some(k) = &update.groq_api_key {
            self.groq_api_key = Some(k.clone());
        }
        if let Some(m) = &update.openai_model {
            self.openai_model = m.clone();
        }
        if let Some(m) = &update.anthropic_model {
            self.anthropic_model = m.clone();
        }
        if let Some(m) = &update.groq_model {
            self.groq_model = m.clone();
        }
        if let Some(t) = update.temperature {
            self.temperature = t;
        }
        if let Some(p) = update.top_p {
            self.top_p = p;
        }
        if let Some(m) = update.max_tokens {
            self.max_tokens = m;
        }
        Ok(())
    }

    /// Resolve which provider and model to use.
    pub fn resolve_provider(&self) -> Option<ResolvedProvider> {
        let pick = |provider: LLMProvider, model: &String, key: &Option<String>| {
            key.as_ref().map(|k| ResolvedProvider {
                provider,
                model: model.clone(),
                api_key: k.clone(),
            })
        };

        // Explicit preference
        match self.preferred_provider.as_str() {
            "openai" => return pick(LLMProvider::OpenAI, &self.openai_model, &self.openai_api_key),
            "anthropic" => {
                return pick(
                    LLMProvider::Anthropic,
                    &self.anthropic_model,
                    &self.anthropic_api_key,
                )
            }
            "groq" => return pick(LLMProvider::Groq, &self.groq_model, &self.groq_api_key),
            "auto" => {}
            _ => return None,
        }

        // Auto mode: Anthropic > Groq > OpenAI
        pick(
            LLMProvider::Anthropic,
            &self.anthropic_model,
            &self.anthropic_api_key,
        )
        .or_else(|| pick(LLMProvider::Groq, &self.groq_model, &self.groq_api_key))
        .or_else(|| pick(LLMProvider::OpenAI, &self.openai_model, &self.openai_api_key))
    }

    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        }
    }

    /// Build the public config response (no API keys exposed).
    pub fn to_response(&self) -> LLMConfigResponse {
        LLMConfigResponse {
            preferred_provider: self.preferred_provider.clone(),
            openai_configured: self.openai_api_key.is_some(),
            anthropic_configured: self.anthropic_api_key.is_some(),
            groq_configured: self.groq_api_key.is_some(),
            openai_model: self.openai_model.clone(),
            anthropic_model: self.anthropic_model.clone(),
            groq_model: self.groq_model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            active_provider: self.resolve_provider().map(|r| r.provider.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = LLMConfig::load_with(&dir.path().join("llm-config.json"), no_env);
        assert_eq!(config.preferred_provider, "auto");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.top_p, 0.9);
        assert_eq!(config.max_tokens, 8192);
        assert!(config.resolve_provider().is_none());
    }

    #[test]
    fn test_env_fallback_for_keys() {
        let dir = tempfile::tempdir().unwrap();
        let config = LLMConfig::load_with(&dir.path().join("llm-config.json"), |key| {
            (key == "GROQ_API_KEY").then(|| "gsk-test".to_string())
        });
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.provider, LLMProvider::Groq);
        assert_eq!(resolved.api_key, "gsk-test");
    }

    #[test]
    fn test_auto_order() {
        let mut config = LLMConfig {
            openai_api_key: Some("o".into()),
            groq_api_key: Some("g".into()),
            ..Default::default()
        };
        assert_eq!(config.resolve_provider().unwrap().provider, LLMProvider::Groq);
        config.anthropic_api_key = Some("a".into());
        assert_eq!(config.resolve_provider().unwrap().provider, LLMProvider::Anthropic);
    }

    #[test]
    fn test_explicit_preference() {
        let config = LLMConfig {
            preferred_provider: "openai".into(),
            anthropic_api_key: Some("a".into()),
            ..Default::default()
        };
        assert!(config.resolve_provider().is_none());

        let config = LLMConfig {
            openai_api_key: Some("o".into()),
            ..config
        };
        let resolved = config.resolve_provider().unwrap();
        assert_eq!(resolved.provider, LLMProvider::OpenAI);
        assert_eq!(resolved.model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("llm-config.json");
        let mut config = LLMConfig::load_with(&path, no_env);
        config
            .apply_update(&LLMConfigUpdate {
                preferred_provider: Some("anthropic".into()),
                anthropic_api_key: Some("sk-ant".into()),
                temperature: Some(0.2),
                ..Default::default()
            })
            .unwrap();
        config.save().unwrap();

        let reloaded = LLMConfig::load_with(&path, no_env);
        assert_eq!(reloaded.preferred_provider, "anthropic");
        assert_eq!(reloaded.temperature, 0.2);
        assert_eq!(reloaded.to_response().active_provider.as_deref(), Some("anthropic"));
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let mut config = LLMConfig::default();
        let update = LLMConfigUpdate {
            preferred_provider: Some("mystery".into()),
            ..Default::default()
        };
        assert!(config.apply_update(&update).is_err());
        assert_eq!(config.preferred_provider, "auto");
    }

    #[test]
    fn test_response_masks_keys() {
        let config = LLMConfig {
            openai_api_key: Some("secret".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&config.to_response()).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"openaiConfigured\":true"));
    }
}
