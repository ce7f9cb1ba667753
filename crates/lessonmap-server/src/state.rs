//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use lessonmap_chat::{Generator, LLMConfig, LlmGenerator};
use lessonmap_core::{Language, LessonMapConfig};
use lessonmap_runtime::MindMapPipeline;
use lessonmap_store::SqliteStore;
use parking_lot::RwLock;
use tracing::warn;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: LessonMapConfig,
    pub store: SqliteStore,
    pub llm_config: RwLock<LLMConfig>,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: LessonMapConfig, store: SqliteStore) -> Self {
        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
        Self::with_llm_config(config, store, llm_config)
    }

    pub fn with_llm_config(config: LessonMapConfig, store: SqliteStore, llm_config: LLMConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(llm_config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            config,
            store,
            llm_config: RwLock::new(llm_config),
            http,
        }
    }

    /// Generator over a snapshot of the current LLM config.
    pub fn generator(&self) -> Arc<dyn Generator> {
        let snapshot = self.llm_config.read().clone();
        Arc::new(LlmGenerator::with_client(self.http.clone(), snapshot))
    }

    pub fn pipeline(&self, language: Language) -> MindMapPipeline {
        MindMapPipeline::new(self.generator(), self.config.mindmap.clone(), language)
    }
}
