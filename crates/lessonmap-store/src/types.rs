//! Stored mind-map records and store statistics.

use lessonmap_core::Language;
use lessonmap_map::MindMap;
use serde::{Deserialize, Serialize};

/// A mind-map row from the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindMapRecord {
    pub id: i64,
    pub uuid: String,
    pub title: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none", rename = "contentHash")]
    pub content_hash: Option<String>,
    pub mindmap: MindMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none", rename = "updatedAt")]
    pub updated_at: Option<i64>,
}

impl MindMapRecord {
    /// Metadata as an object; empty when absent or not an object.
    pub fn metadata_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match &self.metadata {
            Some(serde_json::Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        }
    }
}

/// Options for saving a mind map.
#[derive(Debug, Clone, Default)]
pub struct SaveMindMapOptions {
    pub language: Language,
    pub metadata: Option<serde_json::Value>,
    pub content_hash: Option<String>,
    pub created_at: Option<i64>,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    #[serde(rename = "totalMindmaps")]
    pub total_mindmaps: i64,
    #[serde(rename = "arabicMindmaps")]
    pub arabic_mindmaps: i64,
    #[serde(rename = "englishMindmaps")]
    pub english_mindmaps: i64,
    #[serde(rename = "totalNodes")]
    pub total_nodes: usize,
    #[serde(rename = "dbPath")]
    pub db_path: String,
    #[serde(rename = "dbSizeMb")]
    pub db_size_mb: f64,
}
