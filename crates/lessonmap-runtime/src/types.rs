//! Runtime types.

use lessonmap_map::MindMap;
use serde::{Deserialize, Serialize};

/// Result of one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub mindmap: MindMap,
    /// Chunks sent to the generator (1 in single-pass mode).
    #[serde(rename = "chunksTotal")]
    pub chunks_total: usize,
    #[serde(rename = "chunksSucceeded")]
    pub chunks_succeeded: usize,
    /// Whether chunk trees were merged under a synthetic root.
    pub merged: bool,
    /// Whether the tree is the fallback placeholder.
    pub placeholder: bool,
    #[serde(rename = "nodeCount")]
    pub node_count: usize,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

/// Counts describing what a reprocessing pass produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub before_nodes: usize,
    pub after_nodes: usize,
    /// Nodes carrying a direction afterwards.
    pub dir_assigned: usize,
    /// Nodes carrying a brush afterwards.
    pub brush_assigned: usize,
    pub root_loc: Option<String>,
}

/// Which stored maps a reprocessing run touches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReprocessFilter {
    /// Maximum number of maps processed; 0 means all.
    #[serde(default)]
    pub limit: usize,
    /// Case-insensitive substring of the title.
    #[serde(default, rename = "titleContains")]
    pub title_contains: Option<String>,
    /// Case-insensitive substring of any node text.
    #[serde(default, rename = "containsText")]
    pub contains_text: Option<String>,
}

/// One reprocessed map.
#[derive(Debug, Clone, Serialize)]
pub struct ReprocessEntry {
    pub id: i64,
    pub title: String,
    /// Whether the normalized tree differs from the stored one.
    pub changed: bool,
    pub changes: ChangeSummary,
}

/// Outcome of [`crate::Reprocessor::run`].
#[derive(Debug, Clone, Serialize)]
pub struct ReprocessReport {
    /// Stored maps examined.
    pub scanned: usize,
    /// Maps that passed the filter and were reprocessed.
    pub processed: usize,
    /// Maps written back (0 on a dry run).
    pub updated: usize,
    pub applied: bool,
    pub entries: Vec<ReprocessEntry>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}
