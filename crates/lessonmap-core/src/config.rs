//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::Language;

/// Default cap on nodes in a finished map.
pub const DEFAULT_MAX_NODES: usize = 120;
/// Default maximum depth (root = 0).
pub const DEFAULT_MAX_DEPTH: i32 = 3;
/// Default chunk window in characters.
pub const DEFAULT_CHUNK_SIZE_CHARS: usize = 1800;
/// Default overlap between consecutive chunk windows in characters.
pub const DEFAULT_CHUNK_OVERLAP_CHARS: usize = 250;
/// Default number of chunk generations in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Colors by depth: 0 = root, 1 = main branches, 2 = subtopics, 3+ deeper.
pub const DEFAULT_COLORS: &[&str] = &[
    "gold",
    "turquoise",
    "lavender",
    "aqua",
    "lightcoral",
    "lightsteelblue",
    "plum",
    "lightpink",
];

/// Paths to all LessonMap data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite database directory (`data/db/`).
    pub db: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.db)?;
        Ok(paths)
    }
}

/// Mind-map generation and post-processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMapSettings {
    /// Maximum number of nodes kept in a map.
    pub max_nodes: usize,
    /// Maximum depth, root counted as 0. Negative means unlimited.
    pub max_depth: i32,
    /// Chunk window size in characters.
    pub chunk_size_chars: usize,
    /// Overlap between chunk windows in characters.
    pub chunk_overlap_chars: usize,
    /// Collapse nodes with the same parent and normalized text when merging.
    pub deduplicate_nodes: bool,
    /// Drop example / narrative nodes.
    pub exclude_examples: bool,
    /// Split long content and merge per-chunk maps.
    pub multi_pass: bool,
    /// Ask the model for an outline before the map itself.
    pub enhanced_thinking: bool,
    /// Return a marked placeholder map when single-shot generation fails.
    pub fallback_placeholder: bool,
    /// Chunk generations in flight at once.
    pub max_concurrency: usize,
    /// Brush palette indexed by depth.
    pub colors: Vec<String>,
}

impl Default for MindMapSettings {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            max_depth: DEFAULT_MAX_DEPTH,
            chunk_size_chars: DEFAULT_CHUNK_SIZE_CHARS,
            chunk_overlap_chars: DEFAULT_CHUNK_OVERLAP_CHARS,
            deduplicate_nodes: true,
            exclude_examples: true,
            multi_pass: true,
            enhanced_thinking: true,
            fallback_placeholder: false,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            colors: DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl MindMapSettings {
    /// Read settings from `MINDMAP_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup. Unparsable values are
    /// logged and replaced by the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let colors = lookup("MINDMAP_COLORS")
            .map(|raw| {
                raw.split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|c| !c.is_empty())
            .unwrap_or(defaults.colors);

        Self {
            max_nodes: parse_or(&lookup, "MINDMAP_MAX_NODES", defaults.max_nodes),
            max_depth: parse_or(&lookup, "MINDMAP_MAX_DEPTH", defaults.max_depth),
            chunk_size_chars: parse_or(
                &lookup,
                "MINDMAP_CHUNK_SIZE_CHARS",
                defaults.chunk_size_chars,
            ),
            chunk_overlap_chars: parse_or(
                &lookup,
                "MINDMAP_CHUNK_OVERLAP_CHARS",
                defaults.chunk_overlap_chars,
            ),
            deduplicate_nodes: flag_or(
                &lookup,
                "MINDMAP_DEDUPLICATE_NODES",
                defaults.deduplicate_nodes,
            ),
            exclude_examples: flag_or(&lookup, "MINDMAP_EXCLUDE_EXAMPLES", defaults.exclude_examples),
            multi_pass: flag_or(&lookup, "MINDMAP_MULTI_PASS", defaults.multi_pass),
            enhanced_thinking: flag_or(
                &lookup,
                "MINDMAP_ENHANCED_THINKING",
                defaults.enhanced_thinking,
            ),
            fallback_placeholder: flag_or(
                &lookup,
                "MINDMAP_FALLBACK_PLACEHOLDER",
                defaults.fallback_placeholder,
            ),
            max_concurrency: parse_or(&lookup, "MINDMAP_MAX_CONCURRENCY", defaults.max_concurrency)
                .max(1),
            colors,
        }
    }

    /// Depth limit as an option; `None` means unlimited.
    pub fn depth_limit(&self) -> Option<usize> {
        usize::try_from(self.max_depth).ok()
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!("Ignoring invalid value for {}: {:?}", key, raw);
                default
            }
        },
        None => default,
    }
}

fn flag_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|raw| matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Top-level LessonMap configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonMapConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Language assumed when a request does not name one.
    pub default_language: Language,
    /// Mind-map settings.
    pub mindmap: MindMapSettings,
}

impl LessonMapConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3003);

        let default_language = std::env::var("LESSONMAP_LANGUAGE")
            .ok()
            .and_then(|l| l.parse().ok())
            .unwrap_or_default();

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            default_language,
            mindmap: MindMapSettings::from_env(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let s = MindMapSettings::from_lookup(|_| None);
        assert_eq!(s, MindMapSettings::default());
        assert_eq!(s.max_nodes, 120);
        assert_eq!(s.max_depth, 3);
        assert_eq!(s.chunk_size_chars, 1800);
        assert_eq!(s.chunk_overlap_chars, 250);
        assert_eq!(s.colors.len(), 8);
        assert_eq!(s.colors[0], "gold");
    }

    #[test]
    fn test_overrides() {
        let s = MindMapSettings::from_lookup(lookup_from(&[
            ("MINDMAP_MAX_NODES", "40"),
            ("MINDMAP_MAX_DEPTH", "-1"),
            ("MINDMAP_DEDUPLICATE_NODES", "no"),
            ("MINDMAP_MULTI_PASS", "YES"),
            ("MINDMAP_COLORS", "red, green ,,blue"),
        ]));
        assert_eq!(s.max_nodes, 40);
        assert_eq!(s.depth_limit(), None);
        assert!(!s.deduplicate_nodes);
        assert!(s.multi_pass);
        assert_eq!(s.colors, vec!["red", "green", "blue"]);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let s = MindMapSettings::from_lookup(lookup_from(&[
            ("MINDMAP_MAX_NODES", "lots"),
            ("MINDMAP_COLORS", " , "),
            ("MINDMAP_MAX_CONCURRENCY", "0"),
        ]));
        assert_eq!(s.max_nodes, DEFAULT_MAX_NODES);
        assert_eq!(s.colors.len(), DEFAULT_COLORS.len());
        assert_eq!(s.max_concurrency, 1);
    }

    #[test]
    fn test_depth_limit() {
        let s = MindMapSettings::default();
        assert_eq!(s.depth_limit(), Some(3));
    }
}
