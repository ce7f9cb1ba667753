//! Lesson text to finished mind map.
//!
//! Sanitize, optionally split into overlapping chunks, build a tree per chunk
//! with bounded concurrency, merge the survivors, then normalize.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use lessonmap_chat::Generator;
use lessonmap_core::{Error, Language, MindMapSettings, Result};
use lessonmap_ingest::{needs_chunking, sanitize_content, ChunkSplitter};
use lessonmap_map::{merge_mindmaps, post_process, MergeOptions, MindMap, NormalizeOptions};
use tracing::{info, warn};

use crate::builder::{placeholder, SinglePassBuilder};
use crate::types::GenerationReport;

/// Tree before normalization plus how it was obtained.
struct Draft {
    tree: MindMap,
    chunks_total: usize,
    chunks_succeeded: usize,
    merged: bool,
    placeholder: bool,
}

/// Generation pipeline for one language.
pub struct MindMapPipeline {
    builder: SinglePassBuilder,
    settings: MindMapSettings,
}

impl MindMapPipeline {
    pub fn new(generator: Arc<dyn Generator>, settings: MindMapSettings, language: Language) -> Self {
        let builder = SinglePassBuilder::new(generator, language, settings.enhanced_thinking);
        Self { builder, settings }
    }

    pub fn settings(&self) -> &MindMapSettings {
        &self.settings
    }

    /// Generate a normalized mind map for `content`.
    pub async fn generate(&self, content: &str) -> Result<GenerationReport> {
        let start = Instant::now();
        let content = sanitize_content(content);
        if content.is_empty() {
            return Err(Error::InvalidInput("content is empty".into()));
        }

        let language = self.builder.language();
        let multi_pass =
            self.settings.multi_pass && needs_chunking(&content, self.settings.chunk_size_chars);

        let draft = if multi_pass {
            self.generate_chunked(&content).await?
        } else {
            match self.builder.build(&content).await.filter(has_root) {
                Some(tree) => Draft {
                    tree,
                    chunks_total: 1,
                    chunks_succeeded: 1,
                    merged: false,
                    placeholder: false,
                },
                None if self.settings.fallback_placeholder => {
                    warn!("Generation produced no tree, using placeholder");
                    Draft {
                        tree: placeholder(language),
                        chunks_total: 1,
                        chunks_succeeded: 0,
                        merged: false,
                        placeholder: true,
                    }
                }
                None => {
                    return Err(Error::GenerationFailed(
                        "no result from the generator".into(),
                    ))
                }
            }
        };

        let options = NormalizeOptions::from_settings(&self.settings, Some(language));
        let mindmap = post_process(&draft.tree, &options);
        let node_count = mindmap.len();
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Mind map generated: {} nodes, {}/{} chunks, merged={}, placeholder={}, {}ms",
            node_count,
            draft.chunks_succeeded,
            draft.chunks_total,
            draft.merged,
            draft.placeholder,
            duration_ms
        );

        Ok(GenerationReport {
            mindmap,
            chunks_total: draft.chunks_total,
            chunks_succeeded: draft.chunks_succeeded,
            merged: draft.merged,
            placeholder: draft.placeholder,
            node_count,
            duration_ms,
        })
    }

    /// Build every chunk, keep the rooted trees in chunk order, merge them.
    /// Split input always goes through the merge, even with one survivor.
    async fn generate_chunked(&self, content: &str) -> Result<Draft> {
        let chunks: Vec<&str> = ChunkSplitter::new(
            content,
            self.settings.chunk_size_chars,
            self.settings.chunk_overlap_chars,
        )
        .collect();
        let total = chunks.len();
        info!(
            "Splitting {} chars into {} chunks (concurrency {})",
            content.chars().count(),
            total,
            self.settings.max_concurrency.max(1)
        );

        let results: Vec<Option<MindMap>> = stream::iter(chunks.into_iter().enumerate())
            .map(|(i, chunk)| async move {
                let tree = self.builder.build(chunk).await.filter(has_root);
                if tree.is_none() {
                    warn!("Chunk {}/{} produced no tree, skipping", i + 1, total);
                }
                tree
            })
            .buffered(self.settings.max_concurrency.max(1))
            .boxed()
            .collect()
            .await;

        let mut trees: Vec<MindMap> = results.into_iter().flatten().collect();
        let succeeded = trees.len();
        if trees.is_empty() {
            return Err(Error::GenerationFailed(format!(
                "no result: all {} chunks failed",
                total
            )));
        }

        if total == 1 {
            return Ok(Draft {
                tree: trees.remove(0),
                chunks_total: total,
                chunks_succeeded: succeeded,
                merged: false,
                placeholder: false,
            });
        }

        let options = MergeOptions {
            language: self.builder.language(),
            deduplicate: self.settings.deduplicate_nodes,
            max_nodes: self.settings.max_nodes,
        };
        let merged = merge_mindmaps(&trees, &options).ok_or_else(|| {
            Error::GenerationFailed("no result: no chunk tree has a root".into())
        })?;
        Ok(Draft {
            tree: merged,
            chunks_total: total,
            chunks_succeeded: succeeded,
            merged: true,
            placeholder: false,
        })
    }
}

fn has_root(tree: &MindMap) -> bool {
    tree.root().is_some()
}
