//! Re-normalize maps already in the store.
//!
//! Only `key`, `text` and `parent` of the stored nodes are trusted. Layout
//! fields are recomputed and written back onto the original nodes.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use lessonmap_core::{MindMapSettings, Result};
use lessonmap_map::{post_process, MindMap, Node, NodeKey, NormalizeOptions};
use lessonmap_store::{MindMapRecord, SqliteStore};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::types::{ChangeSummary, ReprocessEntry, ReprocessFilter, ReprocessReport};

/// The map reduced to `key`, `text` and `parent`. `None` when it has no nodes.
pub fn minimal_model(map: &MindMap) -> Option<MindMap> {
    if map.is_empty() {
        return None;
    }
    let nodes = map
        .nodes
        .iter()
        .map(|n| Node::new(n.key, n.text.clone(), n.parent))
        .collect();
    Some(MindMap::new(nodes))
}

/// Normalize the minimal model of `map` and merge the computed layout back
/// onto the original nodes, in their original order. Nodes dropped by
/// normalization are dropped here too; other passthrough fields survive.
pub fn reprocess_mindmap(map: &MindMap, options: &NormalizeOptions) -> Option<(MindMap, ChangeSummary)> {
    let minimal = minimal_model(map)?;
    let normalized = post_process(&minimal, options);

    let computed: HashMap<NodeKey, &Node> = normalized.nodes.iter().map(|n| (n.key, n)).collect();
    let mut emitted: HashSet<NodeKey> = HashSet::new();
    let mut nodes = Vec::with_capacity(normalized.len());

    for original in &map.nodes {
        let Some(upd) = computed.get(&original.key) else {
            continue;
        };
        if upd.parent != original.parent || !emitted.insert(original.key) {
            continue;
        }

        let mut node = original.clone();
        node.dir = upd.dir;
        node.brush = upd.brush.clone();
        node.loc = if upd.is_root() {
            upd.loc.clone().or_else(|| original.loc.clone())
        } else {
            None
        };
        nodes.push(node);
    }

    let summary = ChangeSummary {
        before_nodes: minimal.len(),
        after_nodes: normalized.len(),
        dir_assigned: normalized.nodes.iter().filter(|n| n.dir.is_some()).count(),
        brush_assigned: normalized.nodes.iter().filter(|n| n.brush.is_some()).count(),
        root_loc: normalized.root().and_then(|n| n.loc.clone()),
    };

    let out = MindMap {
        class: map.class.clone(),
        nodes,
        extra: map.extra.clone(),
    };
    Some((out, summary))
}

/// Batch reprocessing over the store. Dry run unless `apply` is set.
pub struct Reprocessor<'a> {
    store: &'a SqliteStore,
    settings: &'a MindMapSettings,
}

impl<'a> Reprocessor<'a> {
    pub fn new(store: &'a SqliteStore, settings: &'a MindMapSettings) -> Self {
        Self { store, settings }
    }

    pub fn run(&self, filter: &ReprocessFilter, apply: bool) -> Result<ReprocessReport> {
        let start = Instant::now();
        let mut report = ReprocessReport {
            scanned: 0,
            processed: 0,
            updated: 0,
            applied: apply,
            entries: Vec::new(),
            duration_ms: 0,
        };

        for record in self.store.all()? {
            if filter.limit > 0 && report.processed >= filter.limit {
                break;
            }
            report.scanned += 1;
            if !matches_filter(&record, filter) {
                continue;
            }

            let options = NormalizeOptions::from_settings(self.settings, Some(record.language));
            let Some((mindmap, changes)) = reprocess_mindmap(&record.mindmap, &options) else {
                debug!("Skipping mind map {}: no nodes", record.id);
                continue;
            };
            report.processed += 1;
            let changed = mindmap != record.mindmap;
            info!(
                "[{}] mind map {} '{}' changed={} changes={:?}",
                report.processed, record.id, record.title, changed, changes
            );

            if apply && self.write_back(&record, &mindmap, &changes)? {
                report.updated += 1;
            }

            report.entries.push(ReprocessEntry {
                id: record.id,
                title: record.title,
                changed,
                changes,
            });
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Reprocess complete: {} scanned, {} processed, {} updated{} ({}ms)",
            report.scanned,
            report.processed,
            report.updated,
            if apply { "" } else { " (dry run)" },
            report.duration_ms
        );
        Ok(report)
    }

    fn write_back(&self, record: &MindMapRecord, mindmap: &MindMap, changes: &ChangeSummary) -> Result<bool> {
        let runs = record
            .metadata_map()
            .get("reprocess_runs")
            .and_then(Value::as_u64)
            .unwrap_or(0)
            + 1;

        let updated = self.store.update_mindmap(record.id, mindmap)?;
        self.store.update_metadata(
            record.id,
            &json!({
                "reprocessed_at": chrono::Utc::now().to_rfc3339(),
                "reprocess_runs": runs,
                "reprocess_changes": changes,
            }),
        )?;
        Ok(updated)
    }
}

fn matches_filter(record: &MindMapRecord, filter: &ReprocessFilter) -> bool {
    if let Some(needle) = filter.title_contains.as_deref().filter(|s| !s.is_empty()) {
        if !record.title.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }
    if let Some(needle) = filter.contains_text.as_deref().filter(|s| !s.is_empty()) {
        let needle = needle.to_lowercase();
        if !record
            .mindmap
            .nodes
            .iter()
            .any(|n| n.text.to_lowercase().contains(&needle))
        {
            return false;
        }
    }
    true
}
