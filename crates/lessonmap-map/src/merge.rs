//! Merge per-chunk maps under one synthetic root.

use std::collections::{HashMap, HashSet};

use lessonmap_core::config::DEFAULT_MAX_NODES;
use lessonmap_core::Language;
use tracing::{debug, info};

use crate::types::{normalize_text, MindMap, Node, NodeKey, ROOT_LOC};

/// Key of the synthetic super-root.
pub const SUPER_ROOT_KEY: NodeKey = NodeKey(0);

/// Options for [`merge_mindmaps`].
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Picks the title of the synthetic root.
    pub language: Language,
    /// Collapse siblings with the same normalized text.
    pub deduplicate: bool,
    /// Prefix cap on the merged node list; 0 disables it.
    pub max_nodes: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            language: Language::default(),
            deduplicate: true,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

/// Combine chunk maps into one tree.
///
/// Each source tree becomes a branch of a new root labeled with the source
/// root's text. Keys are reassigned sequentially. Returns `None` when no
/// input has a root.
pub fn merge_mindmaps(maps: &[MindMap], options: &MergeOptions) -> Option<MindMap> {
    let sources: Vec<(usize, &MindMap, usize)> = maps
        .iter()
        .enumerate()
        .filter_map(|(pos, map)| map.root_index().map(|root| (pos, map, root)))
        .collect();
    if sources.is_empty() {
        debug!("No chunk map has a root; nothing to merge");
        return None;
    }

    let mut merger = Merger::new(options);
    let mut super_root = Node::new(SUPER_ROOT_KEY, options.language.comprehensive_title(), None);
    super_root.loc = Some(ROOT_LOC.to_string());
    merger.nodes.push(super_root);

    for (pos, map, root_idx) in sources {
        merger.merge_tree(pos, map, root_idx);
    }

    let mut nodes = merger.nodes;
    let total = nodes.len();
    if options.max_nodes > 0 && nodes.len() > options.max_nodes {
        nodes.truncate(options.max_nodes);
    }

    info!(
        "Merged {} chunk maps into {} nodes ({} collapsed, {} truncated)",
        maps.len(),
        nodes.len(),
        merger.collapsed,
        total - nodes.len()
    );

    Some(MindMap::new(nodes))
}

struct Merger<'o> {
    options: &'o MergeOptions,
    nodes: Vec<Node>,
    next_key: i64,
    /// (new parent, normalized text) -> surviving key.
    seen: HashMap<(NodeKey, String), NodeKey>,
    collapsed: usize,
}

impl<'o> Merger<'o> {
    fn new(options: &'o MergeOptions) -> Self {
        Self {
            options,
            nodes: Vec::new(),
            next_key: SUPER_ROOT_KEY.0 + 1,
            seen: HashMap::new(),
            collapsed: 0,
        }
    }

    /// Emit a node under `parent` unless an equivalent sibling exists.
    /// Returns the key children should attach to.
    fn place(&mut self, parent: NodeKey, text: &str, template: Option<&Node>) -> NodeKey {
        let identity = (parent, normalize_text(text));
        if self.options.deduplicate {
            if let Some(&existing) = self.seen.get(&identity) {
                self.collapsed += 1;
                return existing;
            }
        }

        let key = NodeKey(self.next_key);
        self.next_key += 1;

        let mut node = Node::new(key, text, Some(parent));
        if let Some(source) = template {
            node.extra = source.extra.clone();
        }
        self.nodes.push(node);

        if self.options.deduplicate {
            self.seen.insert(identity, key);
        }
        key
    }

    fn merge_tree(&mut self, pos: usize, map: &MindMap, root_idx: usize) {
        let root = &map.nodes[root_idx];
        let label = if root.text.trim().is_empty() {
            format!("Chunk {}", pos + 1)
        } else {
            root.text.trim().to_string()
        };
        let branch = self.place(SUPER_ROOT_KEY, &label, None);

        let mut children: HashMap<NodeKey, Vec<usize>> = HashMap::new();
        for (idx, node) in map.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                children.entry(parent).or_default().push(idx);
            }
        }

        let mut visited: HashSet<usize> = HashSet::from([root_idx]);
        let mut stack: Vec<(usize, NodeKey)> = Vec::new();
        push_children(&mut stack, &children, root.key, branch);

        while let Some((idx, new_parent)) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            let node = &map.nodes[idx];
            let target = self.place(new_parent, &node.text, Some(node));
            push_children(&mut stack, &children, node.key, target);
        }
    }
}

/// Push in reverse so pops come out in source order.
fn push_children(
    stack: &mut Vec<(usize, NodeKey)>,
    children: &HashMap<NodeKey, Vec<usize>>,
    source_key: NodeKey,
    new_parent: NodeKey,
) {
    if let Some(kids) = children.get(&source_key) {
        stack.extend(kids.iter().rev().map(|&idx| (idx, new_parent)));
    }
}
