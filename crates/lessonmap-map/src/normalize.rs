//! Structural normalization of a mind map.
//!
//! Caps the node count, prunes orphans, enforces the depth limit, drops
//! example/narrative nodes, colors nodes by depth and balances the main
//! branches between the left and right side of the root. Running it twice
//! gives the same result as running it once.

use std::collections::{HashMap, HashSet};

use lessonmap_core::config::{DEFAULT_COLORS, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES};
use lessonmap_core::{Error, Language, MindMapSettings, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::types::{normalize_text, Direction, MindMap, Node, NodeKey, ROOT_LOC, TREE_MODEL_CLASS};

/// Arabic example/narrative vocabulary, matched as substrings.
pub const ARABIC_EXAMPLE_KEYWORDS: &[&str] = &[
    "مثال",
    "امثلة",
    "مثلاً",
    "مثل",
    "على سبيل المثال",
    "قصة",
    "حكاية",
    "سيناريو",
    "تجربة",
    "توضيح",
    "حالة",
    "قصص",
    "حكايات",
    "سيناريوهات",
    "تجارب",
    "توضيحات",
    "حالات",
];

/// English example/narrative vocabulary, matched on word boundaries.
pub const ENGLISH_EXAMPLE_KEYWORDS: &[&str] = &[
    "example",
    "examples",
    "e.g.",
    "for example",
    "case",
    "e.g",
    "scenario",
    "story",
    "illustration",
    "experiment",
    "case study",
    "cases",
    "scenarios",
    "stories",
    "illustrations",
    "experiments",
    "case studies",
];

static ENGLISH_EXAMPLE_RE: Lazy<Regex> = Lazy::new(|| {
    let mut words: Vec<&str> = ENGLISH_EXAMPLE_KEYWORDS.to_vec();
    words.sort_by_key(|w| std::cmp::Reverse(w.len()));
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{})\b", alternation)).unwrap()
});

/// Options for [`post_process`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    /// Node cap, root included; 0 disables it.
    pub max_nodes: usize,
    /// Deepest level kept (root = 0); `None` is unlimited.
    pub max_depth: Option<usize>,
    pub exclude_examples: bool,
    /// Selects the exclusion vocabulary; `None` applies both languages.
    pub language: Option<Language>,
    /// Brush palette indexed by depth.
    pub colors: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            max_depth: usize::try_from(DEFAULT_MAX_DEPTH).ok(),
            exclude_examples: true,
            language: None,
            colors: DEFAULT_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl NormalizeOptions {
    pub fn from_settings(settings: &MindMapSettings, language: Option<Language>) -> Self {
        Self {
            max_nodes: settings.max_nodes,
            max_depth: settings.depth_limit(),
            exclude_examples: settings.exclude_examples,
            language,
            colors: settings.colors.clone(),
        }
    }
}

/// Whether a node label reads as an example or narrative.
pub fn is_example_text(text: &str, language: Option<Language>) -> bool {
    let normalized = normalize_text(text);
    let arabic = || ARABIC_EXAMPLE_KEYWORDS.iter().any(|kw| normalized.contains(kw));
    let english = || ENGLISH_EXAMPLE_RE.is_match(&normalized);
    match language {
        Some(Language::Arabic) => arabic(),
        Some(Language::English) => english(),
        None => arabic() || english(),
    }
}

/// Normalize a map. Never fails: on any internal error the input is
/// returned as is.
pub fn post_process(map: &MindMap, options: &NormalizeOptions) -> MindMap {
    match try_post_process(map, options) {
        Ok(out) => out,
        Err(e) => {
            debug!("Post-process skipped: {}", e);
            map.clone()
        }
    }
}

/// Normalize raw JSON. Values that are not a map with a non-empty node array
/// are returned unchanged.
pub fn post_process_value(value: Value, options: &NormalizeOptions) -> Value {
    let has_nodes = value
        .get("nodeDataArray")
        .and_then(Value::as_array)
        .is_some_and(|nodes| !nodes.is_empty());
    if !has_nodes {
        return value;
    }

    let map = match MindMap::from_value(value.clone()) {
        Ok(map) => map,
        Err(e) => {
            debug!("Post-process skipped: {}", e);
            return value;
        }
    };
    if map.root_index().is_none() {
        debug!("Post-process skipped: no root node");
        return with_default_class(value);
    }
    match post_process(&map, options).to_value() {
        Ok(out) => out,
        Err(e) => {
            debug!("Post-process skipped: {}", e);
            value
        }
    }
}

/// `value` with a blank or missing `class` set to the tree-model tag.
fn with_default_class(mut value: Value) -> Value {
    if let Value::Object(obj) = &mut value {
        let blank = obj
            .get("class")
            .and_then(Value::as_str)
            .map_or(true, |c| c.trim().is_empty());
        if blank {
            obj.insert("class".into(), Value::String(TREE_MODEL_CLASS.to_string()));
        }
    }
    value
}

fn try_post_process(map: &MindMap, options: &NormalizeOptions) -> Result<MindMap> {
    let mut out = map.clone();
    if out.class.trim().is_empty() {
        out.class = TREE_MODEL_CLASS.to_string();
    }

    let Some(root_idx) = out.root_index() else {
        return Ok(out);
    };
    if options.colors.is_empty() {
        return Err(Error::Internal("empty color palette".into()));
    }

    let before = out.nodes.len();
    let nodes = cap_nodes(std::mem::take(&mut out.nodes), root_idx, options.max_nodes);
    let (nodes, orphans) = prune_orphans(nodes);
    let (mut nodes, depths) = prune_tree(nodes, options)?;

    let root_key = nodes
        .iter()
        .find(|n| n.is_root())
        .map(|n| n.key)
        .ok_or_else(|| Error::Internal("root lost during pruning".into()))?;

    color_by_depth(&mut nodes, &depths, &options.colors);
    balance(&mut nodes, root_key);

    for node in nodes.iter_mut() {
        if node.is_root() {
            if node.loc.as_deref().map_or(true, |l| l.trim().is_empty()) {
                node.loc = Some(ROOT_LOC.to_string());
            }
        } else {
            node.loc = None;
        }
    }

    debug!(
        "Post-processed mind map: {} -> {} nodes ({} orphans pruned)",
        before,
        nodes.len(),
        orphans
    );

    out.nodes = nodes;
    Ok(out)
}

/// Keep the root plus the first `max_nodes - 1` other nodes, dropping later
/// duplicates of a key already kept.
fn cap_nodes(nodes: Vec<Node>, root_idx: usize, max_nodes: usize) -> Vec<Node> {
    let limit = if max_nodes == 0 {
        usize::MAX
    } else {
        max_nodes - 1
    };
    let mut seen: HashSet<NodeKey> = HashSet::from([nodes[root_idx].key]);
    let mut others = 0;
    let mut kept = Vec::with_capacity(nodes.len().min(limit.saturating_add(1)));

    for (idx, node) in nodes.into_iter().enumerate() {
        if idx == root_idx {
            kept.push(node);
            continue;
        }
        if others >= limit || !seen.insert(node.key) {
            continue;
        }
        others += 1;
        kept.push(node);
    }
    kept
}

fn children_index(nodes: &[Node]) -> HashMap<NodeKey, Vec<usize>> {
    let mut children: HashMap<NodeKey, Vec<usize>> = HashMap::new();
    for (idx, node) in nodes.iter().enumerate() {
        if let Some(parent) = node.parent {
            children.entry(parent).or_default().push(idx);
        }
    }
    children
}

/// Drop nodes whose parent does not exist, with all their descendants.
fn prune_orphans(nodes: Vec<Node>) -> (Vec<Node>, usize) {
    let keys: HashSet<NodeKey> = nodes.iter().map(|n| n.key).collect();
    let children = children_index(&nodes);

    let mut doomed: HashSet<usize> = HashSet::new();
    let mut stack: Vec<usize> = nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.parent.is_some_and(|p| !keys.contains(&p)))
        .map(|(idx, _)| idx)
        .collect();
    let orphans = stack.len();

    while let Some(idx) = stack.pop() {
        if !doomed.insert(idx) {
            continue;
        }
        if let Some(kids) = children.get(&nodes[idx].key) {
            stack.extend(kids.iter().copied());
        }
    }

    if doomed.is_empty() {
        return (nodes, 0);
    }
    let kept = nodes
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| !doomed.contains(idx))
        .map(|(_, n)| n)
        .collect();
    (kept, orphans)
}

/// Walk from the root, keeping nodes within the depth limit that are not
/// examples. Unreachable nodes are dropped. Returns the kept nodes in their
/// original order with their depths.
fn prune_tree(
    nodes: Vec<Node>,
    options: &NormalizeOptions,
) -> Result<(Vec<Node>, HashMap<NodeKey, usize>)> {
    let root_idx = nodes
        .iter()
        .position(|n| n.is_root())
        .ok_or_else(|| Error::Internal("root missing".into()))?;
    let children = children_index(&nodes);

    let mut depths: HashMap<usize, usize> = HashMap::from([(root_idx, 0)]);
    let mut stack = vec![root_idx];

    while let Some(idx) = stack.pop() {
        let depth = depths[&idx];
        let Some(kids) = children.get(&nodes[idx].key) else {
            continue;
        };
        for &child in kids {
            if depths.contains_key(&child) {
                continue;
            }
            let child_depth = depth + 1;
            if options.max_depth.is_some_and(|max| child_depth > max) {
                continue;
            }
            if options.exclude_examples && is_example_text(&nodes[child].text, options.language) {
                continue;
            }
            depths.insert(child, child_depth);
            stack.push(child);
        }
    }

    let mut by_key = HashMap::with_capacity(depths.len());
    let kept = nodes
        .into_iter()
        .enumerate()
        .filter_map(|(idx, node)| {
            depths.get(&idx).map(|&depth| {
                by_key.insert(node.key, depth);
                node
            })
        })
        .collect();
    Ok((kept, by_key))
}

fn color_by_depth(nodes: &mut [Node], depths: &HashMap<NodeKey, usize>, colors: &[String]) {
    let last = colors.len() - 1;
    for node in nodes.iter_mut() {
        let depth = depths.get(&node.key).copied().unwrap_or(0);
        node.brush = Some(colors[depth.min(last)].clone());
    }
}

/// Assign main branches to sides by subtree weight and propagate the side to
/// every descendant.
fn balance(nodes: &mut [Node], root_key: NodeKey) {
    let children = children_index(nodes);
    let main_branches = children.get(&root_key).cloned().unwrap_or_default();

    let subtree = |start: usize| -> Vec<usize> {
        let mut members = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            members.push(idx);
            if let Some(kids) = children.get(&nodes[idx].key) {
                stack.extend(kids.iter().copied());
            }
        }
        members
    };

    let mut weighted: Vec<(Vec<usize>, usize)> = main_branches
        .iter()
        .map(|&b| {
            let members = subtree(b);
            let weight = members.len();
            (members, weight)
        })
        .collect();
    // Stable: equal weights keep source order.
    weighted.sort_by(|a, b| b.1.cmp(&a.1));

    let (mut left, mut right) = (0usize, 0usize);
    let mut sides: Vec<(Vec<usize>, Direction)> = Vec::with_capacity(weighted.len());
    for (members, weight) in weighted {
        let dir = if left <= right {
            left += weight;
            Direction::Left
        } else {
            right += weight;
            Direction::Right
        };
        sides.push((members, dir));
    }

    for (members, dir) in sides {
        for idx in members {
            nodes[idx].dir = Some(dir);
        }
    }
    for node in nodes.iter_mut().filter(|n| n.is_root()) {
        node.dir = None;
    }
}
