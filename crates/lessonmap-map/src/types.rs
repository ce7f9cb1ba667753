//! Mind-map tree model (GoJS `TreeModel` shape).

use lessonmap_core::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Type tag written on every finished map.
pub const TREE_MODEL_CLASS: &str = "go.TreeModel";

/// Anchor of the root node when the model gives none.
pub const ROOT_LOC: &str = "0 0";

/// Integer node identifier.
///
/// Models emit keys as integers, integral floats (`3.0`) or numeric strings
/// (`"3"`); all of them deserialize to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeKey(pub i64);

impl NodeKey {
    /// Interpret a loosely-typed JSON value as a key.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral_f64))
                .map(NodeKey),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
                    .map(NodeKey)
            }
            _ => None,
        }
    }
}

fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Some(f as i64)
    } else {
        None
    }
}

impl<'de> Deserialize<'de> for NodeKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        NodeKey::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid node key: {}", value)))
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeKey {
    fn from(k: i64) -> Self {
        NodeKey(k)
    }
}

/// Side of the root a main branch (and its whole subtree) is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

/// One mind-map concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: NodeKey,
    #[serde(deserialize_with = "text_from_any")]
    pub text: String,
    /// `None` marks the root; the field is omitted when serialized.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "parent_from_any"
    )]
    pub parent: Option<NodeKey>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "direction_lenient"
    )]
    pub dir: Option<Direction>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_lenient"
    )]
    pub brush: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_lenient"
    )]
    pub loc: Option<String>,
    /// Every other field, passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    pub fn new(key: impl Into<NodeKey>, text: impl Into<String>, parent: Option<NodeKey>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            parent,
            dir: None,
            brush: None,
            loc: None,
            extra: Map::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

fn text_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid node text: {}", other))),
    }
}

fn parent_from_any<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<NodeKey>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    NodeKey::from_json(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid parent key: {}", value)))
}

fn direction_lenient<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Direction>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value.as_str().map(|s| s.trim().to_lowercase()) {
        Some(s) if s == "left" => Some(Direction::Left),
        Some(s) if s == "right" => Some(Direction::Right),
        _ => None,
    })
}

fn string_lenient<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// A mind map: `{ "class": ..., "nodeDataArray": [...] }` plus passthrough fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindMap {
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(rename = "nodeDataArray")]
    pub nodes: Vec<Node>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_class() -> String {
    TREE_MODEL_CLASS.to_string()
}

impl Default for MindMap {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MindMap {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            class: default_class(),
            nodes,
            extra: Map::new(),
        }
    }

    /// Build a map from untrusted JSON.
    ///
    /// The value must be an object with a `nodeDataArray` array. Elements that
    /// are not objects or have no usable `key`/`text` are skipped.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut obj) = value else {
            return Err(Error::StructuralInvalid(
                "mind map must be a JSON object".into(),
            ));
        };

        let items = match obj.remove("nodeDataArray") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(Error::StructuralInvalid(
                    "nodeDataArray is not an array".into(),
                ))
            }
            None => return Err(Error::StructuralInvalid("missing nodeDataArray".into())),
        };

        let class = match obj.remove("class") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => default_class(),
        };

        let mut nodes = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<Node>(item) {
                Ok(node) => nodes.push(node),
                Err(e) => warn!("Skipping malformed node at index {}: {}", i, e),
            }
        }

        Ok(Self {
            class,
            nodes,
            extra: obj,
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// First node without a parent.
    pub fn root(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.is_root())
    }

    pub fn root_index(&self) -> Option<usize> {
        self.nodes.iter().position(|n| n.is_root())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Lowercase and collapse whitespace; the identity used for dedup and
/// keyword matching.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_accepts_loose_numbers() {
        assert_eq!(NodeKey::from_json(&json!(3)), Some(NodeKey(3)));
        assert_eq!(NodeKey::from_json(&json!(3.0)), Some(NodeKey(3)));
        assert_eq!(NodeKey::from_json(&json!(" 7 ")), Some(NodeKey(7)));
        assert_eq!(NodeKey::from_json(&json!(2.5)), None);
        assert_eq!(NodeKey::from_json(&json!("seven")), None);
        assert_eq!(NodeKey::from_json(&json!(null)), None);
    }

    #[test]
    fn test_from_value_skips_malformed_nodes() {
        let value = json!({
            "nodeDataArray": [
                {"key": 1, "text": "Root"},
                {"key": "2", "text": 42, "parent": 1.0},
                {"text": "no key", "parent": 1},
                "not an object",
                {"key": 4, "parent": 1}
            ]
        });
        let map = MindMap::from_value(value).unwrap();
        assert_eq!(map.class, TREE_MODEL_CLASS);
        assert_eq!(map.len(), 2);
        assert_eq!(map.nodes[1].text, "42");
        assert_eq!(map.nodes[1].parent, Some(NodeKey(1)));
    }

    #[test]
    fn test_from_value_requires_node_array() {
        assert!(matches!(
            MindMap::from_value(json!({"class": "go.TreeModel"})),
            Err(Error::StructuralInvalid(_))
        ));
        assert!(matches!(
            MindMap::from_value(json!({"nodeDataArray": {}})),
            Err(Error::StructuralInvalid(_))
        ));
        assert!(MindMap::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_passthrough_and_canonical_root() {
        let value = json!({
            "class": "go.TreeModel",
            "title": "Cells",
            "nodeDataArray": [
                {"key": 1, "text": "Cell", "parent": null, "loc": "0 0", "icon": "cell.png"},
                {"key": 2, "text": "Nucleus", "parent": 1, "dir": "sideways", "brush": 5}
            ]
        });
        let map = MindMap::from_value(value).unwrap();
        assert_eq!(map.extra["title"], "Cells");
        assert_eq!(map.nodes[0].extra["icon"], "cell.png");
        assert_eq!(map.nodes[1].dir, None);
        assert_eq!(map.nodes[1].brush, None);

        let out = map.to_value().unwrap();
        let root = &out["nodeDataArray"][0];
        assert!(root.get("parent").is_none());
        assert_eq!(root["icon"], "cell.png");
        assert_eq!(out["title"], "Cells");
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        let mut node = Node::new(2, "Leaf", Some(NodeKey(1)));
        node.dir = Some(Direction::Right);
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["dir"], "right");
        assert_eq!(v["parent"], 1);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Light   Reactions\n"), "light reactions");
        assert_eq!(normalize_text("الطاقة  الشمسية"), "الطاقة الشمسية");
    }
}
