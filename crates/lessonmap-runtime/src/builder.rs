//! One chunk in, one tree out.

use std::sync::Arc;

use lessonmap_chat::{GenerationRequest, Generator};
use lessonmap_core::Language;
use lessonmap_map::{extract_json_object, MindMap, Node, NodeKey, ROOT_LOC};
use serde_json::Value;
use tracing::{debug, warn};

/// Asks the generator for a chunk's tree and validates the answer.
pub struct SinglePassBuilder {
    generator: Arc<dyn Generator>,
    language: Language,
    enhanced_thinking: bool,
}

impl SinglePassBuilder {
    pub fn new(generator: Arc<dyn Generator>, language: Language, enhanced_thinking: bool) -> Self {
        Self {
            generator,
            language,
            enhanced_thinking,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Build the tree for one chunk. `None` when the call fails, the reply
    /// holds no JSON object, or the nodes have no root.
    pub async fn build(&self, chunk: &str) -> Option<MindMap> {
        let outline = if self.enhanced_thinking {
            self.plan(chunk).await
        } else {
            None
        };

        let request = GenerationRequest::main(chunk, self.language, outline);
        let raw = match self.generator.generate(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Generation call failed: {}", e);
                return None;
            }
        };

        let object = match extract_json_object(&raw) {
            Ok(object) => object,
            Err(e) => {
                warn!("No mind map in model output: {}", e);
                return None;
            }
        };

        let map = match MindMap::from_value(Value::Object(object)) {
            Ok(map) => map,
            Err(e) => {
                warn!("Rejected model output: {}", e);
                return None;
            }
        };

        if !map.is_empty() && map.root().is_none() {
            warn!("Rejected model output: {} nodes but no root", map.len());
            return None;
        }

        debug!("Chunk produced {} nodes", map.len());
        Some(map)
    }

    async fn plan(&self, chunk: &str) -> Option<String> {
        let request = GenerationRequest::planning(chunk, self.language);
        match self.generator.generate(&request).await {
            Ok(outline) if !outline.trim().is_empty() => Some(outline),
            Ok(_) => None,
            Err(e) => {
                debug!("Planning call failed, continuing without outline: {}", e);
                None
            }
        }
    }
}

/// Two-node stand-in tree, marked with `"fallback": true`.
pub fn placeholder(language: Language) -> MindMap {
    let mut root = Node::new(0, language.placeholder_root(), None);
    root.loc = Some(ROOT_LOC.to_string());
    let branch = Node::new(1, language.placeholder_branch(), Some(NodeKey(0)));

    let mut map = MindMap::new(vec![root, branch]);
    map.extra.insert("fallback".into(), Value::Bool(true));
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tree_json, FnGenerator};
    use lessonmap_chat::Stage;
    use lessonmap_core::Error;

    fn builder(generator: FnGenerator, enhanced: bool) -> (Arc<FnGenerator>, SinglePassBuilder) {
        let generator = Arc::new(generator);
        let builder = SinglePassBuilder::new(generator.clone(), Language::English, enhanced);
        (generator, builder)
    }

    #[tokio::test]
    async fn test_build_from_fenced_reply() {
        let reply = format!("Here you go:\n```json\n{}\n```", tree_json("Cells", &["Nucleus", "Membrane"]));
        let (_, builder) = builder(FnGenerator::new(move |_| Ok(reply.clone())), false);

        let map = builder.build("Cells have parts.").await.unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.root().unwrap().text, "Cells");
        assert_eq!(map.class, "go.TreeModel");
    }

    #[tokio::test]
    async fn test_build_defaults_class() {
        let reply = r#"{"nodeDataArray": [{"key": 1, "text": "Only"}]}"#;
        let (_, builder) = builder(FnGenerator::new(move |_| Ok(reply.to_string())), false);

        let map = builder.build("x").await.unwrap();
        assert_eq!(map.class, "go.TreeModel");
    }

    #[tokio::test]
    async fn test_generator_error_is_none() {
        let (_, builder) = builder(
            FnGenerator::new(|_| Err(Error::Generation("rate limited".into()))),
            false,
        );
        assert!(builder.build("x").await.is_none());
    }

    #[tokio::test]
    async fn test_unparsable_reply_is_none() {
        let (_, builder) = builder(FnGenerator::new(|_| Ok("I cannot help with that.".into())), false);
        assert!(builder.build("x").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_node_array_is_none() {
        let (_, builder) = builder(FnGenerator::new(|_| Ok(r#"{"nodes": []}"#.into())), false);
        assert!(builder.build("x").await.is_none());
    }

    #[tokio::test]
    async fn test_rootless_nodes_are_none() {
        let reply = r#"{"nodeDataArray": [{"key": 1, "parent": 2, "text": "a"}, {"key": 2, "parent": 1, "text": "b"}]}"#;
        let (_, builder) = builder(FnGenerator::new(move |_| Ok(reply.to_string())), false);
        assert!(builder.build("x").await.is_none());
    }

    #[tokio::test]
    async fn test_empty_node_array_is_a_tree() {
        let (_, builder) = builder(
            FnGenerator::new(|_| Ok(r#"{"class": "go.TreeModel", "nodeDataArray": []}"#.into())),
            false,
        );
        let map = builder.build("x").await.unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_planning_outline_feeds_main_call() {
        let reply = tree_json("Cells", &["Nucleus"]);
        let (generator, builder) = builder(
            FnGenerator::new(move |req| match req.stage {
                Stage::Planning => Ok("1. Cells\n2. Nucleus".into()),
                Stage::Main => Ok(reply.clone()),
            }),
            true,
        );

        assert!(builder.build("Cells have a nucleus.").await.is_some());
        let calls = generator.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].stage, Stage::Planning);
        assert_eq!(calls[1].outline.as_deref(), Some("1. Cells\n2. Nucleus"));
    }

    #[tokio::test]
    async fn test_failed_planning_is_ignored() {
        let reply = tree_json("Cells", &["Nucleus"]);
        let (generator, builder) = builder(
            FnGenerator::new(move |req| match req.stage {
                Stage::Planning => Err(Error::Http("timeout".into())),
                Stage::Main => Ok(reply.clone()),
            }),
            true,
        );

        assert!(builder.build("x").await.is_some());
        assert_eq!(generator.calls()[1].outline, None);
    }

    #[test]
    fn test_placeholder_shape() {
        let map = placeholder(Language::Arabic);
        assert_eq!(map.len(), 2);
        assert_eq!(map.root().unwrap().text, "محتوى تعليمي");
        assert_eq!(map.root().unwrap().loc.as_deref(), Some("0 0"));
        assert_eq!(map.nodes[1].parent, Some(NodeKey(0)));

        let value = map.to_value().unwrap();
        assert_eq!(value["fallback"], true);
        assert_eq!(value["class"], "go.TreeModel");
    }
}
