//! Stats routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use lessonmap_store::StoreStats;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(get_stats))
}

/// GET /api/stats: storage statistics and the active generation setup.
async fn get_stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let store_stats = state.store.get_stats().unwrap_or_else(|_| StoreStats {
        total_mindmaps: 0,
        arabic_mindmaps: 0,
        english_mindmaps: 0,
        total_nodes: 0,
        db_path: String::new(),
        db_size_mb: 0.0,
    });

    let provider = state
        .llm_config
        .read()
        .resolve_provider()
        .map(|r| r.provider.to_string());
    let settings = &state.config.mindmap;

    Json(serde_json::json!({
        "mindmaps": store_stats.total_mindmaps,
        "arabicMindmaps": store_stats.arabic_mindmaps,
        "englishMindmaps": store_stats.english_mindmaps,
        "totalNodes": store_stats.total_nodes,
        "dbSizeMb": store_stats.db_size_mb,
        "llmProvider": provider,
        "settings": {
            "maxNodes": settings.max_nodes,
            "maxDepth": settings.max_depth,
            "multiPass": settings.multi_pass,
            "chunkSizeChars": settings.chunk_size_chars,
            "maxConcurrency": settings.max_concurrency,
        },
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use lessonmap_core::Language;
    use lessonmap_map::{MindMap, Node, NodeKey};
    use lessonmap_store::SaveMindMapOptions;

    use crate::routes::test_support::{send, test_state};

    #[tokio::test]
    async fn test_stats_shape() {
        let (_dir, state) = test_state();
        let map = MindMap::new(vec![
            Node::new(0, "طاقة", None),
            Node::new(1, "حركة", Some(NodeKey(0))),
        ]);
        state
            .store
            .save(
                "طاقة",
                &map,
                SaveMindMapOptions {
                    language: Language::Arabic,
                    ..Default::default()
                },
            )
            .unwrap();

        let (status, body) = send(&state, "GET", "/api/stats", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mindmaps"], 1);
        assert_eq!(body["arabicMindmaps"], 1);
        assert_eq!(body["totalNodes"], 2);
        assert!(body["llmProvider"].is_null());
        assert_eq!(body["settings"]["maxNodes"], 120);
    }
}
