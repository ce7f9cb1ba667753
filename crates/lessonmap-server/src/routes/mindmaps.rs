//! Mind-map routes: generate, browse, normalize, reprocess.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use lessonmap_core::{Error, Language};
use lessonmap_ingest::{content_hash, sanitize_content};
use lessonmap_map::{post_process_value, NormalizeOptions};
use lessonmap_runtime::{ReprocessFilter, Reprocessor};
use lessonmap_store::{MindMapRecord, SaveMindMapOptions};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::error_response;
use crate::state::AppState;

type ApiResponse = (StatusCode, Json<Value>);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mindmaps", get(list_mindmaps).post(create_mindmap))
        .route("/mindmaps/normalize", post(normalize_mindmap))
        .route("/mindmaps/reprocess", post(reprocess_mindmaps))
        .route("/mindmaps/{id}", get(get_mindmap).delete(delete_mindmap))
}

fn parse_language(raw: Option<&str>, default: Language) -> Result<Language, Error> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Unsupported language: {}", s))),
        None => Ok(default),
    }
}

fn summary(record: &MindMapRecord) -> Value {
    json!({
        "id": record.id,
        "uuid": record.uuid,
        "title": record.title,
        "language": record.language,
        "nodeCount": record.mindmap.len(),
        "createdAt": record.created_at,
        "updatedAt": record.updated_at,
    })
}

// ---------------------------------------------------------------
// Generate
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct CreateMindMapRequest {
    text: String,
    title: Option<String>,
    language: Option<String>,
}

/// POST /api/mindmaps: generate a map from lesson text and store it.
async fn create_mindmap(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMindMapRequest>,
) -> ApiResponse {
    let language = match parse_language(req.language.as_deref(), state.config.default_language) {
        Ok(language) => language,
        Err(e) => return error_response(&e),
    };

    let text = sanitize_content(&req.text);
    if text.is_empty() {
        return error_response(&Error::InvalidInput("text is empty".into()));
    }

    let hash = content_hash(&text);
    match state.store.find_by_hash(&hash) {
        Ok(Some(existing)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "Duplicate content",
                    "id": existing.id,
                    "contentHash": hash,
                })),
            )
        }
        Ok(None) => {}
        Err(e) => return error_response(&e),
    }

    if state.llm_config.read().resolve_provider().is_none() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "No LLM provider configured" })),
        );
    }

    let report = match state.pipeline(language).generate(&text).await {
        Ok(report) => report,
        Err(e) => return error_response(&e),
    };

    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| report.mindmap.root().map(|n| n.text.clone()))
        .unwrap_or_else(|| "Untitled".to_string());

    let metadata = json!({
        "chunksTotal": report.chunks_total,
        "chunksSucceeded": report.chunks_succeeded,
        "merged": report.merged,
        "placeholder": report.placeholder,
        "durationMs": report.duration_ms,
    });

    match state.store.save(
        &title,
        &report.mindmap,
        SaveMindMapOptions {
            language,
            metadata: Some(metadata),
            content_hash: Some(hash.clone()),
            created_at: None,
        },
    ) {
        Ok(id) => {
            info!("Generated mind map {} ({} nodes)", id, report.node_count);
            (
                StatusCode::CREATED,
                Json(json!({
                    "id": id,
                    "title": title,
                    "language": language,
                    "contentHash": hash,
                    "mindmap": report.mindmap,
                    "report": {
                        "chunksTotal": report.chunks_total,
                        "chunksSucceeded": report.chunks_succeeded,
                        "merged": report.merged,
                        "placeholder": report.placeholder,
                        "nodeCount": report.node_count,
                        "durationMs": report.duration_ms,
                    },
                })),
            )
        }
        Err(e) => error_response(&e),
    }
}

// ---------------------------------------------------------------
// Browse
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct ListQuery {
    page: Option<usize>,
    #[serde(rename = "pageSize")]
    page_size: Option<usize>,
}

/// GET /api/mindmaps: newest first, paginated.
async fn list_mindmaps(State(state): State<Arc<AppState>>, Query(q): Query<ListQuery>) -> ApiResponse {
    let page = q.page.unwrap_or(1).max(1);
    let page_size = q.page_size.unwrap_or(20).clamp(1, 100);

    match state.store.list(page, page_size) {
        Ok((records, total)) => (
            StatusCode::OK,
            Json(json!({
                "mindmaps": records.iter().map(summary).collect::<Vec<_>>(),
                "total": total,
                "page": page,
                "pageSize": page_size,
            })),
        ),
        Err(e) => error_response(&e),
    }
}

/// GET /api/mindmaps/{id}
async fn get_mindmap(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResponse {
    match state.store.get(id) {
        Ok(Some(record)) => (StatusCode::OK, Json(json!(record))),
        Ok(None) => error_response(&Error::NotFound(format!("mind map {}", id))),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/mindmaps/{id}
async fn delete_mindmap(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResponse {
    match state.store.delete(id) {
        Ok(true) => (StatusCode::OK, Json(json!({ "deleted": true, "id": id }))),
        Ok(false) => error_response(&Error::NotFound(format!("mind map {}", id))),
        Err(e) => error_response(&e),
    }
}

// ---------------------------------------------------------------
// Normalize / reprocess
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct NormalizeRequest {
    mindmap: Value,
    language: Option<String>,
}

/// POST /api/mindmaps/normalize: post-process a tree without storing it.
async fn normalize_mindmap(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NormalizeRequest>,
) -> ApiResponse {
    let language = match req.language.as_deref() {
        Some(raw) => match parse_language(Some(raw), state.config.default_language) {
            Ok(language) => Some(language),
            Err(e) => return error_response(&e),
        },
        None => None,
    };
    let options = NormalizeOptions::from_settings(&state.config.mindmap, language);
    (StatusCode::OK, Json(post_process_value(req.mindmap, &options)))
}

#[derive(Deserialize)]
struct ReprocessRequest {
    #[serde(flatten)]
    filter: ReprocessFilter,
    #[serde(default)]
    apply: bool,
}

/// POST /api/mindmaps/reprocess: re-normalize stored maps; dry run by default.
async fn reprocess_mindmaps(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReprocessRequest>,
) -> ApiResponse {
    let reprocessor = Reprocessor::new(&state.store, &state.config.mindmap);
    match reprocessor.run(&req.filter, req.apply) {
        Ok(report) => (StatusCode::OK, Json(json!(report))),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{send, test_state};
    use lessonmap_map::{MindMap, Node, NodeKey};

    fn sample_map() -> MindMap {
        MindMap::new(vec![
            Node::new(0, "Cells", None),
            Node::new(1, "Nucleus", Some(NodeKey(0))),
            Node::new(2, "Membrane", Some(NodeKey(0))),
        ])
    }

    fn seed(state: &AppState, title: &str, hash: &str) -> i64 {
        state
            .store
            .save(
                title,
                &sample_map(),
                SaveMindMapOptions {
                    content_hash: Some(hash.into()),
                    ..Default::default()
                },
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_requires_provider() {
        let (_dir, state) = test_state();
        let (status, body) = send(&state, "POST", "/api/mindmaps", Some(json!({"text": "Cells divide."}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "No LLM provider configured");
    }

    #[tokio::test]
    async fn test_create_rejects_empty_text_and_bad_language() {
        let (_dir, state) = test_state();
        let (status, _) = send(&state, "POST", "/api/mindmaps", Some(json!({"text": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &state,
            "POST",
            "/api/mindmaps",
            Some(json!({"text": "Cells.", "language": "klingon"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("klingon"));
    }

    #[tokio::test]
    async fn test_create_detects_duplicate_content() {
        let (_dir, state) = test_state();
        let id = seed(&state, "Cells", &content_hash("Cells divide."));

        let (status, body) = send(
            &state,
            "POST",
            "/api/mindmaps",
            Some(json!({"text": "  Cells   divide. "})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["id"], id);
    }

    #[tokio::test]
    async fn test_list_get_delete() {
        let (_dir, state) = test_state();
        let first = seed(&state, "First", "h1");
        let second = seed(&state, "Second", "h2");

        let (status, body) = send(&state, "GET", "/api/mindmaps?page=1&pageSize=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["mindmaps"].as_array().unwrap().len(), 1);
        assert_eq!(body["mindmaps"][0]["nodeCount"], 3);

        let (status, body) = send(&state, "GET", &format!("/api/mindmaps/{}", first), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "First");
        assert_eq!(body["mindmap"]["nodeDataArray"][1]["parent"], 0);

        let (status, _) = send(&state, "DELETE", &format!("/api/mindmaps/{}", second), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&state, "GET", &format!("/api/mindmaps/{}", second), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&state, "DELETE", &format!("/api/mindmaps/{}", second), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_normalize_endpoint() {
        let (_dir, state) = test_state();
        let tree = json!({
            "nodeDataArray": [
                {"key": 1, "text": "Energy"},
                {"key": 2, "parent": 1, "text": "Kinetic", "loc": "5 5"},
                {"key": 3, "parent": 9, "text": "Orphan"}
            ]
        });

        let (status, body) = send(&state, "POST", "/api/mindmaps/normalize", Some(json!({"mindmap": tree}))).await;
        assert_eq!(status, StatusCode::OK);
        let nodes = body["nodeDataArray"].as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["loc"], "0 0");
        assert_eq!(nodes[1]["dir"], "left");
        assert!(nodes[1].get("loc").is_none());
        assert!(nodes.iter().all(|n| n["brush"].is_string()));
        assert_eq!(body["class"], "go.TreeModel");
    }

    #[tokio::test]
    async fn test_reprocess_endpoint() {
        let (_dir, state) = test_state();
        let id = seed(&state, "Cells", "h1");

        let (status, body) = send(&state, "POST", "/api/mindmaps/reprocess", Some(json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processed"], 1);
        assert_eq!(body["applied"], false);
        assert!(state.store.get(id).unwrap().unwrap().mindmap.nodes[1].dir.is_none());

        let (status, body) = send(
            &state,
            "POST",
            "/api/mindmaps/reprocess",
            Some(json!({"apply": true, "titleContains": "cell"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 1);
        assert!(state.store.get(id).unwrap().unwrap().mindmap.nodes[1].dir.is_some());
    }
}
