//! HTTP route handlers.

pub mod llm;
pub mod mindmaps;
pub mod stats;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use lessonmap_core::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(mindmaps::routes())
        .merge(stats::routes())
        .merge(llm::routes())
}

/// Status and JSON body for a failed request.
pub(crate) fn error_response(e: &Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match e {
        Error::InvalidInput(_) | Error::Parse { .. } | Error::StructuralInvalid(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::DuplicateContent(_) => StatusCode::CONFLICT,
        Error::Generation(_) | Error::GenerationFailed(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
        Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use lessonmap_chat::LLMConfig;
    use lessonmap_core::LessonMapConfig;
    use lessonmap_store::SqliteStore;
    use tempfile::TempDir;
    use tower::ServiceExt;

    pub fn test_state() -> (TempDir, Arc<AppState>) {
        let dir = TempDir::new().unwrap();
        let config = LessonMapConfig::from_env(dir.path()).unwrap();
        let store = SqliteStore::open(&config.data_paths.db).unwrap();
        let llm = LLMConfig::load_with(&config.data_paths.llm_config_file, |_| None);
        let state = Arc::new(AppState::with_llm_config(config, store, llm));
        (dir, state)
    }

    /// Send one request through the router; returns status and JSON body.
    pub async fn send(
        state: &Arc<AppState>,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(json) => request.body(Body::from(json.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
