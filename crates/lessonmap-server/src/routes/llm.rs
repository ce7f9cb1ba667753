//! LLM provider configuration routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use lessonmap_chat::{LLMConfigResponse, LLMConfigUpdate};
use serde_json::json;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/llm/config", get(get_config).put(update_config))
}

/// GET /api/llm/config: current provider setup, keys masked.
async fn get_config(State(state): State<Arc<AppState>>) -> Json<LLMConfigResponse> {
    Json(state.llm_config.read().to_response())
}

/// PUT /api/llm/config: merge an update and persist it.
async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LLMConfigUpdate>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut config = state.llm_config.write();
    let mut next = config.clone();

    if let Err(e) = next.apply_update(&update) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() })));
    }
    if let Err(e) = next.save() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Failed to save config: {}", e) })),
        );
    }

    *config = next;
    (StatusCode::OK, Json(json!(config.to_response())))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::test_support::{send, test_state};

    #[tokio::test]
    async fn test_get_default_config() {
        let (_dir, state) = test_state();
        let (status, body) = send(&state, "GET", "/api/llm/config", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["preferredProvider"], "auto");
        assert!(body["activeProvider"].is_null());
        assert!(body.get("groqApiKey").is_none());
    }

    #[tokio::test]
    async fn test_update_persists_and_activates() {
        let (dir, state) = test_state();
        let (status, body) = send(
            &state,
            "PUT",
            "/api/llm/config",
            Some(json!({"preferredProvider": "groq", "groqApiKey": "gsk-test", "temperature": 0.2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activeProvider"], "groq");
        assert_eq!(body["groqConfigured"], true);
        assert_eq!(body["temperature"], 0.2);
        assert!(dir.path().join("llm-config.json").exists());
    }

    #[tokio::test]
    async fn test_unknown_provider_is_rejected() {
        let (_dir, state) = test_state();
        let (status, _) = send(
            &state,
            "PUT",
            "/api/llm/config",
            Some(json!({"preferredProvider": "mystery"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&state, "GET", "/api/llm/config", None).await;
        assert_eq!(body["preferredProvider"], "auto");
    }
}
