use super::AppState;
use axum::extract::State;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once every registered type passes the consistency check.
pub async fn ready(State(state): State<AppState>) -> Json<serde_json::Value> {
    let broken = state.ctx.registry.consistency_errors();
    let status = if broken.is_empty() { "ready" } else { "degraded" };
    Json(serde_json::json!({
        "status": status,
        "assetTypes": state.ctx.registry.len(),
        "inconsistentTypes": broken.keys().collect::<Vec<_>>(),
    }))
}
