use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::error::AppError;
use crate::registry::AssetTypeConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTypeSummary {
    pub id: u32,
    pub label: String,
    pub steps: usize,
    pub sections: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTypesResponse {
    pub asset_types: Vec<AssetTypeSummary>,
}

pub async fn list_asset_types(State(state): State<AppState>) -> Json<AssetTypesResponse> {
    let asset_types = state
        .ctx
        .registry
        .iter()
        .map(|c| AssetTypeSummary {
            id: c.id,
            label: c.label.clone(),
            steps: c.steps.len(),
            sections: c.flow.clone(),
        })
        .collect();
    Json(AssetTypesResponse { asset_types })
}

pub async fn get_asset_type(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AssetTypeConfig>, AppError> {
    let id: u32 = id
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid asset type id: {}", id)))?;
    state
        .ctx
        .registry
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("asset type {}", id)))
}
