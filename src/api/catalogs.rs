use axum::extract::{Path, State};
use axum::Json;

use super::AppState;
use crate::domain::CatalogEntry;
use crate::error::AppError;

/// Active entries of one catalog, served from the shared cache.
pub async fn get_catalog(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CatalogEntry>>, AppError> {
    let entries = state.ctx.catalogs.options(&name).await?;
    Ok(Json(entries))
}
