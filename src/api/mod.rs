pub mod asset_types;
pub mod catalogs;
pub mod evaluate;
pub mod health;

use crate::orchestration::SessionContext;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub ctx: SessionContext,
}

impl AppState {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/asset-types", get(asset_types::list_asset_types))
        .route("/v1/asset-types/:id", get(asset_types::get_asset_type))
        .route("/v1/catalogs/:name", get(catalogs::get_catalog))
        .route("/v1/evaluate", post(evaluate::evaluate))
        .route("/v1/cascade", post(evaluate::cascade))
        .layer(cors)
        .with_state(state)
}
