// Handlers: version, LoadData, FindData

use axum::{Json, extract::State, response::IntoResponse};

use super::AppState;
use crate::error::PriceError;
use crate::models::api::{FindDataRequest, FindDataResponse, LoadDataResponse};
use crate::version::{NAME, VERSION};

/// GET /version returns the service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// POST /api/prices/load: one ingestion run; empty body on success.
pub(super) async fn load_data_handler(
    State(state): State<AppState>,
) -> Result<Json<LoadDataResponse>, PriceError> {
    state.controller.load().await?;
    Ok(Json(LoadDataResponse::default()))
}

/// POST /api/prices/find: bucketed aggregates, ascending by time.
pub(super) async fn find_data_handler(
    State(state): State<AppState>,
    Json(req): Json<FindDataRequest>,
) -> Result<Json<FindDataResponse>, PriceError> {
    let query = req.to_query()?;
    let prices = state.controller.find(&query).await?;
    Ok(Json(FindDataResponse::from(prices)))
}
