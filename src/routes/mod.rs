// HTTP routes: LoadData / FindData over JSON

mod error;
mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::controller::PriceDataController;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) controller: Arc<PriceDataController>,
}

pub fn app(controller: Arc<PriceDataController>) -> Router {
    let state = AppState { controller };
    Router::new()
        .route("/", get(|| async { "pricetracker" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/prices/load", post(http::load_data_handler)) // POST /api/prices/load
        .route("/api/prices/find", post(http::find_data_handler)) // POST /api/prices/find
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
