// PriceError -> HTTP status + JSON body

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::PriceError;

fn status_code(err: &PriceError) -> StatusCode {
    match err {
        PriceError::Validation(_) => StatusCode::BAD_REQUEST,
        PriceError::SourceUnavailable(_) | PriceError::Decode(_) => StatusCode::BAD_GATEWAY,
        PriceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for PriceError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        if status.is_server_error() {
            tracing::warn!(error = %self, kind = self.kind(), "request failed");
        }
        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
