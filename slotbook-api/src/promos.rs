use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::state::AppState;

// ===== Request/Response Types =====

#[derive(Debug, Default, Deserialize)]
pub struct ValidatePromoRequest {
    #[serde(default)]
    pub code: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/promo/validate", post(validate_promo))
}

/// POST /promo/validate
async fn validate_promo(
    State(state): State<AppState>,
    payload: Result<Json<ValidatePromoRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    let code = req.code.unwrap_or_default();

    match state.queries.validate_promo(&code).await? {
        Some(promo) => Ok(Json(json!({ "valid": true, "promo": promo })).into_response()),
        None => Ok((StatusCode::NOT_FOUND, Json(json!({ "valid": false }))).into_response()),
    }
}
