use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use slotbook_core::BookingDetails;
use slotbook_order::BookingRequest;
use tracing::info;

use crate::error::AppError;
use crate::state::AppState;

// ===== Request/Response Types =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingResponse {
    pub success: bool,
    pub booking_id: i64,
    pub total_cents: i64,
    pub ref_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", get(get_booking))
}

/// POST /bookings
async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<CreateBookingResponse>, AppError> {
    let Json(req) = payload?;

    let confirmation = state.coordinator.create_booking(req).await?;
    info!("Booking confirmed: {}", confirmation.reference);

    Ok(Json(CreateBookingResponse {
        success: true,
        booking_id: confirmation.booking_id,
        total_cents: confirmation.total_cents,
        ref_id: confirmation.reference,
    }))
}

/// GET /bookings/:id
///
/// `id` is either the numeric booking id or the reference id.
async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookingDetails>, AppError> {
    let details = state.queries.find_booking(&id).await?;
    Ok(Json(details))
}
