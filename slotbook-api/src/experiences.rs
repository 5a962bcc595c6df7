use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use slotbook_catalog::Experience;
use slotbook_core::{CoreError, ExperienceDetail};

use crate::error::AppError;
use crate::state::AppState;

// ===== Request/Response Types =====

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/experiences", get(list_experiences))
        .route("/experiences/{id}", get(get_experience))
}

/// GET /experiences?search=
async fn list_experiences(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Experience>>, AppError> {
    let experiences = state.queries.list_experiences(params.search.as_deref()).await?;
    Ok(Json(experiences))
}

/// GET /experiences/:id
async fn get_experience(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExperienceDetail>, AppError> {
    let id: i64 = id
        .parse()
        .map_err(|_| CoreError::not_found("Experience", &id))?;
    let today = Utc::now().date_naive();
    let detail = state.queries.experience_detail(id, today).await?;
    Ok(Json(detail))
}
