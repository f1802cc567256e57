//! Priority fee endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};

use crate::state::AppState;
use crate::types::{ApiError, PriorityFeeRequest};

/// Create fee routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/priority-estimate", post(priority_estimate))
}

/// POST /fees/priority-estimate
async fn priority_estimate(
    State(state): State<AppState>,
    payload: Result<Json<PriorityFeeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let estimate = state.fees().estimate(request).await?;
    Ok(Json(estimate))
}
