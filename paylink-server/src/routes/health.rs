//! Health endpoint

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};

use crate::state::AppState;
use crate::types::HealthResponse;

/// Create health routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check endpoint
/// GET /health
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (paylinks, receipts) = {
        let ledger = state.ledger().read().await;
        (ledger.paylink_count() as u64, ledger.receipt_count() as u64)
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        paylinks,
        receipts,
        uptime_secs: state.uptime_secs(),
    };

    (StatusCode::OK, Json(response))
}
