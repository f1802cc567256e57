//! PayLink endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tracing::{info, instrument};

use crate::state::AppState;
use crate::types::{
    ActivityEventResponse, ApiError, CreatePaylinkRequest, ItemsResponse, PaylinkListParams,
    PaylinkResponse, SimulateResponse,
};

/// Create PayLink routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_paylink).get(list_paylinks))
        .route("/:id", get(get_paylink))
        .route("/:id/cancel", post(cancel_paylink))
        .route("/:id/activity", get(activity))
        .route("/:id/receipts", get(receipts))
        .route("/:id/simulate", post(simulate_payment))
}

/// Create a PayLink
/// POST /paylinks
#[instrument(skip(state, payload))]
async fn create_paylink(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaylinkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let created = state.ledger().write().await.create_paylink(request, Utc::now())?;

    info!(paylink_id = %created.paylink.id, "PayLink created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// List PayLinks, newest first
/// GET /paylinks?status=&token=&q=&page=
#[instrument(skip(state, params))]
async fn list_paylinks(
    State(state): State<AppState>,
    params: Result<Query<PaylinkListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let page = state.ledger().write().await.list_paylinks(&params, Utc::now());
    Ok(Json(page))
}

/// GET /paylinks/:id
async fn get_paylink(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let paylink = state.ledger().write().await.get_paylink(&id, Utc::now())?;
    Ok(Json(PaylinkResponse { paylink }))
}

/// Cancel a pending PayLink
/// POST /paylinks/:id/cancel
#[instrument(skip(state))]
async fn cancel_paylink(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let paylink = state.ledger().write().await.cancel_paylink(&id, Utc::now())?;
    Ok(Json(PaylinkResponse { paylink }))
}

/// GET /paylinks/:id/activity
async fn activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.ledger().read().await.activity(&id)?;
    Ok(Json(ActivityEventResponse { events }))
}

/// GET /paylinks/:id/receipts
async fn receipts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.ledger().read().await.paylink_receipts(&id)?;
    Ok(Json(ItemsResponse { items }))
}

/// Settle a PayLink with a generated signature (demo payments)
/// POST /paylinks/:id/simulate
#[instrument(skip(state))]
async fn simulate_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let signature = state.ledger().write().await.simulate_payment(&id, Utc::now())?;

    info!(paylink_id = %id, %signature, "Simulated payment");
    Ok(Json(SimulateResponse {
        signature: Some(signature),
    }))
}
