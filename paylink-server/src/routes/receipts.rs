//! Receipt, proof and verification endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::state::AppState;
use crate::types::{
    ApiError, ProofRequest, ProofResponse, ReceiptListParams, ReceiptResponse,
    VerifyReceiptRequest,
};

/// Create receipt routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_receipts))
        .route("/verify", post(verify_receipt))
        .route("/:id", get(get_receipt))
        .route("/:id/proof", post(issue_proof))
}

/// GET /receipts?merchant=&page=
async fn list_receipts(
    State(state): State<AppState>,
    params: Result<Query<ReceiptListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    Ok(Json(state.ledger().read().await.list_receipts(&params)))
}

/// GET /receipts/:id
async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let receipt = state.ledger().read().await.get_receipt(&id)?;
    Ok(Json(ReceiptResponse { receipt }))
}

/// Issue a proof revealing the requested fields
/// POST /receipts/:id/proof
#[instrument(skip(state, payload))]
async fn issue_proof(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ProofRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let proof = state.ledger().read().await.issue_proof(&id, &request.disclosed)?;

    info!(receipt_id = %id, "Proof issued");
    Ok(Json(ProofResponse { proof }))
}

/// Verify a proof against the stored receipt
/// POST /receipts/verify
#[instrument(skip(state, payload))]
async fn verify_receipt(
    State(state): State<AppState>,
    payload: Result<Json<VerifyReceiptRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let response = state.ledger().read().await.verify(&request.proof);

    info!(verified = response.verified, reason = %response.reason, "Proof verified");
    Ok(Json(response))
}
