//! Type definitions for the PayLink server
//!
//! Request and response bodies are the shared wire contract in
//! [`paylink_core::wire`]; this module adds the API error type.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use paylink_core::error::{DisclosureError, LedgerError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub use paylink_core::wire::*;

/// Error returned by route handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Disclosure(#[from] DisclosureError),
    #[error("Upstream request failed: {0}")]
    Upstream(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(what) => ApiError::NotFound(what),
            LedgerError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            LedgerError::Conflict(msg) => ApiError::Conflict(msg),
            LedgerError::Disclosure(err) => ApiError::Disclosure(err),
            LedgerError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::InvalidInput(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::InvalidInput(value.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorCode, Option<serde_json::Value>) {
        match self {
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, None),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Conflict, None),
            ApiError::Disclosure(DisclosureError::PolicyViolation { fields }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::PolicyViolation,
                Some(json!({ "fields": fields })),
            ),
            ApiError::Disclosure(_) => (StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, None),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, ErrorCode::UpstreamFailed, None),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                None,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.parts();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            code,
            message: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paylink_core::ReceiptField;

    #[test]
    fn test_policy_violation_carries_fields() {
        let err = ApiError::from(LedgerError::Disclosure(DisclosureError::PolicyViolation {
            fields: vec![ReceiptField::InvoiceRef],
        }));
        let (status, code, details) = err.parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, ErrorCode::PolicyViolation);
        assert_eq!(details, Some(json!({ "fields": ["invoiceRef"] })));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(LedgerError::Conflict("paid".into())).parts().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(LedgerError::NotFound("PayLink x".into())).to_string(),
            "PayLink x not found"
        );
        assert_eq!(
            ApiError::Upstream("timeout".into()).parts().1,
            ErrorCode::UpstreamFailed
        );
    }
}
