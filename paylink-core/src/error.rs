//! Error types
//!
//! Expected failure paths (bad proofs, policy violations, transport
//! problems) are values, never panics.

use thiserror::Error;

use crate::policy::ReceiptField;

/// Failures building or ingesting a receipt proof
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisclosureError {
    #[error("Malformed proof: {0}")]
    MalformedProof(String),
    #[error("Disclosure not permitted by the PayLink policy: {}", join_fields(.fields))]
    PolicyViolation { fields: Vec<ReceiptField> },
    #[error("Receipt {receipt_id} has no private facts to disclose from")]
    MissingFacts { receipt_id: String },
    #[error("Receipt {receipt_id} has no issued nonce")]
    MissingNonce { receipt_id: String },
    #[error("Receipt {receipt_id} has a time range; only a slot can be disclosed")]
    UnslottedTimeWindow { receipt_id: String },
    #[error("Receipt {receipt_id} does not belong to PayLink {paylink_id}")]
    ReceiptMismatch {
        receipt_id: String,
        paylink_id: String,
    },
}

fn join_fields(fields: &[ReceiptField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures of the in-process ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Disclosure(#[from] DisclosureError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures talking to a payment gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Disclosure(#[from] DisclosureError),
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Worth retrying for idempotent reads
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Transport(_) => true,
            GatewayError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<LedgerError> for GatewayError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(what) => GatewayError::NotFound(what),
            LedgerError::InvalidInput(msg) => GatewayError::InvalidInput(msg),
            LedgerError::Conflict(msg) => GatewayError::Conflict(msg),
            LedgerError::Disclosure(err) => GatewayError::Disclosure(err),
            LedgerError::Internal(msg) => GatewayError::Status {
                status: 500,
                message: msg,
            },
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            GatewayError::Decode(value.to_string())
        } else {
            GatewayError::Transport(value.to_string())
        }
    }
}

/// Failures loading or saving merchant settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Settings encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
