//! Backend wire contract
//!
//! Request and response shapes of the PayLink REST backend. These follow
//! the backend's naming (mint addresses, `expectedAmount`, upper-case event
//! types) and are versioned with it; nothing outside [`crate::normalize`],
//! [`crate::ledger`] and the gateways should need to look at them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DisclosureError;
use crate::policy::ReceiptFieldPolicy;

// ==================== PayLinks ====================

/// PayLink record as stored and served by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePayLink {
    pub id: String,
    pub merchant_pubkey: String,
    pub expected_amount: u64,
    pub mint: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub invoice_ref: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paid_signature: Option<String>,
    #[serde(default)]
    pub paid_slot: Option<u64>,
    #[serde(default)]
    pub privacy_rail: String,
    #[serde(default)]
    pub memo_enabled: Option<bool>,
    #[serde(default)]
    pub receipt_fields_policy: Option<ReceiptFieldPolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoPolicy {
    pub enabled: bool,
    pub template: String,
}

impl MemoPolicy {
    pub const DEFAULT_TEMPLATE: &'static str = "paylink:{id}";

    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            template: Self::DEFAULT_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaylinkRequest {
    pub merchant_pubkey: String,
    pub expected_amount: u64,
    pub mint: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub invoice_ref: Option<String>,
    pub memo_policy: MemoPolicy,
    pub receipt_fields_policy: ReceiptFieldPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaylinkResponse {
    pub paylink: WirePayLink,
    pub pay_url: String,
    pub privacy_rail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaylinkResponse {
    pub paylink: WirePayLink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

/// Query string of `GET /paylinks`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaylinkListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Symbol or mint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Query string of `GET /receipts`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    #[serde(default)]
    pub signature: Option<String>,
}

// ==================== Activity ====================

/// Backend activity event types
pub mod event_type {
    pub const PAYLINK_CREATED: &str = "PAYLINK_CREATED";
    pub const RAIL_SELECTED: &str = "RAIL_SELECTED";
    pub const WEBHOOK_RECEIVED: &str = "WEBHOOK_RECEIVED";
    pub const PAYMENT_SIMULATED: &str = "PAYMENT_SIMULATED";
    pub const TX_VERIFIED_MATCH: &str = "TX_VERIFIED_MATCH";
    pub const RECEIPT_ISSUED: &str = "RECEIPT_ISSUED";
    pub const PAYLINK_MARKED_PAID: &str = "PAYLINK_MARKED_PAID";
    pub const PAYLINK_EXPIRED: &str = "PAYLINK_EXPIRED";
    pub const PAYLINK_CANCELLED: &str = "PAYLINK_CANCELLED";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireActivityEvent {
    pub r#type: String,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub detail: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEventResponse {
    pub events: Vec<WireActivityEvent>,
}

// ==================== Receipts ====================

/// Fact bundle the backend records for a receipt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFacts {
    #[serde(default)]
    pub merchant_pubkey: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(default)]
    pub invoice_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireReceipt {
    pub id: String,
    pub paylink_id: String,
    pub commitment: String,
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<WireFacts>,
    #[serde(default)]
    pub rail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptResponse {
    pub receipt: WireReceipt,
}

// ==================== Proofs ====================

/// Revealed map in backend naming; undisclosed keys are absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRevealed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paylink_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_pubkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<String>,
}

/// Proof shape issued and checked by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendProof {
    pub commitment: String,
    pub nonce: String,
    #[serde(default)]
    pub revealed: WireRevealed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyWindow {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDisclosed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<LegacyWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paylink_id: Option<String>,
}

/// Proof shape produced by the demo flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProof {
    pub commitment_hash: String,
    #[serde(default)]
    pub disclosed_fields: LegacyDisclosed,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Either recognized proof shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireProof {
    Backend(BackendProof),
    Legacy(LegacyProof),
}

/// Reason given for proofs matching neither shape
pub const MISSING_PROOF_FIELDS: &str =
    "Missing required fields: commitment and nonce, or commitmentHash and signature";

impl WireProof {
    /// Decide which shape a JSON document is, then decode it
    pub fn classify(value: Value) -> Result<Self, DisclosureError> {
        let has = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false)
        };

        if has("commitment") && has("nonce") {
            serde_json::from_value(value)
                .map(WireProof::Backend)
                .map_err(|e| DisclosureError::MalformedProof(e.to_string()))
        } else if has("commitmentHash") && has("signature") {
            serde_json::from_value(value)
                .map(WireProof::Legacy)
                .map_err(|e| DisclosureError::MalformedProof(e.to_string()))
        } else {
            Err(DisclosureError::MalformedProof(MISSING_PROOF_FIELDS.to_string()))
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            WireProof::Backend(proof) => serde_json::to_value(proof),
            WireProof::Legacy(proof) => serde_json::to_value(proof),
        }
        .unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub disclosed: ReceiptFieldPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofResponse {
    pub proof: BackendProof,
}

// ==================== Verification ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReceiptRequest {
    pub proof: BackendProof,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDetails {
    #[serde(default)]
    pub paylink_id: Option<String>,
    #[serde(default)]
    pub merchant_pubkey: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default)]
    pub slot: Option<u64>,
    #[serde(default)]
    pub paid_signature: Option<String>,
    #[serde(default)]
    pub matched_fields: Vec<String>,
}

/// Verdict of the verification authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReceiptResponse {
    pub verified: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub details: Option<VerifyDetails>,
}

// ==================== Fees ====================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    #[serde(default)]
    pub serialized_tx_base64: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsInfo {
    #[serde(default)]
    pub account_keys: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityFeeRequest {
    #[serde(default)]
    pub transaction: Option<TransactionInfo>,
    #[serde(default)]
    pub accounts: Option<AccountsInfo>,
    #[serde(default)]
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityFeeResponse {
    pub levels: Value,
    pub unit: String,
    pub recommended: u64,
}

// ==================== Errors and health ====================

/// Error codes returned by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request body or parameters invalid
    InvalidInput,
    /// Entity does not exist
    NotFound,
    /// Entity is in the wrong state for the operation
    Conflict,
    /// Requested disclosure exceeds the PayLink policy
    PolicyViolation,
    /// Upstream RPC provider failed
    UpstreamFailed,
    /// Internal server error
    InternalError,
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub paylinks: u64,
    pub receipts: u64,
    pub uptime_secs: u64,
}
