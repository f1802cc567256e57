//! Type definitions for PayLinks, receipts and proofs
//!
//! These are the stable internal shapes. Backend wire shapes live in
//! [`crate::wire`] and are mapped onto these by [`crate::normalize`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::{ReceiptField, ReceiptFieldPolicy};

/// Native SOL, wrapped
pub const WRAPPED_SOL_MINT: &str = "So11111111111111111111111111111111111111112";
/// USDC on mainnet-beta
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
/// USDC on devnet
pub const USDC_DEVNET_MINT: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

// ==================== PayLinks ====================

/// PayLink lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayLinkStatus {
    Pending,
    Paid,
    Expired,
    Cancelled,
}

impl PayLinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayLinkStatus::Pending => "pending",
            PayLinkStatus::Paid => "paid",
            PayLinkStatus::Expired => "expired",
            PayLinkStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Some(PayLinkStatus::Pending),
            "paid" => Some(PayLinkStatus::Paid),
            "expired" => Some(PayLinkStatus::Expired),
            "cancelled" | "canceled" => Some(PayLinkStatus::Cancelled),
            _ => None,
        }
    }
}

/// Token a PayLink is denominated in
///
/// Serialized flat into the owning record as `token` plus, for custom
/// tokens, `tokenMint`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "token")]
pub enum Token {
    #[serde(rename = "SOL")]
    Sol,
    #[serde(rename = "USDC")]
    Usdc,
    #[serde(rename = "custom")]
    Custom {
        #[serde(rename = "tokenMint")]
        mint: String,
    },
}

impl Token {
    /// Display symbol
    pub fn symbol(&self) -> &str {
        match self {
            Token::Sol => "SOL",
            Token::Usdc => "USDC",
            Token::Custom { .. } => "custom",
        }
    }

    /// Mint string the backend records for this token
    pub fn wire_mint(&self) -> &str {
        match self {
            Token::Sol => "SOL",
            Token::Usdc => USDC_MINT,
            Token::Custom { mint } => mint,
        }
    }
}

/// A shareable request for a specific payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayLink {
    pub id: String,
    pub merchant_pubkey: String,
    /// Amount in the token's base units
    pub amount: u64,
    #[serde(flatten)]
    pub token: Token,
    pub status: PayLinkStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<String>,
    pub memo_enabled: bool,
    /// Fields receipts under this PayLink may ever disclose
    pub receipt_fields: ReceiptFieldPolicy,
}

impl PayLink {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Pending and not yet past its expiry
    pub fn is_payable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PayLinkStatus::Pending && !self.is_expired_at(now)
    }
}

/// Merchant request to create a PayLink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayLink {
    pub merchant_pubkey: String,
    pub amount: u64,
    #[serde(flatten)]
    pub token: Token,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<String>,
    pub memo_enabled: bool,
    pub receipt_fields: ReceiptFieldPolicy,
}

/// Filters for listing PayLinks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayLinkQuery {
    pub status: Option<PayLinkStatus>,
    pub token: Option<Token>,
    pub q: Option<String>,
    pub page: Option<u32>,
}

/// Filters for listing receipts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptQuery {
    pub merchant: Option<String>,
    pub page: Option<u32>,
}

// ==================== Receipts ====================

/// Receipt status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Valid,
    Unknown,
    Revoked,
}

/// When the payment happened
///
/// Backend receipts pin the payment to a slot; older demo proofs carry a
/// millisecond range instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeWindow {
    Slot(u64),
    Range { start: i64, end: i64 },
}

/// Private fact bundle a receipt's proofs are carved from
///
/// Never sent to a verifier as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    /// Mint address or token symbol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paylink_id: Option<String>,
    /// Payment transaction signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Binding nonce issued alongside the commitment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl ReceiptFacts {
    pub fn has(&self, field: ReceiptField) -> bool {
        match field {
            ReceiptField::Merchant => self.merchant.is_some(),
            ReceiptField::Amount => self.amount.is_some(),
            ReceiptField::Token => self.token.is_some(),
            ReceiptField::TimeWindow => self.time_window.is_some(),
            ReceiptField::InvoiceRef => self.invoice_ref.is_some(),
            ReceiptField::PaylinkId => self.paylink_id.is_some(),
        }
    }
}

/// Proof-of-payment record issued once a PayLink is paid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    pub commitment: String,
    pub paylink_id: String,
    pub merchant_pubkey: String,
    pub issued_at: DateTime<Utc>,
    pub status: ReceiptStatus,
    /// Selection used for the most recent proof
    pub disclosed_fields: ReceiptFieldPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<ReceiptFacts>,
}

// ==================== Proofs ====================

/// Fact values a proof reveals; undisclosed keys are absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paylink_id: Option<String>,
}

impl RevealedFields {
    pub fn contains(&self, field: ReceiptField) -> bool {
        match field {
            ReceiptField::Merchant => self.merchant.is_some(),
            ReceiptField::Amount => self.amount.is_some(),
            ReceiptField::Token => self.token.is_some(),
            ReceiptField::TimeWindow => self.time_window.is_some(),
            ReceiptField::InvoiceRef => self.invoice_ref.is_some(),
            ReceiptField::PaylinkId => self.paylink_id.is_some(),
        }
    }

    /// Revealed fields in canonical order
    pub fn fields(&self) -> Vec<ReceiptField> {
        ReceiptField::ALL
            .into_iter()
            .filter(|f| self.contains(*f))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Every revealed key here is revealed in `other` with the same value
    pub fn is_subset_of(&self, other: &RevealedFields) -> bool {
        fn sub<T: PartialEq>(a: &Option<T>, b: &Option<T>) -> bool {
            a.is_none() || a == b
        }
        sub(&self.merchant, &other.merchant)
            && sub(&self.amount, &other.amount)
            && sub(&self.token, &other.token)
            && sub(&self.time_window, &other.time_window)
            && sub(&self.invoice_ref, &other.invoice_ref)
            && sub(&self.paylink_id, &other.paylink_id)
    }
}

/// Freshness value binding a proof to its commitment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofBinding {
    /// Issued by the backend together with the commitment
    Nonce(String),
    /// Older demo proofs
    Signature {
        signature: String,
        timestamp: Option<i64>,
    },
}

/// A redacted, shareable receipt proof in its normalized shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptProof {
    pub commitment: String,
    pub binding: ProofBinding,
    pub revealed: RevealedFields,
}

impl ReceiptProof {
    pub fn nonce(&self) -> Option<&str> {
        match &self.binding {
            ProofBinding::Nonce(nonce) => Some(nonce),
            ProofBinding::Signature { .. } => None,
        }
    }
}

// ==================== Verification ====================

/// Outcome of verifying a proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub verified_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paylink_status: Option<PayLinkStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<String>,
}

impl VerifyResponse {
    /// Failed verification carrying a single reason
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            verified_fields: Vec::new(),
            signature: None,
            paylink_status: None,
            mismatches: vec![reason.into()],
        }
    }
}

// ==================== Activity, fees, pagination ====================

/// Kind of PayLink activity event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Created,
    WebhookReceived,
    PaymentSimulated,
    Verified,
    ReceiptIssued,
    Expired,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub id: String,
    pub paylink_id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Network priority fee levels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub low: u64,
    pub medium: u64,
    pub high: u64,
    pub recommended: u64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}
