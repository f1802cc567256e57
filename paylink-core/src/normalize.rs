//! Wire-to-model normalization
//!
//! Pure, total mappings from backend shapes onto the internal model, with
//! explicit fallbacks for anything the backend leaves out or spells in a
//! way this client does not know.

use serde_json::Value;
use tracing::warn;

use crate::policy::ReceiptFieldPolicy;
use crate::types::{
    ActivityEvent, ActivityKind, FeeEstimate, NewPayLink, Page, PayLink, PayLinkStatus, ProofBinding,
    Receipt, ReceiptFacts, ReceiptProof, ReceiptStatus, RevealedFields, TimeWindow, Token,
    VerifyResponse, USDC_DEVNET_MINT, USDC_MINT, WRAPPED_SOL_MINT,
};
use crate::wire::{
    event_type, BackendProof, CreatePaylinkRequest, LegacyDisclosed, LegacyProof, LegacyWindow,
    ListResponse, MemoPolicy, PriorityFeeResponse, VerifyReceiptResponse, WireActivityEvent,
    WireFacts, WirePayLink, WireProof, WireReceipt, WireRevealed,
};

/// Fallback fee levels when the provider gives none
pub const DEFAULT_FEE_LEVELS: (u64, u64, u64) = (1_000, 2_000, 5_000);
pub const DEFAULT_FEE_UNIT: &str = "microLamportsPerCU";

const UNSPECIFIED_FAILURE: &str = "verification failed";

// ==================== PayLinks ====================

/// Known mints map onto token variants; anything else is custom
pub fn token_from_mint(mint: &str) -> Token {
    match mint {
        "SOL" | "sol" | WRAPPED_SOL_MINT => Token::Sol,
        "USDC" | "usdc" | USDC_MINT | USDC_DEVNET_MINT => Token::Usdc,
        other => Token::Custom {
            mint: other.to_string(),
        },
    }
}

/// Unknown status strings are treated as pending
pub fn paylink_status(status: &str) -> PayLinkStatus {
    PayLinkStatus::parse(status).unwrap_or(PayLinkStatus::Pending)
}

pub fn paylink(wire: WirePayLink) -> PayLink {
    PayLink {
        token: token_from_mint(&wire.mint),
        status: paylink_status(&wire.status),
        id: wire.id,
        merchant_pubkey: wire.merchant_pubkey,
        amount: wire.expected_amount,
        created_at: wire.created_at,
        expires_at: wire.expires_at,
        paid_at: wire.paid_at,
        paid_signature: wire.paid_signature,
        invoice_ref: wire.invoice_ref,
        memo_enabled: wire.memo_enabled.unwrap_or(true),
        receipt_fields: wire.receipt_fields_policy.unwrap_or_default(),
    }
}

/// Model-to-wire mapping for PayLink creation
pub fn create_request(new: NewPayLink) -> CreatePaylinkRequest {
    CreatePaylinkRequest {
        mint: new.token.wire_mint().to_string(),
        merchant_pubkey: new.merchant_pubkey,
        expected_amount: new.amount,
        expires_at: new.expires_at,
        invoice_ref: new.invoice_ref,
        memo_policy: MemoPolicy::new(new.memo_enabled),
        receipt_fields_policy: new.receipt_fields,
    }
}

// ==================== Receipts ====================

pub fn facts(paylink_id: &str, wire: WireFacts) -> ReceiptFacts {
    ReceiptFacts {
        merchant: wire.merchant_pubkey,
        amount: wire.amount,
        token: wire.mint,
        time_window: wire.slot.map(TimeWindow::Slot),
        invoice_ref: wire.invoice_ref,
        paylink_id: Some(paylink_id.to_string()),
        signature: None,
        nonce: wire.nonce,
    }
}

pub fn receipt(wire: WireReceipt) -> Receipt {
    let receipt_facts = wire.facts.map(|f| facts(&wire.paylink_id, f));
    let merchant_pubkey = receipt_facts
        .as_ref()
        .and_then(|f| f.merchant.clone())
        .unwrap_or_default();
    let status = if wire.commitment.is_empty() {
        ReceiptStatus::Unknown
    } else {
        ReceiptStatus::Valid
    };

    Receipt {
        id: wire.id,
        commitment: wire.commitment,
        paylink_id: wire.paylink_id,
        merchant_pubkey,
        issued_at: wire.issued_at,
        status,
        disclosed_fields: ReceiptFieldPolicy::none(),
        facts: receipt_facts,
    }
}

// ==================== Activity ====================

/// Unrecognized event types fall back to `created`
pub fn activity_kind(event_type: &str) -> ActivityKind {
    match event_type {
        event_type::WEBHOOK_RECEIVED => ActivityKind::WebhookReceived,
        event_type::PAYMENT_SIMULATED => ActivityKind::PaymentSimulated,
        event_type::TX_VERIFIED_MATCH | event_type::PAYLINK_MARKED_PAID => ActivityKind::Verified,
        event_type::RECEIPT_ISSUED => ActivityKind::ReceiptIssued,
        event_type::PAYLINK_EXPIRED => ActivityKind::Expired,
        event_type::PAYLINK_CANCELLED => ActivityKind::Cancelled,
        _ => ActivityKind::Created,
    }
}

fn describe_activity(event_type: &str, detail: &Value) -> Option<String> {
    let base = match event_type {
        event_type::PAYLINK_CREATED => "PayLink created by merchant",
        event_type::RAIL_SELECTED => "Privacy rail selected",
        event_type::WEBHOOK_RECEIVED => "Payment webhook received",
        event_type::PAYMENT_SIMULATED => "Simulated payment submitted",
        event_type::TX_VERIFIED_MATCH => "Transaction matched the PayLink",
        event_type::RECEIPT_ISSUED => "Receipt issued",
        event_type::PAYLINK_MARKED_PAID => "PayLink marked paid",
        event_type::PAYLINK_EXPIRED => "PayLink expired",
        event_type::PAYLINK_CANCELLED => "PayLink cancelled",
        _ => return detail.as_str().map(str::to_string),
    };

    let suffix = detail
        .get("signature")
        .or_else(|| detail.get("rail"))
        .or_else(|| detail.get("receiptId"))
        .and_then(Value::as_str);

    Some(match suffix {
        Some(s) => format!("{base} ({s})"),
        None => base.to_string(),
    })
}

/// `index` is the event's position in the PayLink's history
pub fn activity(paylink_id: &str, index: usize, wire: WireActivityEvent) -> ActivityEvent {
    ActivityEvent {
        id: format!("act_{paylink_id}_{index}"),
        paylink_id: paylink_id.to_string(),
        kind: activity_kind(&wire.r#type),
        timestamp: wire.at,
        details: describe_activity(&wire.r#type, &wire.detail),
    }
}

// ==================== Verification ====================

/// Authority verdict to verification result
pub fn verify_response(wire: VerifyReceiptResponse) -> VerifyResponse {
    if !wire.verified {
        let reason = if wire.reason.trim().is_empty() {
            UNSPECIFIED_FAILURE.to_string()
        } else {
            wire.reason
        };
        return VerifyResponse::rejected(reason);
    }

    let details = wire.details.unwrap_or_default();
    VerifyResponse {
        valid: true,
        verified_fields: details.matched_fields,
        signature: details.paid_signature,
        paylink_status: Some(PayLinkStatus::Paid),
        mismatches: Vec::new(),
    }
}

// ==================== Proofs ====================

/// Resolve either wire shape into the single internal proof shape
pub fn proof(wire: WireProof) -> ReceiptProof {
    match wire {
        WireProof::Backend(p) => ReceiptProof {
            commitment: p.commitment,
            binding: ProofBinding::Nonce(p.nonce),
            revealed: RevealedFields {
                merchant: p.revealed.merchant_pubkey,
                amount: p.revealed.amount,
                token: p.revealed.mint,
                time_window: p.revealed.slot.map(TimeWindow::Slot),
                invoice_ref: p.revealed.invoice_ref,
                paylink_id: p.revealed.paylink_id,
            },
        },
        WireProof::Legacy(p) => ReceiptProof {
            commitment: p.commitment_hash,
            binding: ProofBinding::Signature {
                signature: p.signature,
                timestamp: p.timestamp,
            },
            revealed: RevealedFields {
                merchant: p.disclosed_fields.merchant,
                amount: p.disclosed_fields.amount,
                token: p.disclosed_fields.token,
                time_window: p
                    .disclosed_fields
                    .time_window
                    .map(|w| TimeWindow::Range { start: w.start, end: w.end }),
                invoice_ref: p.disclosed_fields.invoice_ref,
                paylink_id: p.disclosed_fields.paylink_id,
            },
        },
    }
}

pub fn wire_revealed(revealed: &RevealedFields) -> WireRevealed {
    WireRevealed {
        paylink_id: revealed.paylink_id.clone(),
        merchant_pubkey: revealed.merchant.clone(),
        amount: revealed.amount,
        mint: revealed.token.clone(),
        slot: match revealed.time_window {
            Some(TimeWindow::Slot(slot)) => Some(slot),
            Some(TimeWindow::Range { start, end }) => {
                warn!(start, end, "Time range has no backend slot form, dropped");
                None
            }
            None => None,
        },
        invoice_ref: revealed.invoice_ref.clone(),
    }
}

/// Internal proof back to the wire shape it belongs to
pub fn wire_proof(proof: &ReceiptProof) -> WireProof {
    match &proof.binding {
        ProofBinding::Nonce(nonce) => WireProof::Backend(BackendProof {
            commitment: proof.commitment.clone(),
            nonce: nonce.clone(),
            revealed: wire_revealed(&proof.revealed),
        }),
        ProofBinding::Signature {
            signature,
            timestamp,
        } => WireProof::Legacy(LegacyProof {
            commitment_hash: proof.commitment.clone(),
            disclosed_fields: LegacyDisclosed {
                merchant: proof.revealed.merchant.clone(),
                amount: proof.revealed.amount,
                token: proof.revealed.token.clone(),
                time_window: match proof.revealed.time_window {
                    Some(TimeWindow::Range { start, end }) => Some(LegacyWindow { start, end }),
                    _ => None,
                },
                invoice_ref: proof.revealed.invoice_ref.clone(),
                paylink_id: proof.revealed.paylink_id.clone(),
            },
            signature: signature.clone(),
            timestamp: *timestamp,
        }),
    }
}

// ==================== Fees and pages ====================

fn fee_level(levels: &Value, key: &str, fallback: u64) -> u64 {
    levels
        .get(key)
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0).round() as u64)))
        .unwrap_or(fallback)
}

pub fn fee_estimate(wire: PriorityFeeResponse) -> FeeEstimate {
    let (low, medium, high) = DEFAULT_FEE_LEVELS;
    let medium = fee_level(&wire.levels, "medium", medium);
    let unit = if wire.unit.is_empty() {
        DEFAULT_FEE_UNIT.to_string()
    } else {
        wire.unit
    };

    FeeEstimate {
        low: fee_level(&wire.levels, "low", low),
        medium,
        high: fee_level(&wire.levels, "high", high),
        recommended: if wire.recommended == 0 { medium } else { wire.recommended },
        unit,
    }
}

pub fn page<W, T, F>(wire: ListResponse<W>, map: F) -> Page<T>
where
    F: FnMut(W) -> T,
{
    let seen = u64::from(wire.page.max(1)) * u64::from(wire.page_size);
    Page {
        items: wire.items.into_iter().map(map).collect(),
        total: wire.total,
        page: wire.page,
        page_size: wire.page_size,
        has_more: seen < wire.total,
    }
}
