//! In-process PayLink ledger
//!
//! Holds PayLinks, their receipts and activity history with the semantics
//! of the REST backend: validation on creation, lazy expiry, cancellation
//! rules, settlement with single receipt issuance, policy-checked proof
//! issuance and commitment-backed verification.
//!
//! The ledger is synchronous and clock-free: callers pass `now` and wrap
//! it in whatever lock suits them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::commitment::{random_nonce, CommitmentPayload};
use crate::error::{DisclosureError, LedgerError};
use crate::normalize;
use crate::policy::{ReceiptField, ReceiptFieldPolicy};
use crate::proof::ProofBuilder;
use crate::types::PayLinkStatus;
use crate::wire::{
    event_type, BackendProof, CreatePaylinkRequest, CreatePaylinkResponse, ListResponse,
    PaylinkListParams, ReceiptListParams, VerifyDetails, VerifyReceiptResponse,
    WireActivityEvent, WireFacts, WirePayLink, WireProof, WireReceipt,
};

/// Items per listing page
pub const PAGE_SIZE: u32 = 20;

/// First slot handed out to simulated payments
const SIMULATED_SLOT_BASE: u64 = 250_000_000;

const DEFAULT_BASE_PAY_URL: &str = "http://localhost:5173";
const DEFAULT_PRIVACY_RAIL: &str = "transparent";

/// Outcome reasons reported by [`Ledger::verify`]
pub mod reason {
    pub const VERIFIED: &str = "receipt verified";
    pub const NOT_FOUND: &str = "receipt not found";
    pub const NONCE_MISMATCH: &str = "nonce mismatch";
    pub const COMMITMENT_MISMATCH: &str = "commitment mismatch";
    /// Suffix after the offending field's wire name
    pub const NOT_DISCLOSABLE: &str = "not disclosable";
}

#[derive(Debug)]
pub struct Ledger {
    paylinks: HashMap<String, WirePayLink>,
    receipts: HashMap<String, WireReceipt>,
    receipt_by_commitment: HashMap<String, String>,
    receipt_by_paylink: HashMap<String, String>,
    events: HashMap<String, Vec<WireActivityEvent>>,
    base_pay_url: String,
    privacy_rail: String,
    next_slot: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_PAY_URL, DEFAULT_PRIVACY_RAIL)
    }
}

impl Ledger {
    pub fn new(base_pay_url: impl Into<String>, privacy_rail: impl Into<String>) -> Self {
        Self {
            paylinks: HashMap::new(),
            receipts: HashMap::new(),
            receipt_by_commitment: HashMap::new(),
            receipt_by_paylink: HashMap::new(),
            events: HashMap::new(),
            base_pay_url: base_pay_url.into(),
            privacy_rail: privacy_rail.into(),
            next_slot: SIMULATED_SLOT_BASE,
        }
    }

    pub fn privacy_rail(&self) -> &str {
        &self.privacy_rail
    }

    pub fn paylink_count(&self) -> usize {
        self.paylinks.len()
    }

    pub fn receipt_count(&self) -> usize {
        self.receipts.len()
    }

    fn record(&mut self, paylink_id: &str, kind: &str, detail: Value, now: DateTime<Utc>) {
        self.events
            .entry(paylink_id.to_string())
            .or_default()
            .push(WireActivityEvent {
                r#type: kind.to_string(),
                at: now,
                detail,
            });
    }

    fn pay_url(&self, id: &str) -> String {
        format!("{}/pay/{}", self.base_pay_url.trim_end_matches('/'), id)
    }

    // ==================== PayLinks ====================

    pub fn create_paylink(
        &mut self,
        request: CreatePaylinkRequest,
        now: DateTime<Utc>,
    ) -> Result<CreatePaylinkResponse, LedgerError> {
        if request.merchant_pubkey.trim().is_empty() {
            return Err(LedgerError::InvalidInput("merchantPubkey is required".to_string()));
        }
        if request.mint.trim().is_empty() {
            return Err(LedgerError::InvalidInput("mint is required".to_string()));
        }
        if request.expected_amount == 0 {
            return Err(LedgerError::InvalidInput(
                "expectedAmount must be greater than zero".to_string(),
            ));
        }
        if request.expires_at <= now {
            return Err(LedgerError::InvalidInput(
                "expiresAt must be in the future".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let paylink = WirePayLink {
            id: id.clone(),
            merchant_pubkey: request.merchant_pubkey,
            expected_amount: request.expected_amount,
            mint: request.mint,
            expires_at: request.expires_at,
            invoice_ref: request.invoice_ref,
            status: PayLinkStatus::Pending.as_str().to_string(),
            created_at: now,
            paid_at: None,
            paid_signature: None,
            paid_slot: None,
            privacy_rail: self.privacy_rail.clone(),
            memo_enabled: Some(request.memo_policy.enabled),
            receipt_fields_policy: Some(request.receipt_fields_policy),
        };

        self.record(
            &id,
            event_type::PAYLINK_CREATED,
            json!({
                "memoPolicy": request.memo_policy,
                "receiptFieldsPolicy": request.receipt_fields_policy,
            }),
            now,
        );
        let rail = self.privacy_rail.clone();
        self.record(&id, event_type::RAIL_SELECTED, json!({ "rail": rail }), now);
        self.paylinks.insert(id.clone(), paylink.clone());

        info!(paylink_id = %id, amount = paylink.expected_amount, "PayLink created");

        Ok(CreatePaylinkResponse {
            pay_url: self.pay_url(&id),
            privacy_rail: rail,
            paylink,
        })
    }

    /// Mark every pending PayLink past its expiry as expired
    pub fn expire_stale(&mut self, now: DateTime<Utc>) -> usize {
        let stale: Vec<String> = self
            .paylinks
            .values()
            .filter(|p| p.status == PayLinkStatus::Pending.as_str() && p.expires_at <= now)
            .map(|p| p.id.clone())
            .collect();

        for id in &stale {
            self.expire_one(id, now);
        }
        stale.len()
    }

    fn expire_one(&mut self, id: &str, now: DateTime<Utc>) {
        let expired = match self.paylinks.get_mut(id) {
            Some(p) if p.status == PayLinkStatus::Pending.as_str() && p.expires_at <= now => {
                p.status = PayLinkStatus::Expired.as_str().to_string();
                true
            }
            _ => false,
        };
        if expired {
            debug!(paylink_id = %id, "PayLink expired");
            self.record(id, event_type::PAYLINK_EXPIRED, json!({}), now);
        }
    }

    pub fn list_paylinks(
        &mut self,
        params: &PaylinkListParams,
        now: DateTime<Utc>,
    ) -> ListResponse<WirePayLink> {
        self.expire_stale(now);

        let status = params
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(normalize::paylink_status);
        let token = params
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(normalize::token_from_mint);
        let q = params
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        let mut matching: Vec<&WirePayLink> = self
            .paylinks
            .values()
            .filter(|p| status.map_or(true, |s| normalize::paylink_status(&p.status) == s))
            .filter(|p| {
                token
                    .as_ref()
                    .map_or(true, |t| &normalize::token_from_mint(&p.mint) == t)
            })
            .filter(|p| {
                q.as_ref().map_or(true, |q| {
                    p.id.to_lowercase().contains(q.as_str())
                        || p.merchant_pubkey.to_lowercase().contains(q.as_str())
                        || p
                            .invoice_ref
                            .as_ref()
                            .map_or(false, |r| r.to_lowercase().contains(q.as_str()))
                })
            })
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        paginate(matching.into_iter().cloned().collect(), params.page)
    }

    pub fn get_paylink(&mut self, id: &str, now: DateTime<Utc>) -> Result<WirePayLink, LedgerError> {
        self.expire_one(id, now);
        self.paylinks
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("PayLink {id}")))
    }

    /// Only pending PayLinks can be cancelled
    pub fn cancel_paylink(&mut self, id: &str, now: DateTime<Utc>) -> Result<WirePayLink, LedgerError> {
        self.expire_one(id, now);
        let paylink = self
            .paylinks
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(format!("PayLink {id}")))?;

        if paylink.status != PayLinkStatus::Pending.as_str() {
            return Err(LedgerError::Conflict(format!(
                "PayLink {id} is {} and cannot be cancelled",
                paylink.status
            )));
        }
        paylink.status = PayLinkStatus::Cancelled.as_str().to_string();
        let cancelled = paylink.clone();

        self.record(id, event_type::PAYLINK_CANCELLED, json!({}), now);
        info!(paylink_id = %id, "PayLink cancelled");
        Ok(cancelled)
    }

    pub fn activity(&self, id: &str) -> Result<Vec<WireActivityEvent>, LedgerError> {
        if !self.paylinks.contains_key(id) {
            return Err(LedgerError::NotFound(format!("PayLink {id}")));
        }
        Ok(self.events.get(id).cloned().unwrap_or_default())
    }

    // ==================== Settlement ====================

    /// Record a confirmed payment and issue the PayLink's receipt
    ///
    /// Only `RECEIPT_ISSUED` and `PAYLINK_MARKED_PAID` are recorded here;
    /// callers record how the payment was observed. Settling an already paid PayLink with the same signature returns
    /// the existing receipt.
    pub fn settle(
        &mut self,
        id: &str,
        signature: &str,
        slot: u64,
        now: DateTime<Utc>,
    ) -> Result<WireReceipt, LedgerError> {
        if signature.trim().is_empty() {
            return Err(LedgerError::InvalidInput("signature is required".to_string()));
        }
        self.expire_one(id, now);

        let paylink = self
            .paylinks
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("PayLink {id}")))?;

        match normalize::paylink_status(&paylink.status) {
            PayLinkStatus::Pending => {}
            PayLinkStatus::Paid if paylink.paid_signature.as_deref() == Some(signature) => {
                return self
                    .receipt_by_paylink
                    .get(id)
                    .and_then(|rid| self.receipts.get(rid))
                    .map(public_receipt)
                    .ok_or_else(|| LedgerError::Internal(format!("PayLink {id} paid without receipt")));
            }
            _ => {
                return Err(LedgerError::Conflict(format!(
                    "PayLink {id} is {} and cannot be paid",
                    paylink.status
                )));
            }
        }

        let nonce = random_nonce();
        let facts = WireFacts {
            merchant_pubkey: Some(paylink.merchant_pubkey.clone()),
            amount: Some(paylink.expected_amount),
            mint: Some(paylink.mint.clone()),
            slot: Some(slot),
            invoice_ref: paylink.invoice_ref.clone(),
            nonce: Some(nonce.clone()),
        };
        let commitment = CommitmentPayload::new(id, &facts, &nonce).commit();
        let receipt = WireReceipt {
            id: Uuid::new_v4().to_string(),
            paylink_id: id.to_string(),
            commitment: commitment.clone(),
            issued_at: now,
            facts: Some(facts),
            rail: paylink.privacy_rail.clone(),
        };

        self.receipt_by_commitment
            .insert(commitment.clone(), receipt.id.clone());
        self.receipt_by_paylink
            .insert(id.to_string(), receipt.id.clone());
        self.receipts.insert(receipt.id.clone(), receipt.clone());
        self.record(
            id,
            event_type::RECEIPT_ISSUED,
            json!({ "receiptId": receipt.id, "commitment": commitment }),
            now,
        );

        if let Some(p) = self.paylinks.get_mut(id) {
            p.status = PayLinkStatus::Paid.as_str().to_string();
            p.paid_at = Some(now);
            p.paid_signature = Some(signature.to_string());
            p.paid_slot = Some(slot);
        }
        self.record(
            id,
            event_type::PAYLINK_MARKED_PAID,
            json!({ "signature": signature, "slot": slot }),
            now,
        );

        info!(paylink_id = %id, receipt_id = %receipt.id, slot, "PayLink settled");
        Ok(public_receipt(&receipt))
    }

    /// Settle with a generated signature and slot
    ///
    /// Returns the paid signature; already paid PayLinks report the one
    /// they were paid with.
    pub fn simulate_payment(&mut self, id: &str, now: DateTime<Utc>) -> Result<String, LedgerError> {
        let existing = self.get_paylink(id, now)?;
        if let Some(signature) = existing.paid_signature {
            return Ok(signature);
        }

        if normalize::paylink_status(&existing.status) != PayLinkStatus::Pending {
            return Err(LedgerError::Conflict(format!(
                "PayLink {id} is {} and cannot be paid",
                existing.status
            )));
        }

        let signature = format!("simulated-{}", Uuid::new_v4());
        let slot = self.next_slot;
        self.next_slot += 1;
        self.record(
            id,
            event_type::PAYMENT_SIMULATED,
            json!({ "signature": signature, "slot": slot }),
            now,
        );
        self.settle(id, &signature, slot, now)?;
        Ok(signature)
    }

    // ==================== Receipts ====================

    pub fn get_receipt(&self, id: &str) -> Result<WireReceipt, LedgerError> {
        self.receipts
            .get(id)
            .map(public_receipt)
            .ok_or_else(|| LedgerError::NotFound(format!("Receipt {id}")))
    }

    pub fn paylink_receipts(&self, paylink_id: &str) -> Result<Vec<WireReceipt>, LedgerError> {
        if !self.paylinks.contains_key(paylink_id) {
            return Err(LedgerError::NotFound(format!("PayLink {paylink_id}")));
        }
        Ok(self
            .receipt_by_paylink
            .get(paylink_id)
            .and_then(|rid| self.receipts.get(rid))
            .map(public_receipt)
            .into_iter()
            .collect())
    }

    pub fn list_receipts(&self, params: &ReceiptListParams) -> ListResponse<WireReceipt> {
        let merchant = params.merchant.as_deref().filter(|m| !m.is_empty());

        let mut matching: Vec<&WireReceipt> = self
            .receipts
            .values()
            .filter(|r| {
                merchant.map_or(true, |m| {
                    r.facts
                        .as_ref()
                        .and_then(|f| f.merchant_pubkey.as_deref())
                        == Some(m)
                })
            })
            .collect();
        matching.sort_by(|a, b| b.issued_at.cmp(&a.issued_at).then_with(|| a.id.cmp(&b.id)));

        paginate(matching.into_iter().map(public_receipt).collect(), params.page)
    }

    /// Issue a proof revealing `selection`, within the PayLink's policy
    pub fn issue_proof(
        &self,
        receipt_id: &str,
        selection: &ReceiptFieldPolicy,
    ) -> Result<BackendProof, LedgerError> {
        let stored = self
            .receipts
            .get(receipt_id)
            .ok_or_else(|| LedgerError::NotFound(format!("Receipt {receipt_id}")))?;
        let paylink = self
            .paylinks
            .get(&stored.paylink_id)
            .ok_or_else(|| LedgerError::NotFound(format!("PayLink {}", stored.paylink_id)))?;
        let allowed = paylink.receipt_fields_policy.unwrap_or_default();

        let receipt = normalize::receipt(stored.clone());
        let proof = ProofBuilder::new(allowed).build(&receipt, selection)?;
        let nonce = proof
            .nonce()
            .map(str::to_string)
            .ok_or_else(|| DisclosureError::MissingNonce {
                receipt_id: receipt_id.to_string(),
            })?;

        debug!(receipt_id, fields = ?proof.revealed.fields(), "Proof issued");
        Ok(BackendProof {
            commitment: proof.commitment,
            nonce,
            revealed: normalize::wire_revealed(&proof.revealed),
        })
    }

    // ==================== Verification ====================

    /// Check a proof against the stored receipt it claims to come from
    pub fn verify(&self, proof: &BackendProof) -> VerifyReceiptResponse {
        let Some(receipt) = self
            .receipt_by_commitment
            .get(&proof.commitment)
            .and_then(|rid| self.receipts.get(rid))
        else {
            return rejected(reason::NOT_FOUND);
        };
        let facts = receipt.facts.clone().unwrap_or_default();

        if facts.nonce.as_deref() != Some(proof.nonce.as_str()) {
            return rejected(reason::NONCE_MISMATCH);
        }

        let recomputed = CommitmentPayload::new(&receipt.paylink_id, &facts, &proof.nonce).commit();
        if recomputed != receipt.commitment {
            warn!(receipt_id = %receipt.id, "Stored receipt no longer matches its commitment");
            return rejected(reason::COMMITMENT_MISMATCH);
        }

        let revealed_fields = normalize::proof(WireProof::Backend(proof.clone()))
            .revealed
            .fields();
        let allowed = self
            .paylinks
            .get(&receipt.paylink_id)
            .and_then(|p| p.receipt_fields_policy)
            .unwrap_or_default();
        if let Some(field) = ReceiptFieldPolicy::from_fields(revealed_fields.iter().copied())
            .exceeding(&allowed)
            .first()
        {
            warn!(receipt_id = %receipt.id, field = field.as_str(), "Proof reveals a field outside the PayLink policy");
            return rejected(&format!("{} {}", field.wire_name(), reason::NOT_DISCLOSABLE));
        }

        let revealed = &proof.revealed;
        let checks: [(ReceiptField, bool); 6] = [
            (
                ReceiptField::PaylinkId,
                matches_fact(&revealed.paylink_id, &Some(receipt.paylink_id.clone())),
            ),
            (
                ReceiptField::Merchant,
                matches_fact(&revealed.merchant_pubkey, &facts.merchant_pubkey),
            ),
            (ReceiptField::Amount, matches_fact(&revealed.amount, &facts.amount)),
            (ReceiptField::Token, matches_fact(&revealed.mint, &facts.mint)),
            (ReceiptField::TimeWindow, matches_fact(&revealed.slot, &facts.slot)),
            (
                ReceiptField::InvoiceRef,
                matches_fact(&revealed.invoice_ref, &facts.invoice_ref),
            ),
        ];
        if let Some((field, _)) = checks.iter().find(|(_, ok)| !ok) {
            return rejected(&format!("{} mismatch", field.wire_name()));
        }

        let mut matched_fields = vec!["commitment".to_string()];
        matched_fields.extend(revealed_fields.iter().map(|f| f.wire_name().to_string()));

        let paid_signature = self
            .paylinks
            .get(&receipt.paylink_id)
            .and_then(|p| p.paid_signature.clone());

        VerifyReceiptResponse {
            verified: true,
            reason: reason::VERIFIED.to_string(),
            details: Some(VerifyDetails {
                paylink_id: revealed.paylink_id.clone(),
                merchant_pubkey: revealed.merchant_pubkey.clone(),
                amount: revealed.amount,
                mint: revealed.mint.clone(),
                slot: revealed.slot,
                paid_signature,
                matched_fields,
            }),
        }
    }
}

/// An unrevealed value always matches
fn matches_fact<T: PartialEq>(revealed: &Option<T>, stored: &Option<T>) -> bool {
    revealed.is_none() || revealed == stored
}

fn rejected(reason: &str) -> VerifyReceiptResponse {
    VerifyReceiptResponse {
        verified: false,
        reason: reason.to_string(),
        details: None,
    }
}

/// Receipt as served to clients: facts without the nonce
fn public_receipt(receipt: &WireReceipt) -> WireReceipt {
    let mut public = receipt.clone();
    if let Some(facts) = public.facts.as_mut() {
        facts.nonce = None;
    }
    public
}

fn paginate<T>(items: Vec<T>, page: Option<u32>) -> ListResponse<T> {
    let page = page.unwrap_or(1).max(1);
    let total = items.len() as u64;
    let skip = (page as usize - 1).saturating_mul(PAGE_SIZE as usize);

    ListResponse {
        items: items.into_iter().skip(skip).take(PAGE_SIZE as usize).collect(),
        page,
        page_size: PAGE_SIZE,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{MemoPolicy, WireRevealed};
    use chrono::Duration;

    fn request(amount: u64, expires_in: Duration, now: DateTime<Utc>) -> CreatePaylinkRequest {
        CreatePaylinkRequest {
            merchant_pubkey: "Merchant111".to_string(),
            expected_amount: amount,
            mint: "SOL".to_string(),
            expires_at: now + expires_in,
            invoice_ref: Some("INV-42".to_string()),
            memo_policy: MemoPolicy::new(true),
            receipt_fields_policy: ReceiptFieldPolicy::from_fields([
                ReceiptField::Merchant,
                ReceiptField::Amount,
                ReceiptField::Token,
                ReceiptField::PaylinkId,
            ]),
        }
    }

    fn paid_ledger() -> (Ledger, String, WireReceipt) {
        let now = Utc::now();
        let mut ledger = Ledger::default();
        let created = ledger
            .create_paylink(request(1_000_000, Duration::hours(1), now), now)
            .unwrap();
        let id = created.paylink.id;
        let receipt = ledger.settle(&id, "sig_abc", 4242, now).unwrap();
        (ledger, id, receipt)
    }

    #[test]
    fn test_create_validates_input() {
        let now = Utc::now();
        let mut ledger = Ledger::default();

        let zero = ledger.create_paylink(request(0, Duration::hours(1), now), now);
        assert!(matches!(zero, Err(LedgerError::InvalidInput(_))));

        let past = ledger.create_paylink(request(5, Duration::seconds(-1), now), now);
        assert!(matches!(past, Err(LedgerError::InvalidInput(_))));

        let ok = ledger
            .create_paylink(request(5, Duration::hours(1), now), now)
            .unwrap();
        assert_eq!(ok.paylink.status, "pending");
        assert!(ok.pay_url.ends_with(&format!("/pay/{}", ok.paylink.id)));
        assert_eq!(ledger.activity(&ok.paylink.id).unwrap().len(), 2);
    }

    #[test]
    fn test_lazy_expiry_and_cancellation() {
        let now = Utc::now();
        let mut ledger = Ledger::default();
        let a = ledger
            .create_paylink(request(5, Duration::minutes(5), now), now)
            .unwrap()
            .paylink
            .id;
        let b = ledger
            .create_paylink(request(5, Duration::hours(5), now), now)
            .unwrap()
            .paylink
            .id;

        let later = now + Duration::minutes(10);
        assert_eq!(ledger.get_paylink(&a, later).unwrap().status, "expired");
        assert!(matches!(
            ledger.cancel_paylink(&a, later),
            Err(LedgerError::Conflict(_))
        ));

        assert_eq!(ledger.cancel_paylink(&b, later).unwrap().status, "cancelled");
        assert!(matches!(
            ledger.cancel_paylink(&b, later),
            Err(LedgerError::Conflict(_))
        ));
        assert!(matches!(
            ledger.settle(&b, "sig", 1, later),
            Err(LedgerError::Conflict(_))
        ));
    }

    #[test]
    fn test_settle_issues_one_receipt() {
        let (mut ledger, id, receipt) = paid_ledger();
        let now = Utc::now();

        assert!(receipt.facts.as_ref().unwrap().nonce.is_none());
        assert_eq!(ledger.get_paylink(&id, now).unwrap().status, "paid");

        let again = ledger.settle(&id, "sig_abc", 4242, now).unwrap();
        assert_eq!(again.id, receipt.id);
        assert_eq!(ledger.receipt_count(), 1);
        assert!(matches!(
            ledger.settle(&id, "sig_other", 1, now),
            Err(LedgerError::Conflict(_))
        ));

        let kinds: Vec<String> = ledger
            .activity(&id)
            .unwrap()
            .into_iter()
            .map(|e| e.r#type)
            .collect();
        assert_eq!(
            kinds,
            vec![
                event_type::PAYLINK_CREATED,
                event_type::RAIL_SELECTED,
                event_type::RECEIPT_ISSUED,
                event_type::PAYLINK_MARKED_PAID,
            ]
        );
    }

    #[test]
    fn test_simulated_payment_is_recorded_as_such() {
        let now = Utc::now();
        let mut ledger = Ledger::default();
        let id = ledger
            .create_paylink(request(5, Duration::hours(1), now), now)
            .unwrap()
            .paylink
            .id;
        let signature = ledger.simulate_payment(&id, now).unwrap();

        let events = ledger.activity(&id).unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.r#type.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                event_type::PAYLINK_CREATED,
                event_type::RAIL_SELECTED,
                event_type::PAYMENT_SIMULATED,
                event_type::RECEIPT_ISSUED,
                event_type::PAYLINK_MARKED_PAID,
            ]
        );
        assert_eq!(events[2].detail["signature"], signature.as_str());
        assert!(!kinds.contains(&event_type::WEBHOOK_RECEIVED));
        assert!(!kinds.contains(&event_type::TX_VERIFIED_MATCH));
    }

    #[test]
    fn test_cancelled_paylink_cannot_be_simulated() {
        let now = Utc::now();
        let mut ledger = Ledger::default();
        let id = ledger
            .create_paylink(request(5, Duration::hours(1), now), now)
            .unwrap()
            .paylink
            .id;
        ledger.cancel_paylink(&id, now).unwrap();

        assert!(matches!(
            ledger.simulate_payment(&id, now),
            Err(LedgerError::Conflict(_))
        ));
        assert!(!ledger
            .activity(&id)
            .unwrap()
            .iter()
            .any(|e| e.r#type == event_type::PAYMENT_SIMULATED));
    }

    #[test]
    fn test_issue_proof_enforces_policy() {
        let (ledger, _, receipt) = paid_ledger();

        let too_much = ReceiptFieldPolicy::from_fields([ReceiptField::InvoiceRef]);
        let err = ledger.issue_proof(&receipt.id, &too_much).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Disclosure(DisclosureError::PolicyViolation {
                fields: vec![ReceiptField::InvoiceRef]
            })
        );

        let selection = ReceiptFieldPolicy::from_fields([ReceiptField::Merchant, ReceiptField::Token]);
        let proof = ledger.issue_proof(&receipt.id, &selection).unwrap();
        assert_eq!(
            proof.revealed,
            WireRevealed {
                merchant_pubkey: Some("Merchant111".to_string()),
                mint: Some("SOL".to_string()),
                ..Default::default()
            }
        );
        assert_eq!(proof.commitment, receipt.commitment);
    }

    #[test]
    fn test_verify_accepts_issued_proof() {
        let (ledger, _, receipt) = paid_ledger();
        let proof = ledger
            .issue_proof(&receipt.id, &ReceiptFieldPolicy::from_fields([ReceiptField::Amount]))
            .unwrap();

        let verdict = ledger.verify(&proof);
        assert!(verdict.verified);
        let details = verdict.details.unwrap();
        assert_eq!(details.matched_fields, vec!["commitment", "amount"]);
        assert_eq!(details.paid_signature.as_deref(), Some("sig_abc"));
        assert_eq!(details.merchant_pubkey, None);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let (ledger, _, receipt) = paid_ledger();
        let proof = ledger
            .issue_proof(&receipt.id, &ReceiptFieldPolicy::from_fields([ReceiptField::Amount]))
            .unwrap();

        let mut inflated = proof.clone();
        inflated.revealed.amount = Some(9_999_999);
        assert_eq!(ledger.verify(&inflated).reason, "amount mismatch");

        let mut wrong_nonce = proof.clone();
        wrong_nonce.nonce = "00".repeat(32);
        assert_eq!(ledger.verify(&wrong_nonce).reason, reason::NONCE_MISMATCH);

        let mut unknown = proof;
        unknown.commitment = "deadbeef".to_string();
        let verdict = ledger.verify(&unknown);
        assert!(!verdict.verified);
        assert_eq!(verdict.reason, reason::NOT_FOUND);
    }

    #[test]
    fn test_verify_rejects_fields_outside_policy() {
        let (ledger, _, receipt) = paid_ledger();
        let mut proof = ledger
            .issue_proof(&receipt.id, &ReceiptFieldPolicy::from_fields([ReceiptField::Amount]))
            .unwrap();

        // the stored invoice ref is genuine, but the PayLink forbids revealing it
        proof.revealed.invoice_ref = Some("INV-42".to_string());
        let verdict = ledger.verify(&proof);
        assert!(!verdict.verified);
        assert_eq!(verdict.reason, "invoiceRef not disclosable");
        assert!(verdict.details.is_none());
    }

    #[test]
    fn test_listing_filters_and_paginates() {
        let now = Utc::now();
        let mut ledger = Ledger::default();
        for i in 0..25 {
            let mut req = request(10 + i, Duration::hours(1), now);
            req.invoice_ref = Some(format!("INV-{i:03}"));
            if i % 5 == 0 {
                req.mint = crate::types::USDC_MINT.to_string();
            }
            ledger.create_paylink(req, now).unwrap();
        }

        let first = ledger.list_paylinks(&PaylinkListParams::default(), now);
        assert_eq!(first.total, 25);
        assert_eq!(first.items.len(), 20);
        assert_eq!(first.page_size, PAGE_SIZE);

        let second = ledger.list_paylinks(
            &PaylinkListParams {
                page: Some(2),
                ..Default::default()
            },
            now,
        );
        assert_eq!(second.items.len(), 5);

        let usdc = ledger.list_paylinks(
            &PaylinkListParams {
                token: Some("USDC".to_string()),
                ..Default::default()
            },
            now,
        );
        assert_eq!(usdc.total, 5);

        let search = ledger.list_paylinks(
            &PaylinkListParams {
                q: Some("inv-007".to_string()),
                ..Default::default()
            },
            now,
        );
        assert_eq!(search.total, 1);
    }

    #[test]
    fn test_simulate_is_idempotent() {
        let now = Utc::now();
        let mut ledger = Ledger::default();
        let id = ledger
            .create_paylink(request(5, Duration::hours(1), now), now)
            .unwrap()
            .paylink
            .id;

        let first = ledger.simulate_payment(&id, now).unwrap();
        let second = ledger.simulate_payment(&id, now).unwrap();
        assert_eq!(first, second);
        assert_eq!(ledger.paylink_receipts(&id).unwrap().len(), 1);

        let receipts = ledger.list_receipts(&ReceiptListParams {
            merchant: Some("Merchant111".to_string()),
            page: None,
        });
        assert_eq!(receipts.total, 1);
    }
}
