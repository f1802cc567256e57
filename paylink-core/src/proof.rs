//! Proof Builder
//!
//! Carves a redacted, shareable proof out of a receipt's private fact
//! bundle. Only fields that are both selected and permitted by the owning
//! PayLink's allow-list are revealed; the commitment and nonce travel
//! unchanged.

use serde_json::Value;
use tracing::debug;

use crate::error::{DisclosureError, GatewayError};
use crate::gateway::PaymentGateway;
use crate::normalize;
use crate::policy::{ReceiptField, ReceiptFieldPolicy};
use crate::types::{
    PayLink, ProofBinding, Receipt, ReceiptFacts, ReceiptProof, RevealedFields, TimeWindow,
};
use crate::wire::{WireProof, MISSING_PROOF_FIELDS};

/// Revealed map for `selection` over `facts`
///
/// A key is present iff the field is selected and the fact exists.
pub fn reveal(facts: &ReceiptFacts, selection: &ReceiptFieldPolicy) -> RevealedFields {
    fn pick<T: Clone>(selected: bool, fact: &Option<T>) -> Option<T> {
        if selected {
            fact.clone()
        } else {
            None
        }
    }

    RevealedFields {
        merchant: pick(selection.get(ReceiptField::Merchant), &facts.merchant),
        amount: pick(selection.get(ReceiptField::Amount), &facts.amount),
        token: pick(selection.get(ReceiptField::Token), &facts.token),
        time_window: pick(selection.get(ReceiptField::TimeWindow), &facts.time_window),
        invoice_ref: pick(selection.get(ReceiptField::InvoiceRef), &facts.invoice_ref),
        paylink_id: pick(selection.get(ReceiptField::PaylinkId), &facts.paylink_id),
    }
}

/// Builds proofs under a fixed allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofBuilder {
    allowed: ReceiptFieldPolicy,
}

impl ProofBuilder {
    pub fn new(allowed: ReceiptFieldPolicy) -> Self {
        Self { allowed }
    }

    /// Builder bound to a PayLink's receipt field policy
    pub fn for_paylink(paylink: &PayLink) -> Self {
        Self::new(paylink.receipt_fields)
    }

    pub fn allowed(&self) -> &ReceiptFieldPolicy {
        &self.allowed
    }

    /// Build a proof revealing `selection` from `receipt`
    ///
    /// Never mutates its inputs; the same inputs always give the same proof.
    pub fn build(
        &self,
        receipt: &Receipt,
        selection: &ReceiptFieldPolicy,
    ) -> Result<ReceiptProof, DisclosureError> {
        let exceeding = selection.exceeding(&self.allowed);
        if !exceeding.is_empty() {
            return Err(DisclosureError::PolicyViolation { fields: exceeding });
        }

        let facts = receipt
            .facts
            .as_ref()
            .ok_or_else(|| DisclosureError::MissingFacts {
                receipt_id: receipt.id.clone(),
            })?;

        let nonce = facts
            .nonce
            .as_ref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| DisclosureError::MissingNonce {
                receipt_id: receipt.id.clone(),
            })?;

        if selection.get(ReceiptField::TimeWindow)
            && matches!(facts.time_window, Some(TimeWindow::Range { .. }))
        {
            return Err(DisclosureError::UnslottedTimeWindow {
                receipt_id: receipt.id.clone(),
            });
        }

        Ok(ReceiptProof {
            commitment: receipt.commitment.clone(),
            binding: ProofBinding::Nonce(nonce.clone()),
            revealed: reveal(facts, selection),
        })
    }
}

// ==================== Ingestion ====================

impl ReceiptProof {
    /// Parse a proof document in either recognized shape
    pub fn from_json(input: &str) -> Result<Self, DisclosureError> {
        let value: Value = serde_json::from_str(input)
            .map_err(|e| DisclosureError::MalformedProof(format!("Invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DisclosureError> {
        WireProof::classify(value).map(normalize::proof)
    }

    /// Reject proofs lacking a commitment and its binding value
    pub fn validate(&self) -> Result<(), DisclosureError> {
        let bound = match &self.binding {
            ProofBinding::Nonce(nonce) => !nonce.trim().is_empty(),
            ProofBinding::Signature { signature, .. } => !signature.trim().is_empty(),
        };
        if self.commitment.trim().is_empty() || !bound {
            return Err(DisclosureError::MalformedProof(MISSING_PROOF_FIELDS.to_string()));
        }
        Ok(())
    }

    /// Shareable JSON in the proof's own wire shape
    pub fn to_json(&self) -> String {
        let value = normalize::wire_proof(self).to_value();
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }
}

/// Produce a proof for `receipt`, locally when its facts allow it
///
/// Receipts fetched without their private facts or nonce are sent to the
/// gateway for issuance instead. Policy violations are never forwarded.
pub async fn disclose<G>(
    gateway: &G,
    paylink: &PayLink,
    receipt: &Receipt,
    selection: &ReceiptFieldPolicy,
) -> Result<ReceiptProof, GatewayError>
where
    G: PaymentGateway + ?Sized,
{
    if receipt.paylink_id != paylink.id {
        return Err(DisclosureError::ReceiptMismatch {
            receipt_id: receipt.id.clone(),
            paylink_id: paylink.id.clone(),
        }
        .into());
    }

    match ProofBuilder::for_paylink(paylink).build(receipt, selection) {
        Ok(proof) => Ok(proof),
        Err(DisclosureError::MissingFacts { .. }) | Err(DisclosureError::MissingNonce { .. }) => {
            debug!(receipt_id = %receipt.id, "No local facts, requesting proof from gateway");
            gateway.request_proof(&receipt.id, selection).await
        }
        Err(e) => Err(e.into()),
    }
}
