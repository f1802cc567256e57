//! Receipt commitments
//!
//! The reference authority binds a receipt to its full fact set with
//! SHA-256 over a domain separator and the canonical JSON encoding of the
//! facts plus a random nonce. Clients treat the result as opaque.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::wire::WireFacts;

const COMMITMENT_DOMAIN: &[u8] = b"paylink:receipt-commitment:v1";

/// Everything a commitment binds, in a fixed field order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentPayload {
    pub paylink_id: String,
    pub merchant_pubkey: Option<String>,
    pub amount: Option<u64>,
    pub mint: Option<String>,
    pub slot: Option<u64>,
    pub invoice_ref: Option<String>,
    pub nonce: String,
}

impl CommitmentPayload {
    pub fn new(paylink_id: &str, facts: &WireFacts, nonce: &str) -> Self {
        Self {
            paylink_id: paylink_id.to_string(),
            merchant_pubkey: facts.merchant_pubkey.clone(),
            amount: facts.amount,
            mint: facts.mint.clone(),
            slot: facts.slot,
            invoice_ref: facts.invoice_ref.clone(),
            nonce: nonce.to_string(),
        }
    }

    /// Hex-encoded commitment
    pub fn commit(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(COMMITMENT_DOMAIN);
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        hasher.update(&encoded);
        hex::encode(hasher.finalize())
    }
}

/// 32 random bytes, hex encoded
pub fn random_nonce() -> String {
    let mut buf = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}
