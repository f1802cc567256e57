//! Proof Verifier
//!
//! Two strategies behind one interface: a structural check that only
//! looks at the proof's shape (never authoritative), and delegation to a
//! verification authority reached through a [`PaymentGateway`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::config::{ClientConfig, VerificationMode};
use crate::error::DisclosureError;
use crate::gateway::PaymentGateway;
use crate::normalize;
use crate::policy::ReceiptField;
use crate::types::{PayLinkStatus, ProofBinding, ReceiptProof, VerifyResponse};
use crate::wire::BackendProof;

/// Reason given when a signature-bound proof reaches the authority
pub const LEGACY_PROOF_UNSUPPORTED: &str =
    "legacy signature-bound proofs cannot be checked by the verification authority";

/// Checks a normalized receipt proof
#[async_trait]
pub trait ProofVerifier: Send + Sync {
    async fn verify(&self, proof: &ReceiptProof) -> VerifyResponse;

    /// Whether a `valid` answer means anything beyond well-formedness
    fn is_authoritative(&self) -> bool;
}

/// Parse a proof document and verify it
///
/// Malformed input is rejected before any verifier runs.
pub async fn verify_json(
    verifier: &dyn ProofVerifier,
    input: &str,
) -> Result<VerifyResponse, DisclosureError> {
    let proof = ReceiptProof::from_json(input)?;
    Ok(verifier.verify(&proof).await)
}

/// Pick the configured strategy
pub fn from_config(config: &ClientConfig, gateway: Arc<dyn PaymentGateway>) -> Arc<dyn ProofVerifier> {
    match config.verification {
        VerificationMode::Delegated => Arc::new(DelegatedVerifier::new(gateway)),
        VerificationMode::Local => Arc::new(StructuralVerifier::new()),
    }
}

fn malformed(err: DisclosureError) -> VerifyResponse {
    debug!(error = %err, "Rejecting malformed proof");
    match err {
        DisclosureError::MalformedProof(reason) => VerifyResponse::rejected(reason),
        other => VerifyResponse::rejected(other.to_string()),
    }
}

// ==================== Structural ====================

/// Demo-only verifier
///
/// Performs no cryptographic validation. Any well-formed proof is reported
/// valid with its revealed field names.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralVerifier {
    _private: (),
}

impl StructuralVerifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProofVerifier for StructuralVerifier {
    async fn verify(&self, proof: &ReceiptProof) -> VerifyResponse {
        if let Err(e) = proof.validate() {
            return malformed(e);
        }

        warn!(
            commitment = %proof.commitment,
            "Structural verification only: the proof was not checked against any authority"
        );

        let signature = match &proof.binding {
            ProofBinding::Signature { signature, .. } => Some(signature.clone()),
            ProofBinding::Nonce(_) => None,
        };

        VerifyResponse {
            valid: true,
            verified_fields: proof
                .revealed
                .fields()
                .into_iter()
                .map(|f| f.as_str().to_string())
                .collect(),
            signature,
            paylink_status: Some(PayLinkStatus::Paid),
            mismatches: Vec::new(),
        }
    }

    fn is_authoritative(&self) -> bool {
        false
    }
}

// ==================== Delegated ====================

/// Forwards proofs to the verification authority behind a gateway
pub struct DelegatedVerifier<G: ?Sized> {
    gateway: Arc<G>,
}

impl<G: PaymentGateway + ?Sized> DelegatedVerifier<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }
}

/// Authority-named matched fields, restricted to what the proof revealed
fn revealed_matches(proof: &ReceiptProof, matched: &[String]) -> Vec<String> {
    let mut fields: Vec<ReceiptField> = matched
        .iter()
        .filter_map(|name| ReceiptField::from_name(name))
        .filter(|f| proof.revealed.contains(*f))
        .collect();
    fields.sort();
    fields.dedup();
    fields.into_iter().map(|f| f.as_str().to_string()).collect()
}

#[async_trait]
impl<G: PaymentGateway + ?Sized> ProofVerifier for DelegatedVerifier<G> {
    #[instrument(skip(self, proof), fields(commitment = %proof.commitment))]
    async fn verify(&self, proof: &ReceiptProof) -> VerifyResponse {
        if let Err(e) = proof.validate() {
            return malformed(e);
        }

        let nonce = match &proof.binding {
            ProofBinding::Nonce(nonce) => nonce.clone(),
            ProofBinding::Signature { .. } => {
                debug!("Refusing to forward a signature-bound proof");
                return VerifyResponse::rejected(LEGACY_PROOF_UNSUPPORTED);
            }
        };

        let request = BackendProof {
            commitment: proof.commitment.clone(),
            nonce,
            revealed: normalize::wire_revealed(&proof.revealed),
        };

        match self.gateway.verify_proof(&request).await {
            Ok(verdict) => {
                let matched = verdict
                    .details
                    .as_ref()
                    .map(|d| d.matched_fields.clone())
                    .unwrap_or_default();
                let mut response = normalize::verify_response(verdict);
                if response.valid {
                    response.verified_fields = revealed_matches(proof, &matched);
                }
                response
            }
            Err(e) => {
                warn!(error = %e, "Verification request failed");
                VerifyResponse::rejected(e.to_string())
            }
        }
    }

    fn is_authoritative(&self) -> bool {
        true
    }
}
