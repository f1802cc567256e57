//! In-memory gateway over a local [`Ledger`]

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::instrument;

use super::{paylink_params, receipt_params, CreatedPayLink, PaymentGateway};
use crate::error::GatewayError;
use crate::ledger::Ledger;
use crate::normalize;
use crate::policy::ReceiptFieldPolicy;
use crate::types::{
    ActivityEvent, FeeEstimate, NewPayLink, Page, PayLink, PayLinkQuery, Receipt, ReceiptProof,
    ReceiptQuery,
};
use crate::wire::{
    BackendProof, PriorityFeeResponse, VerifyReceiptResponse, WireProof,
};

/// Gateway backed by an in-process ledger
///
/// Same semantics as the REST backend, without the network.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    ledger: RwLock<Ledger>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: RwLock::new(ledger),
        }
    }

    /// Record a confirmed payment for `paylink_id`
    pub async fn settle(&self, paylink_id: &str, signature: &str, slot: u64) -> Result<Receipt, GatewayError> {
        let receipt = self
            .ledger
            .write()
            .await
            .settle(paylink_id, signature, slot, Utc::now())?;
        Ok(normalize::receipt(receipt))
    }
}

#[async_trait]
impl PaymentGateway for MemoryGateway {
    async fn list_paylinks(&self, query: &PayLinkQuery) -> Result<Page<PayLink>, GatewayError> {
        let wire = self
            .ledger
            .write()
            .await
            .list_paylinks(&paylink_params(query), Utc::now());
        Ok(normalize::page(wire, normalize::paylink))
    }

    async fn get_paylink(&self, id: &str) -> Result<PayLink, GatewayError> {
        let wire = self.ledger.write().await.get_paylink(id, Utc::now())?;
        Ok(normalize::paylink(wire))
    }

    #[instrument(skip(self, new), fields(merchant = %new.merchant_pubkey))]
    async fn create_paylink(&self, new: NewPayLink) -> Result<CreatedPayLink, GatewayError> {
        let created = self
            .ledger
            .write()
            .await
            .create_paylink(normalize::create_request(new), Utc::now())?;
        Ok(CreatedPayLink {
            paylink: normalize::paylink(created.paylink),
            pay_url: created.pay_url,
        })
    }

    async fn cancel_paylink(&self, id: &str) -> Result<PayLink, GatewayError> {
        let wire = self.ledger.write().await.cancel_paylink(id, Utc::now())?;
        Ok(normalize::paylink(wire))
    }

    async fn paylink_activity(&self, id: &str) -> Result<Vec<ActivityEvent>, GatewayError> {
        let events = self.ledger.read().await.activity(id)?;
        Ok(events
            .into_iter()
            .enumerate()
            .map(|(i, e)| normalize::activity(id, i, e))
            .collect())
    }

    async fn paylink_receipts(&self, id: &str) -> Result<Vec<Receipt>, GatewayError> {
        let receipts = self.ledger.read().await.paylink_receipts(id)?;
        Ok(receipts.into_iter().map(normalize::receipt).collect())
    }

    async fn list_receipts(&self, query: &ReceiptQuery) -> Result<Page<Receipt>, GatewayError> {
        let wire = self.ledger.read().await.list_receipts(&receipt_params(query));
        Ok(normalize::page(wire, normalize::receipt))
    }

    async fn get_receipt(&self, id: &str) -> Result<Receipt, GatewayError> {
        let wire = self.ledger.read().await.get_receipt(id)?;
        Ok(normalize::receipt(wire))
    }

    #[instrument(skip(self, selection))]
    async fn request_proof(
        &self,
        receipt_id: &str,
        selection: &ReceiptFieldPolicy,
    ) -> Result<ReceiptProof, GatewayError> {
        let proof = self.ledger.read().await.issue_proof(receipt_id, selection)?;
        Ok(normalize::proof(WireProof::Backend(proof)))
    }

    async fn verify_proof(&self, proof: &BackendProof) -> Result<VerifyReceiptResponse, GatewayError> {
        Ok(self.ledger.read().await.verify(proof))
    }

    async fn estimate_fees(&self, _account_keys: Option<Vec<String>>) -> Result<FeeEstimate, GatewayError> {
        let (low, medium, high) = normalize::DEFAULT_FEE_LEVELS;
        Ok(normalize::fee_estimate(PriorityFeeResponse {
            levels: json!({ "low": low, "medium": medium, "high": high }),
            unit: normalize::DEFAULT_FEE_UNIT.to_string(),
            recommended: medium,
        }))
    }

    async fn simulate_payment(&self, paylink_id: &str) -> Result<Option<String>, GatewayError> {
        let signature = self
            .ledger
            .write()
            .await
            .simulate_payment(paylink_id, Utc::now())?;
        Ok(Some(signature))
    }
}
