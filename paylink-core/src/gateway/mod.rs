//! Payment Gateway
//!
//! The boundary to wherever PayLinks and receipts live. Both
//! implementations speak the backend's wire contract and hand back
//! normalized models.

mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::MemoryGateway;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{ClientConfig, GatewayMode};
use crate::error::GatewayError;
use crate::policy::ReceiptFieldPolicy;
use crate::types::{
    ActivityEvent, FeeEstimate, NewPayLink, Page, PayLink, PayLinkQuery, Receipt, ReceiptProof,
    ReceiptQuery,
};
use crate::wire::{BackendProof, PaylinkListParams, ReceiptListParams, VerifyReceiptResponse};

/// A freshly created PayLink and where to pay it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayLink {
    pub paylink: PayLink,
    pub pay_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn list_paylinks(&self, query: &PayLinkQuery) -> Result<Page<PayLink>, GatewayError>;

    async fn get_paylink(&self, id: &str) -> Result<PayLink, GatewayError>;

    async fn create_paylink(&self, new: NewPayLink) -> Result<CreatedPayLink, GatewayError>;

    /// Only pending PayLinks can be cancelled
    async fn cancel_paylink(&self, id: &str) -> Result<PayLink, GatewayError>;

    async fn paylink_activity(&self, id: &str) -> Result<Vec<ActivityEvent>, GatewayError>;

    async fn paylink_receipts(&self, id: &str) -> Result<Vec<Receipt>, GatewayError>;

    async fn list_receipts(&self, query: &ReceiptQuery) -> Result<Page<Receipt>, GatewayError>;

    /// Receipts come back without their nonce
    async fn get_receipt(&self, id: &str) -> Result<Receipt, GatewayError>;

    /// Have the backend issue a proof revealing `selection`
    async fn request_proof(
        &self,
        receipt_id: &str,
        selection: &ReceiptFieldPolicy,
    ) -> Result<ReceiptProof, GatewayError>;

    /// Raw verdict of the verification authority
    async fn verify_proof(&self, proof: &BackendProof) -> Result<VerifyReceiptResponse, GatewayError>;

    async fn estimate_fees(&self, account_keys: Option<Vec<String>>) -> Result<FeeEstimate, GatewayError>;

    /// Settle a PayLink with a generated payment; returns the signature
    async fn simulate_payment(&self, paylink_id: &str) -> Result<Option<String>, GatewayError>;
}

/// Build the configured gateway
pub fn from_config(config: &ClientConfig) -> Result<Arc<dyn PaymentGateway>, GatewayError> {
    match config.gateway {
        GatewayMode::Memory => {
            info!("Using in-memory payment gateway");
            Ok(Arc::new(MemoryGateway::new()))
        }
        GatewayMode::Http => {
            info!(base_url = %config.api_base_url, "Using HTTP payment gateway");
            Ok(Arc::new(HttpGateway::new(config)?))
        }
    }
}

pub(crate) fn paylink_params(query: &PayLinkQuery) -> PaylinkListParams {
    PaylinkListParams {
        status: query.status.map(|s| s.as_str().to_string()),
        token: query.token.as_ref().map(|t| t.wire_mint().to_string()),
        q: query.q.clone().filter(|q| !q.trim().is_empty()),
        page: query.page,
    }
}

pub(crate) fn receipt_params(query: &ReceiptQuery) -> ReceiptListParams {
    ReceiptListParams {
        merchant: query.merchant.clone(),
        page: query.page,
    }
}
