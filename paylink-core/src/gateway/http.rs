//! REST gateway
//!
//! Talks to the PayLink backend over HTTP. Every request carries a
//! timeout; idempotent reads are retried with linear backoff, writes and
//! verification are sent exactly once.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::{paylink_params, receipt_params, CreatedPayLink, PaymentGateway};
use crate::config::ClientConfig;
use crate::error::{DisclosureError, GatewayError};
use crate::normalize;
use crate::policy::{ReceiptField, ReceiptFieldPolicy};
use crate::types::{
    ActivityEvent, FeeEstimate, NewPayLink, Page, PayLink, PayLinkQuery, Receipt, ReceiptProof,
    ReceiptQuery,
};
use crate::wire::{
    AccountsInfo, ActivityEventResponse, BackendProof, CreatePaylinkResponse, ErrorCode,
    ErrorResponse, ItemsResponse, ListResponse, PaylinkResponse, PriorityFeeRequest,
    PriorityFeeResponse, ProofRequest, ProofResponse, ReceiptResponse, SimulateResponse,
    VerifyReceiptRequest, VerifyReceiptResponse, WirePayLink, WireProof, WireReceipt,
};

#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
    config: ClientConfig,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let base = Url::parse(config.api_base_url.trim()).map_err(|e| {
            GatewayError::InvalidInput(format!("api_base_url {:?}: {e}", config.api_base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidInput(format!(
                "api_base_url {:?} cannot carry a path",
                config.api_base_url
            )));
        }

        Ok(Self {
            client,
            base,
            config: config.clone(),
        })
    }

    /// Gateway for `base_url` with the default timeouts and retries
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::new(&ClientConfig {
            api_base_url: base_url.into(),
            ..ClientConfig::default()
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    /// Endpoint under the base URL; each segment is percent-encoded
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send once and decode a success body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let response = request.send().await?;
        decode(response).await
    }

    /// Idempotent request, retried on transient failures
    async fn read<T, F>(&self, build: F) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0u32;
        loop {
            match self.send(build()).await {
                Err(e) if e.is_transient() && attempt < self.config.read_retries => {
                    attempt += 1;
                    let delay = self.config.retry_delay(attempt);
                    warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "Read failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), body = %body, "Backend returned an error");
    Err(error_from_body(status, &body))
}

fn error_from_body(status: StatusCode, body: &str) -> GatewayError {
    let Ok(error) = serde_json::from_str::<ErrorResponse>(body) else {
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            body.trim().to_string()
        };
        return GatewayError::Status {
            status: status.as_u16(),
            message,
        };
    };

    match error.code {
        ErrorCode::NotFound => GatewayError::NotFound(error.message),
        ErrorCode::InvalidInput => GatewayError::InvalidInput(error.message),
        ErrorCode::Conflict => GatewayError::Conflict(error.message),
        ErrorCode::PolicyViolation => {
            let fields = error
                .details
                .as_ref()
                .and_then(|d| d.get("fields"))
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(ReceiptField::from_name)
                        .collect()
                })
                .unwrap_or_default();
            GatewayError::Disclosure(DisclosureError::PolicyViolation { fields })
        }
        ErrorCode::UpstreamFailed | ErrorCode::InternalError => GatewayError::Status {
            status: status.as_u16(),
            message: error.message,
        },
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn list_paylinks(&self, query: &PayLinkQuery) -> Result<Page<PayLink>, GatewayError> {
        let params = paylink_params(query);
        let url = self.url(&["paylinks"]);
        let wire: ListResponse<WirePayLink> =
            self.read(|| self.client.get(url.clone()).query(&params)).await?;
        Ok(normalize::page(wire, normalize::paylink))
    }

    async fn get_paylink(&self, id: &str) -> Result<PayLink, GatewayError> {
        let url = self.url(&["paylinks", id]);
        let wire: PaylinkResponse = self.read(|| self.client.get(url.clone())).await?;
        Ok(normalize::paylink(wire.paylink))
    }

    #[instrument(skip(self, new), fields(merchant = %new.merchant_pubkey))]
    async fn create_paylink(&self, new: NewPayLink) -> Result<CreatedPayLink, GatewayError> {
        let body = normalize::create_request(new);
        let created: CreatePaylinkResponse = self
            .send(self.client.post(self.url(&["paylinks"])).json(&body))
            .await?;
        Ok(CreatedPayLink {
            paylink: normalize::paylink(created.paylink),
            pay_url: created.pay_url,
        })
    }

    #[instrument(skip(self))]
    async fn cancel_paylink(&self, id: &str) -> Result<PayLink, GatewayError> {
        let wire: PaylinkResponse = self
            .send(self.client.post(self.url(&["paylinks", id, "cancel"])))
            .await?;
        Ok(normalize::paylink(wire.paylink))
    }

    async fn paylink_activity(&self, id: &str) -> Result<Vec<ActivityEvent>, GatewayError> {
        let url = self.url(&["paylinks", id, "activity"]);
        let wire: ActivityEventResponse = self.read(|| self.client.get(url.clone())).await?;
        Ok(wire
            .events
            .into_iter()
            .enumerate()
            .map(|(i, e)| normalize::activity(id, i, e))
            .collect())
    }

    async fn paylink_receipts(&self, id: &str) -> Result<Vec<Receipt>, GatewayError> {
        let url = self.url(&["paylinks", id, "receipts"]);
        let wire: ItemsResponse<WireReceipt> = self.read(|| self.client.get(url.clone())).await?;
        Ok(wire.items.into_iter().map(normalize::receipt).collect())
    }

    async fn list_receipts(&self, query: &ReceiptQuery) -> Result<Page<Receipt>, GatewayError> {
        let params = receipt_params(query);
        let url = self.url(&["receipts"]);
        let wire: ListResponse<WireReceipt> =
            self.read(|| self.client.get(url.clone()).query(&params)).await?;
        Ok(normalize::page(wire, normalize::receipt))
    }

    async fn get_receipt(&self, id: &str) -> Result<Receipt, GatewayError> {
        let url = self.url(&["receipts", id]);
        let wire: ReceiptResponse = self.read(|| self.client.get(url.clone())).await?;
        Ok(normalize::receipt(wire.receipt))
    }

    #[instrument(skip(self, selection))]
    async fn request_proof(
        &self,
        receipt_id: &str,
        selection: &ReceiptFieldPolicy,
    ) -> Result<ReceiptProof, GatewayError> {
        let body = ProofRequest {
            disclosed: *selection,
        };
        let wire: ProofResponse = self
            .send(
                self.client
                    .post(self.url(&["receipts", receipt_id, "proof"]))
                    .json(&body),
            )
            .await?;
        Ok(normalize::proof(WireProof::Backend(wire.proof)))
    }

    #[instrument(skip(self, proof), fields(commitment = %proof.commitment))]
    async fn verify_proof(&self, proof: &BackendProof) -> Result<VerifyReceiptResponse, GatewayError> {
        let body = VerifyReceiptRequest {
            proof: proof.clone(),
        };
        self.send(self.client.post(self.url(&["receipts", "verify"])).json(&body))
            .await
    }

    async fn estimate_fees(&self, account_keys: Option<Vec<String>>) -> Result<FeeEstimate, GatewayError> {
        let body = PriorityFeeRequest {
            accounts: account_keys.map(|keys| AccountsInfo {
                account_keys: Some(keys),
            }),
            ..Default::default()
        };
        let url = self.url(&["fees", "priority-estimate"]);
        let wire: PriorityFeeResponse =
            self.read(|| self.client.post(url.clone()).json(&body)).await?;
        Ok(normalize::fee_estimate(wire))
    }

    #[instrument(skip(self))]
    async fn simulate_payment(&self, paylink_id: &str) -> Result<Option<String>, GatewayError> {
        let wire: SimulateResponse = self
            .send(
                self.client
                    .post(self.url(&["paylinks", paylink_id, "simulate"])),
            )
            .await?;
        Ok(wire.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_trimmed() {
        let gateway = HttpGateway::with_base_url("http://localhost:8080/").unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:8080");
        assert_eq!(
            gateway.url(&["paylinks"]).as_str(),
            "http://localhost:8080/paylinks"
        );
    }

    #[test]
    fn test_path_segments_are_encoded() {
        let gateway = HttpGateway::with_base_url("http://localhost:8080/api/").unwrap();
        assert_eq!(
            gateway.url(&["receipts", "a b/c?x", "proof"]).as_str(),
            "http://localhost:8080/api/receipts/a%20b%2Fc%3Fx/proof"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpGateway::with_base_url("not a url"),
            Err(GatewayError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_error_body_mapping() {
        let body = r#"{"code":"POLICY_VIOLATION","message":"nope","details":{"fields":["invoiceRef","slot"]}}"#;
        match error_from_body(StatusCode::UNPROCESSABLE_ENTITY, body) {
            GatewayError::Disclosure(DisclosureError::PolicyViolation { fields }) => {
                assert_eq!(fields, vec![ReceiptField::InvoiceRef, ReceiptField::TimeWindow]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let body = r#"{"code":"CONFLICT","message":"PayLink is paid"}"#;
        assert!(matches!(
            error_from_body(StatusCode::CONFLICT, body),
            GatewayError::Conflict(m) if m == "PayLink is paid"
        ));
    }

    #[test]
    fn test_unstructured_errors_keep_status() {
        let err = error_from_body(StatusCode::BAD_GATEWAY, "");
        assert!(err.is_transient());
        assert!(matches!(
            err,
            GatewayError::Status { status: 502, ref message } if message == "Bad Gateway"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let gateway = HttpGateway::new(&ClientConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            read_retries: 0,
            request_timeout_secs: 2,
            ..ClientConfig::default()
        })
        .unwrap();

        let err = gateway.get_paylink("pl_1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
    }

    #[tokio::test]
    async fn test_reads_back_off_by_configured_delay() {
        let gateway = HttpGateway::new(&ClientConfig {
            api_base_url: "http://127.0.0.1:9".to_string(),
            read_retries: 2,
            retry_backoff_ms: 100,
            request_timeout_secs: 2,
            ..ClientConfig::default()
        })
        .unwrap();

        let started = std::time::Instant::now();
        let err = gateway.get_paylink("pl_1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(started.elapsed() >= std::time::Duration::from_millis(300));
    }
}
