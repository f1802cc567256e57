//! Priority fee estimates
//!
//! Asks the Helius RPC for `getPriorityFeeEstimate` when an API key is
//! configured and falls back to static levels otherwise.

use std::time::Duration;

use paylink_core::normalize::{DEFAULT_FEE_LEVELS, DEFAULT_FEE_UNIT};
use paylink_core::wire::{PriorityFeeRequest, PriorityFeeResponse};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::types::ApiError;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Priority fee estimator
#[derive(Debug, Clone)]
pub struct PriorityFeeService {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl PriorityFeeService {
    pub fn new(endpoint: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.helius_rpc_url())
    }

    /// Whether estimates come from the RPC provider
    pub fn is_live(&self) -> bool {
        self.endpoint.is_some()
    }

    pub async fn estimate(&self, request: PriorityFeeRequest) -> Result<PriorityFeeResponse, ApiError> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            debug!("No RPC key configured, using static fee levels");
            let (levels, recommended) = parse_priority_fee(&Value::Null);
            return Ok(response(levels, recommended));
        };

        let body = rpc_body(&request);
        let value: Value = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| upstream(&e))?
            .json()
            .await
            .map_err(|e| upstream(&e))?;

        if let Some(err) = value.get("error") {
            warn!(error = %err, "Priority fee RPC returned an error");
            return Err(ApiError::Upstream(err.to_string()));
        }

        let (levels, recommended) = parse_priority_fee(&value);
        Ok(response(levels, recommended))
    }
}

fn upstream(err: &reqwest::Error) -> ApiError {
    warn!(error = %err, "Priority fee request failed");
    ApiError::Upstream(err.to_string())
}

fn response(levels: Value, recommended: u64) -> PriorityFeeResponse {
    PriorityFeeResponse {
        levels,
        unit: DEFAULT_FEE_UNIT.to_string(),
        recommended,
    }
}

fn rpc_body(request: &PriorityFeeRequest) -> Value {
    let mut params = Map::new();
    if let Some(tx) = request
        .transaction
        .as_ref()
        .and_then(|t| t.serialized_tx_base64.clone())
    {
        params.insert("transaction".to_string(), json!(tx));
    }
    if let Some(keys) = request
        .accounts
        .as_ref()
        .and_then(|a| a.account_keys.clone())
    {
        params.insert("accountKeys".to_string(), json!(keys));
    }

    json!({
        "jsonrpc": "2.0",
        "id": "priority-fee",
        "method": "getPriorityFeeEstimate",
        "params": [params],
    })
}

/// Levels object and recommended (medium) fee from an RPC reply
pub fn parse_priority_fee(value: &Value) -> (Value, u64) {
    let (low, medium, high) = DEFAULT_FEE_LEVELS;
    let estimate = value
        .get("result")
        .and_then(|r| r.get("priorityFeeEstimate"))
        .filter(|v| v.is_object());

    let levels = estimate
        .cloned()
        .unwrap_or_else(|| json!({ "low": low, "medium": medium, "high": high }));
    let recommended = estimate
        .and_then(|v| v.get("medium"))
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0).round() as u64)))
        .unwrap_or(medium);

    (levels, recommended)
}
