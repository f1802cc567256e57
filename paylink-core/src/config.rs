//! Client Configuration
//!
//! Selects the gateway and verification strategy once at startup. Values
//! come from `PAYLINK_*` environment variables (and `.env`), layered over
//! defaults with the `config` crate.

use config::{Config, Environment, Source};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Which [`PaymentGateway`](crate::gateway::PaymentGateway) to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    /// In-process ledger, no network
    Memory,
    /// REST backend at `api_base_url`
    Http,
}

/// Which [`ProofVerifier`](crate::verifier::ProofVerifier) to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Ask the verification authority
    Delegated,
    /// Structural check only, demo use
    Local,
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_gateway")]
    pub gateway: GatewayMode,

    /// REST backend base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_verification")]
    pub verification: VerificationMode,

    /// Per-request timeout for the HTTP gateway
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra attempts for idempotent reads
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    /// Base delay between read attempts, grows linearly
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Merchant settings document
    #[serde(default = "default_settings_path")]
    pub settings_path: PathBuf,
}

fn default_gateway() -> GatewayMode {
    GatewayMode::Memory
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_verification() -> VerificationMode {
    VerificationMode::Delegated
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_read_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_settings_path() -> PathBuf {
    PathBuf::from("paylink-merchant.json")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway: default_gateway(),
            api_base_url: default_api_base_url(),
            verification: default_verification(),
            request_timeout_secs: default_request_timeout_secs(),
            read_retries: default_read_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            settings_path: default_settings_path(),
        }
    }
}

impl ClientConfig {
    /// Load from `PAYLINK_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        Self::from_source(Environment::with_prefix("PAYLINK").try_parsing(true))
    }

    /// Load from any `config` source layered over the defaults
    pub fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let config: Self = Config::builder().add_source(source).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.gateway == GatewayMode::Http
            && !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Delay before read attempt `attempt` (1-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}
