//! Server Configuration
//!
//! Handles loading configuration from environment variables (and `.env`).

use config::{Environment, Source};
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Frontend origin that serves `/pay/:id`
    #[serde(default = "default_base_pay_url")]
    pub base_pay_url: String,

    /// CORS allowed origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Privacy rail recorded on new PayLinks
    #[serde(default = "default_privacy_rail")]
    pub privacy_rail: String,

    /// Helius API key; static fee levels without one
    #[serde(default)]
    pub helius_api_key: Option<String>,

    /// `devnet` or `mainnet`
    #[serde(default = "default_helius_cluster")]
    pub helius_cluster: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_pay_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_privacy_rail() -> String {
    "transparent".to_string()
}

fn default_helius_cluster() -> String {
    "devnet".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_pay_url: default_base_pay_url(),
            cors_origins: default_cors_origins(),
            privacy_rail: default_privacy_rail(),
            helius_api_key: None,
            helius_cluster: default_helius_cluster(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        Self::from_source(
            Environment::default()
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("cors_origins"),
        )
    }

    pub fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let mut config: Self = config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;

        config.cors_origins = config
            .cors_origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        config.helius_api_key = config.helius_api_key.filter(|k| !k.trim().is_empty());
        Ok(config)
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// JSON-RPC endpoint for priority fee estimates, if a key is configured
    pub fn helius_rpc_url(&self) -> Option<String> {
        let key = self.helius_api_key.as_deref()?;
        let host = match self.helius_cluster.as_str() {
            "mainnet" | "mainnet-beta" => "https://mainnet.helius-rpc.com",
            _ => "https://devnet.helius-rpc.com",
        };
        Some(format!("{host}/?api-key={key}"))
    }
}
