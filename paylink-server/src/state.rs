//! Application State
//!
//! Shared state for the PayLink server, accessible from all route handlers.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use paylink_core::Ledger;

use crate::config::Config;
use crate::services::PriorityFeeService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PayLinks, receipts and their activity
    ledger: RwLock<Ledger>,
    /// Priority fee estimator
    fees: PriorityFeeService,
    /// Loaded configuration
    config: Config,
    /// Server start time
    start_time: Instant,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Self {
        let ledger = Ledger::new(config.base_pay_url.clone(), config.privacy_rail.clone());
        let fees = PriorityFeeService::from_config(&config);

        Self {
            inner: Arc::new(AppStateInner {
                ledger: RwLock::new(ledger),
                fees,
                config,
                start_time: Instant::now(),
            }),
        }
    }

    /// Get the ledger
    pub fn ledger(&self) -> &RwLock<Ledger> {
        &self.inner.ledger
    }

    /// Get the priority fee service
    pub fn fees(&self) -> &PriorityFeeService {
        &self.inner.fees
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get server uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}
