//! # PayLink Server
//!
//! Backend for PayLink payment requests and selective-disclosure receipts.
//!
//! ## Usage
//!
//! ```bash
//! # Local development
//! cargo run -p paylink-server
//!
//! # Live priority fee estimates
//! HELIUS_API_KEY=xxx HELIUS_CLUSTER=mainnet cargo run -p paylink-server
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /health` - Health check
//! - `POST /paylinks`, `GET /paylinks` - Create and list PayLinks
//! - `GET /paylinks/:id` - Fetch a PayLink
//! - `POST /paylinks/:id/cancel` - Cancel a pending PayLink
//! - `GET /paylinks/:id/activity`, `GET /paylinks/:id/receipts`
//! - `POST /paylinks/:id/simulate` - Settle with a generated signature
//! - `GET /receipts`, `GET /receipts/:id`
//! - `POST /receipts/:id/proof` - Issue a selective-disclosure proof
//! - `POST /receipts/verify` - Verify a proof
//! - `POST /fees/priority-estimate` - Priority fee levels

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paylink_server::{cors_layer, create_routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        privacy_rail = %config.privacy_rail,
        base_pay_url = %config.base_pay_url,
        "Starting PayLink Server"
    );

    if config.helius_api_key.is_none() {
        info!("HELIUS_API_KEY not set - priority fees use static levels");
    }

    let addr = config.socket_addr()?;
    let cors = cors_layer(&config);

    // Create application state
    let state = AppState::new(config);

    // Build router
    let app = create_routes(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Initialize logging based on configuration
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(true),
            )
            .init();
    }
}
