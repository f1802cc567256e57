//! HTTP Routes for the PayLink server
//!
//! REST endpoints for PayLinks, receipts, proofs and fee estimates.

pub mod fees;
pub mod health;
pub mod paylinks;
pub mod receipts;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::config::Config;
use crate::state::AppState;

/// Create all routes
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .nest("/paylinks", paylinks::routes())
        .nest("/receipts", receipts::routes())
        .nest("/fees", fees::routes())
        .with_state(state)
}

/// CORS for the configured origins; `*` allows any
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if config.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(allow_origin)
}
