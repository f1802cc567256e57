// Library entry point for paylink-server
// Exposes the router and state for tests and embedding

pub mod config;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use config::Config;
pub use routes::{cors_layer, create_routes};
pub use state::AppState;
