//! Services for the PayLink server
//!
//! Integrations the route handlers call out to.

pub mod priority_fee;

pub use priority_fee::PriorityFeeService;
