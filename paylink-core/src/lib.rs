//! # PayLink Core
//!
//! Selective-disclosure receipts for PayLink payments.
//!
//! A merchant creates a PayLink with an allow-list of receipt fields. Once
//! paid, a receipt carries the full fact set privately behind an opaque
//! commitment. The payer carves a proof revealing only chosen fields and a
//! third party verifies it, locally (structural, demo only) or through
//! the verification authority.
//!
//! ## Modules
//!
//! - [`policy`]: the six disclosable fields and the subset check
//! - [`proof`]: proof construction and ingestion
//! - [`verifier`]: structural and delegated verification
//! - [`normalize`]: backend shapes onto the internal model
//! - [`gateway`]: in-memory and HTTP payment gateways
//! - [`ledger`]: in-process backend semantics and verification authority
//! - [`merchant`]: merchant settings and their store

pub mod commitment;
pub mod config;
pub mod error;
pub mod fees;
pub mod gateway;
pub mod ledger;
pub mod merchant;
pub mod normalize;
pub mod policy;
pub mod proof;
pub mod session;
pub mod types;
pub mod verifier;
pub mod wire;

// Re-export commonly used items
pub use config::{ClientConfig, GatewayMode, VerificationMode};
pub use error::{DisclosureError, GatewayError, LedgerError};
pub use gateway::{CreatedPayLink, HttpGateway, MemoryGateway, PaymentGateway};
pub use ledger::Ledger;
pub use policy::{ReceiptField, ReceiptFieldPolicy};
pub use proof::{disclose, ProofBuilder};
pub use types::{
    PayLink, PayLinkStatus, Receipt, ReceiptFacts, ReceiptProof, RevealedFields, Token,
    VerifyResponse,
};
pub use verifier::{DelegatedVerifier, ProofVerifier, StructuralVerifier};
