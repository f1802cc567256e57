//! Receipt Field Policy
//!
//! The fixed set of six payment facts a receipt can disclose. The same
//! record is used as a PayLink allow-list (what may ever be disclosed) and
//! as a per-proof selection (what is disclosed this time).

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six disclosable payment facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReceiptField {
    Merchant,
    Amount,
    Token,
    TimeWindow,
    InvoiceRef,
    PaylinkId,
}

impl ReceiptField {
    /// Canonical order used for listings and serialization
    pub const ALL: [ReceiptField; 6] = [
        ReceiptField::Merchant,
        ReceiptField::Amount,
        ReceiptField::Token,
        ReceiptField::TimeWindow,
        ReceiptField::InvoiceRef,
        ReceiptField::PaylinkId,
    ];

    /// Policy key name
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptField::Merchant => "merchant",
            ReceiptField::Amount => "amount",
            ReceiptField::Token => "token",
            ReceiptField::TimeWindow => "timeWindow",
            ReceiptField::InvoiceRef => "invoiceRef",
            ReceiptField::PaylinkId => "paylinkId",
        }
    }

    /// Key the backend uses for this fact in a revealed map
    pub fn wire_name(&self) -> &'static str {
        match self {
            ReceiptField::Merchant => "merchantPubkey",
            ReceiptField::Amount => "amount",
            ReceiptField::Token => "mint",
            ReceiptField::TimeWindow => "slot",
            ReceiptField::InvoiceRef => "invoiceRef",
            ReceiptField::PaylinkId => "paylinkId",
        }
    }

    /// Resolve either a policy key or a backend key
    pub fn from_name(name: &str) -> Option<Self> {
        ReceiptField::ALL
            .into_iter()
            .find(|f| f.as_str() == name || f.wire_name() == name)
    }
}

impl fmt::Display for ReceiptField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A total map from the six receipt fields to booleans
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ReceiptFieldPolicy {
    pub merchant: bool,
    pub amount: bool,
    pub token: bool,
    pub time_window: bool,
    pub invoice_ref: bool,
    pub paylink_id: bool,
}

impl ReceiptFieldPolicy {
    /// Nothing disclosed
    pub fn none() -> Self {
        Self::default()
    }

    /// Everything disclosed
    pub fn all() -> Self {
        Self::from_fields(ReceiptField::ALL)
    }

    /// Policy with exactly the given fields enabled
    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = ReceiptField>,
    {
        let mut policy = Self::none();
        for field in fields {
            policy.set(field, true);
        }
        policy
    }

    pub fn get(&self, field: ReceiptField) -> bool {
        match field {
            ReceiptField::Merchant => self.merchant,
            ReceiptField::Amount => self.amount,
            ReceiptField::Token => self.token,
            ReceiptField::TimeWindow => self.time_window,
            ReceiptField::InvoiceRef => self.invoice_ref,
            ReceiptField::PaylinkId => self.paylink_id,
        }
    }

    pub fn set(&mut self, field: ReceiptField, enabled: bool) {
        let slot = match field {
            ReceiptField::Merchant => &mut self.merchant,
            ReceiptField::Amount => &mut self.amount,
            ReceiptField::Token => &mut self.token,
            ReceiptField::TimeWindow => &mut self.time_window,
            ReceiptField::InvoiceRef => &mut self.invoice_ref,
            ReceiptField::PaylinkId => &mut self.paylink_id,
        };
        *slot = enabled;
    }

    /// Builder-style variant of [`set`](Self::set)
    pub fn with(mut self, field: ReceiptField, enabled: bool) -> Self {
        self.set(field, enabled);
        self
    }

    /// Enabled fields in canonical order
    pub fn enabled(&self) -> Vec<ReceiptField> {
        ReceiptField::ALL
            .into_iter()
            .filter(|f| self.get(*f))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.enabled().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Fields enabled here but not in `allowed`
    pub fn exceeding(&self, allowed: &ReceiptFieldPolicy) -> Vec<ReceiptField> {
        ReceiptField::ALL
            .into_iter()
            .filter(|f| self.get(*f) && !allowed.get(*f))
            .collect()
    }

    /// Disclosure-legality check: every selected field is allowed
    pub fn is_subset_of(&self, allowed: &ReceiptFieldPolicy) -> bool {
        self.exceeding(allowed).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_serializes_exactly_six_keys() {
        let value = serde_json::to_value(ReceiptFieldPolicy::all()).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 6);
        for field in ReceiptField::ALL {
            assert_eq!(value[field.as_str()], serde_json::json!(true));
        }
    }

    #[test]
    fn test_policy_rejects_unknown_keys() {
        let json = r#"{"merchant":true,"amount":true,"token":true,"timeWindow":false,
            "invoiceRef":false,"paylinkId":true,"email":true}"#;
        assert!(serde_json::from_str::<ReceiptFieldPolicy>(json).is_err());
    }

    #[test]
    fn test_policy_rejects_missing_keys() {
        let json = r#"{"merchant":true,"amount":true}"#;
        assert!(serde_json::from_str::<ReceiptFieldPolicy>(json).is_err());
    }

    #[test]
    fn test_subset_check() {
        let allowed = ReceiptFieldPolicy::from_fields([
            ReceiptField::Merchant,
            ReceiptField::Amount,
            ReceiptField::Token,
        ]);
        let selection = ReceiptFieldPolicy::from_fields([ReceiptField::Merchant]);
        let too_much = selection.with(ReceiptField::InvoiceRef, true);

        assert!(selection.is_subset_of(&allowed));
        assert!(ReceiptFieldPolicy::none().is_subset_of(&allowed));
        assert!(!too_much.is_subset_of(&allowed));
        assert_eq!(too_much.exceeding(&allowed), vec![ReceiptField::InvoiceRef]);
    }

    #[test]
    fn test_field_names_resolve_both_ways() {
        assert_eq!(ReceiptField::from_name("merchantPubkey"), Some(ReceiptField::Merchant));
        assert_eq!(ReceiptField::from_name("merchant"), Some(ReceiptField::Merchant));
        assert_eq!(ReceiptField::from_name("slot"), Some(ReceiptField::TimeWindow));
        assert_eq!(ReceiptField::from_name("mint"), Some(ReceiptField::Token));
        assert_eq!(ReceiptField::from_name("commitment"), None);
    }

    #[test]
    fn test_enabled_is_canonically_ordered() {
        let policy = ReceiptFieldPolicy::none()
            .with(ReceiptField::PaylinkId, true)
            .with(ReceiptField::Merchant, true);
        assert_eq!(
            policy.enabled(),
            vec![ReceiptField::Merchant, ReceiptField::PaylinkId]
        );
        assert_eq!(policy.count(), 2);
    }
}
