//! End-to-end disclosure flow over the in-memory gateway

use std::sync::Arc;

use chrono::{Duration, Utc};
use paylink_core::verifier::{self, LEGACY_PROOF_UNSUPPORTED};
use paylink_core::{
    disclose, ClientConfig, DelegatedVerifier, MemoryGateway, PayLinkStatus, PaymentGateway,
    ProofVerifier, ReceiptField, ReceiptFieldPolicy, ReceiptProof, Token, VerificationMode,
};
use paylink_core::types::NewPayLink;

fn allowed() -> ReceiptFieldPolicy {
    ReceiptFieldPolicy::from_fields([
        ReceiptField::Merchant,
        ReceiptField::Amount,
        ReceiptField::Token,
        ReceiptField::PaylinkId,
    ])
}

async fn paid_paylink(gateway: &MemoryGateway) -> (paylink_core::PayLink, paylink_core::Receipt) {
    let created = gateway
        .create_paylink(NewPayLink {
            merchant_pubkey: "Merchant111".to_string(),
            amount: 1_250_000,
            token: Token::Sol,
            expires_at: Utc::now() + Duration::hours(1),
            invoice_ref: Some("INV-1001".to_string()),
            memo_enabled: true,
            receipt_fields: allowed(),
        })
        .await
        .unwrap();

    gateway.simulate_payment(&created.paylink.id).await.unwrap();
    let paylink = gateway.get_paylink(&created.paylink.id).await.unwrap();
    let receipt = gateway
        .paylink_receipts(&paylink.id)
        .await
        .unwrap()
        .pop()
        .unwrap();
    (paylink, receipt)
}

#[tokio::test]
async fn selected_fields_verify_against_authority() {
    let gateway = Arc::new(MemoryGateway::new());
    let (paylink, receipt) = paid_paylink(&gateway).await;
    assert_eq!(paylink.status, PayLinkStatus::Paid);

    let selection = ReceiptFieldPolicy::from_fields([ReceiptField::Merchant, ReceiptField::Token]);
    let proof = disclose(gateway.as_ref(), &paylink, &receipt, &selection)
        .await
        .unwrap();
    assert_eq!(
        proof.revealed.fields(),
        vec![ReceiptField::Merchant, ReceiptField::Token]
    );
    assert_eq!(proof.commitment, receipt.commitment);

    let verifier = DelegatedVerifier::new(gateway.clone());
    let response = verifier.verify(&proof).await;
    assert!(response.valid, "unexpected mismatches: {:?}", response.mismatches);
    assert_eq!(response.verified_fields, vec!["merchant", "token"]);
    assert_eq!(response.signature, paylink.paid_signature);
    assert_eq!(response.paylink_status, Some(PayLinkStatus::Paid));
}

#[tokio::test]
async fn shared_json_survives_the_trip() {
    let gateway = Arc::new(MemoryGateway::new());
    let (paylink, receipt) = paid_paylink(&gateway).await;

    let proof = disclose(gateway.as_ref(), &paylink, &receipt, &ReceiptFieldPolicy::none())
        .await
        .unwrap();
    assert!(proof.revealed.is_empty());
    assert!(proof.nonce().is_some());

    let shared = proof.to_json();
    let authority = DelegatedVerifier::new(gateway.clone());
    let response = verifier::verify_json(&authority, &shared).await.unwrap();
    assert!(response.valid);
    assert!(response.verified_fields.is_empty());
}

#[tokio::test]
async fn tampered_amount_is_rejected() {
    let gateway = Arc::new(MemoryGateway::new());
    let (paylink, receipt) = paid_paylink(&gateway).await;

    let mut proof = disclose(
        gateway.as_ref(),
        &paylink,
        &receipt,
        &ReceiptFieldPolicy::from_fields([ReceiptField::Amount]),
    )
    .await
    .unwrap();
    proof.revealed.amount = Some(1);

    let response = DelegatedVerifier::new(gateway.clone()).verify(&proof).await;
    assert!(!response.valid);
    assert!(response.verified_fields.is_empty());
    assert_eq!(response.mismatches, vec!["amount mismatch"]);
}

#[tokio::test]
async fn authority_refuses_fields_the_merchant_forbade() {
    let gateway = Arc::new(MemoryGateway::new());
    let (paylink, receipt) = paid_paylink(&gateway).await;
    assert!(!paylink.receipt_fields.invoice_ref);

    let mut proof = disclose(
        gateway.as_ref(),
        &paylink,
        &receipt,
        &ReceiptFieldPolicy::from_fields([ReceiptField::Amount]),
    )
    .await
    .unwrap();
    proof.revealed.invoice_ref = Some("INV-1001".to_string());

    let response = DelegatedVerifier::new(gateway.clone()).verify(&proof).await;
    assert!(!response.valid);
    assert!(response.verified_fields.is_empty());
    assert_eq!(response.mismatches, vec!["invoiceRef not disclosable"]);
}

#[tokio::test]
async fn policy_violation_never_reaches_gateway() {
    let gateway = Arc::new(MemoryGateway::new());
    let (paylink, receipt) = paid_paylink(&gateway).await;

    let err = disclose(
        gateway.as_ref(),
        &paylink,
        &receipt,
        &ReceiptFieldPolicy::from_fields([ReceiptField::InvoiceRef]),
    )
    .await
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Disclosure not permitted by the PayLink policy: invoiceRef"
    );
}

#[tokio::test]
async fn legacy_proofs_are_not_forwarded() {
    let gateway = Arc::new(MemoryGateway::new());
    let legacy = ReceiptProof::from_json(
        r#"{"commitmentHash": "0xabc", "disclosedFields": {"amount": 5}, "signature": "sig"}"#,
    )
    .unwrap();

    let response = DelegatedVerifier::new(gateway).verify(&legacy).await;
    assert!(!response.valid);
    assert_eq!(response.mismatches, vec![LEGACY_PROOF_UNSUPPORTED]);
}

#[tokio::test]
async fn local_verification_is_opt_in() {
    let gateway: Arc<dyn PaymentGateway> = Arc::new(MemoryGateway::new());

    let delegated = verifier::from_config(&ClientConfig::default(), gateway.clone());
    assert!(delegated.is_authoritative());

    let local = verifier::from_config(
        &ClientConfig {
            verification: VerificationMode::Local,
            ..ClientConfig::default()
        },
        gateway,
    );
    assert!(!local.is_authoritative());
}
