//! Full PayLink lifecycle against a running server
//! Run with: cargo test -p paylink-server --test api

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use tower::ServiceExt;

use paylink_core::error::{DisclosureError, GatewayError};
use paylink_core::types::{ActivityKind, NewPayLink, PayLinkQuery, ReceiptQuery};
use paylink_core::wire::{ErrorCode, ErrorResponse, HealthResponse};
use paylink_core::{
    disclose, DelegatedVerifier, HttpGateway, PayLinkStatus, PaymentGateway, ProofVerifier,
    ReceiptField, ReceiptFieldPolicy, Token,
};
use paylink_server::{create_routes, AppState, Config};

async fn spawn_server() -> HttpGateway {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_routes(AppState::new(Config::default()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    HttpGateway::with_base_url(format!("http://{addr}")).unwrap()
}

fn new_paylink(invoice_ref: &str) -> NewPayLink {
    NewPayLink {
        merchant_pubkey: "Merchant111".to_string(),
        amount: 2_500_000,
        token: Token::Usdc,
        expires_at: Utc::now() + Duration::hours(2),
        invoice_ref: Some(invoice_ref.to_string()),
        memo_enabled: true,
        receipt_fields: ReceiptFieldPolicy::from_fields([
            ReceiptField::Merchant,
            ReceiptField::Amount,
            ReceiptField::PaylinkId,
        ]),
    }
}

#[tokio::test]
async fn paylink_lifecycle_over_http() {
    let gateway = Arc::new(spawn_server().await);

    let created = gateway.create_paylink(new_paylink("INV-7")).await.unwrap();
    assert_eq!(created.paylink.status, PayLinkStatus::Pending);
    assert!(created.pay_url.ends_with(&format!("/pay/{}", created.paylink.id)));

    let listed = gateway.list_paylinks(&PayLinkQuery::default()).await.unwrap();
    assert_eq!(listed.total, 1);
    assert!(!listed.has_more);

    let signature = gateway
        .simulate_payment(&created.paylink.id)
        .await
        .unwrap()
        .unwrap();
    assert!(signature.starts_with("simulated-"));

    let paylink = gateway.get_paylink(&created.paylink.id).await.unwrap();
    assert_eq!(paylink.status, PayLinkStatus::Paid);
    assert_eq!(paylink.paid_signature.as_deref(), Some(signature.as_str()));

    let activity = gateway.paylink_activity(&paylink.id).await.unwrap();
    assert_eq!(activity[0].kind, ActivityKind::Created);
    assert!(activity.iter().any(|e| e.kind == ActivityKind::ReceiptIssued));

    let receipts = gateway.paylink_receipts(&paylink.id).await.unwrap();
    assert_eq!(receipts.len(), 1);
    let receipt = receipts.into_iter().next().unwrap();
    assert!(receipt.facts.as_ref().map_or(true, |f| f.nonce.is_none()));

    let by_merchant = gateway
        .list_receipts(&ReceiptQuery {
            merchant: Some("Merchant111".to_string()),
            page: None,
        })
        .await
        .unwrap();
    assert_eq!(by_merchant.total, 1);
    assert_eq!(gateway.get_receipt(&receipt.id).await.unwrap().id, receipt.id);

    // Fetched receipts carry no nonce, so the proof comes from the backend
    let selection = ReceiptFieldPolicy::from_fields([ReceiptField::Amount]);
    let proof = disclose(gateway.as_ref(), &paylink, &receipt, &selection)
        .await
        .unwrap();
    assert_eq!(proof.revealed.amount, Some(2_500_000));
    assert!(proof.revealed.merchant.is_none());

    let verifier = DelegatedVerifier::new(gateway.clone());
    let response = verifier.verify(&proof).await;
    assert!(response.valid, "unexpected mismatches: {:?}", response.mismatches);
    assert_eq!(response.verified_fields, vec!["amount"]);
    assert_eq!(response.signature.as_deref(), Some(signature.as_str()));

    let mut tampered = proof.clone();
    tampered.revealed.amount = Some(1);
    let response = verifier.verify(&tampered).await;
    assert!(!response.valid);
    assert_eq!(response.mismatches, vec!["amount mismatch"]);

    let err = gateway.cancel_paylink(&paylink.id).await.unwrap_err();
    assert!(matches!(err, GatewayError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn backend_enforces_disclosure_policy() {
    let gateway = spawn_server().await;
    let created = gateway.create_paylink(new_paylink("INV-8")).await.unwrap();
    gateway.simulate_payment(&created.paylink.id).await.unwrap();
    let receipt = gateway
        .paylink_receipts(&created.paylink.id)
        .await
        .unwrap()
        .pop()
        .unwrap();

    let err = gateway
        .request_proof(
            &receipt.id,
            &ReceiptFieldPolicy::from_fields([ReceiptField::InvoiceRef]),
        )
        .await
        .unwrap_err();
    match err {
        GatewayError::Disclosure(DisclosureError::PolicyViolation { fields }) => {
            assert_eq!(fields, vec![ReceiptField::InvoiceRef]);
        }
        other => panic!("expected policy violation, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_entities_and_invalid_input() {
    let gateway = spawn_server().await;

    let err = gateway.get_paylink("does-not-exist").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)), "got {err:?}");

    let mut expired = new_paylink("INV-9");
    expired.expires_at = Utc::now() - Duration::minutes(1);
    let err = gateway.create_paylink(expired).await.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidInput(_)), "got {err:?}");

    let created = gateway.create_paylink(new_paylink("INV-10")).await.unwrap();
    let cancelled = gateway.cancel_paylink(&created.paylink.id).await.unwrap();
    assert_eq!(cancelled.status, PayLinkStatus::Cancelled);
}

#[tokio::test]
async fn fee_estimate_uses_static_levels_without_key() {
    let gateway = spawn_server().await;
    let estimate = gateway.estimate_fees(None).await.unwrap();
    assert_eq!(
        (estimate.low, estimate.medium, estimate.high),
        (1000, 2000, 5000)
    );
    assert_eq!(estimate.recommended, 2000);
    assert_eq!(estimate.unit, "microLamportsPerCU");
}

#[tokio::test]
async fn malformed_body_is_invalid_input() {
    let app = create_routes(AppState::new(Config::default()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/paylinks")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error.code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn health_reports_counts() {
    let app = create_routes(AppState::new(Config::default()));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.paylinks, 0);
}
