// Webhook ingestion
//
// Every notification is persisted; unknown charges are recorded and marked
// processed; repeated and out-of-order events never regress a charge.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::*;
use serde_json::json;

use disputepay::core::AppError;
use disputepay::modules::ledger::models::{ChargeStatus, ServiceOrderStatus};
use disputepay::modules::ledger::LedgerStore;
use disputepay::modules::webhooks::services::webhook_service::payload_digest;

async fn seed_pending_charge(harness: &TestHarness, external_id: &str) {
    let seeded = harness.seed_parties();
    harness
        .store
        .upsert_payment(TestDataFactory::new_payment(
            external_id,
            &seeded.dispatcher.id,
            ChargeStatus::Pending,
        ))
        .await
        .unwrap();
    harness
        .store
        .upsert_service_order(TestDataFactory::new_service_order(
            external_id,
            &seeded.client,
            &seeded.pricing,
            ChargeStatus::Pending,
        ))
        .await
        .unwrap();
}

fn body(value: &serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

#[tokio::test]
async fn test_unknown_charge_is_recorded_and_processed() {
    let harness = TestHarness::new();
    let service = harness.webhook_service(None);

    let payload = body(&TestDataFactory::webhook("PAYMENT_RECEIVED", "pay_123"));
    let outcome = service.ingest(&payload).await.unwrap();

    assert!(outcome.processed);
    assert!(outcome.unknown_charge);
    assert!(!outcome.changed);
    assert_eq!(harness.store.payment_count(), 0);
    assert_eq!(harness.store.service_order_count(), 0);

    let events = harness.store.webhook_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].processed);
    assert_eq!(events[0].event_type, "PAYMENT_RECEIVED");
    assert_eq!(events[0].asaas_payment_id.as_deref(), Some("pay_123"));
    assert_eq!(events[0].payload_sha256, payload_digest(&payload));
}

#[tokio::test]
async fn test_received_marks_both_ledgers_paid_with_pix() {
    let harness = TestHarness::new();
    seed_pending_charge(&harness, "pay_live").await;
    let service = harness.webhook_service(None);

    let payload = TestDataFactory::webhook_with_pix("PAYMENT_RECEIVED", "pay_live", "qr", "copy");
    let outcome = service.ingest(&body(&payload)).await.unwrap();

    assert!(outcome.processed);
    assert!(outcome.changed);

    let payment = harness.store.payment("pay_live").unwrap();
    assert_eq!(payment.status, ChargeStatus::Paid);
    assert_eq!(payment.pix_copy_paste.as_deref(), Some("copy"));
    assert!(payment.confirmed_at.is_some());

    let order = harness.store.service_order("pay_live").unwrap();
    assert_eq!(order.payment_status, ChargeStatus::Paid);
    assert_eq!(order.status, ServiceOrderStatus::Paid);
    assert_eq!(order.pix_qr_code.as_deref(), Some("qr"));
    assert_eq!(order.raw_webhook_payload, Some(payload));
}

#[tokio::test]
async fn test_reingesting_paid_webhook_is_noop() {
    let harness = TestHarness::new();
    seed_pending_charge(&harness, "pay_twice").await;
    let service = harness.webhook_service(None);

    let payload = body(&TestDataFactory::webhook("PAYMENT_CONFIRMED", "pay_twice"));
    service.ingest(&payload).await.unwrap();
    let first = harness.store.service_order("pay_twice").unwrap();

    let outcome = service.ingest(&payload).await.unwrap();

    assert!(outcome.processed);
    assert!(!outcome.changed);
    let second = harness.store.service_order("pay_twice").unwrap();
    assert_eq!(second.payment_status, ChargeStatus::Paid);
    assert_eq!(second.confirmed_at, first.confirmed_at);
    assert_eq!(harness.store.webhook_events().len(), 2);
}

#[tokio::test]
async fn test_overdue_after_paid_does_not_regress() {
    let harness = TestHarness::new();
    seed_pending_charge(&harness, "pay_order").await;
    let service = harness.webhook_service(None);

    service
        .ingest(&body(&TestDataFactory::webhook("PAYMENT_RECEIVED", "pay_order")))
        .await
        .unwrap();
    let outcome = service
        .ingest(&body(&TestDataFactory::webhook("PAYMENT_OVERDUE", "pay_order")))
        .await
        .unwrap();

    assert!(outcome.processed);
    assert_eq!(harness.store.payment("pay_order").unwrap().status, ChargeStatus::Paid);
    assert_eq!(
        harness.store.service_order("pay_order").unwrap().payment_status,
        ChargeStatus::Paid
    );
}

#[tokio::test]
async fn test_event_types_map_to_statuses() {
    let cases = [
        ("PAYMENT_OVERDUE", ChargeStatus::Overdue),
        ("PAYMENT_DELETED", ChargeStatus::Cancelled),
        ("PAYMENT_AWAITING_RISK_ANALYSIS", ChargeStatus::AwaitingRiskAnalysis),
        ("PAYMENT_REFUND_IN_PROGRESS", ChargeStatus::RefundRequested),
        ("PAYMENT_CHARGEBACK_REQUESTED", ChargeStatus::ChargebackRequested),
    ];

    for (event, expected) in cases {
        let harness = TestHarness::new();
        seed_pending_charge(&harness, "pay_map").await;
        let service = harness.webhook_service(None);

        service
            .ingest(&body(&TestDataFactory::webhook(event, "pay_map")))
            .await
            .unwrap();

        assert_eq!(
            harness.store.payment("pay_map").unwrap().status,
            expected,
            "event {}",
            event
        );
    }
}

#[tokio::test]
async fn test_unrecognized_event_is_audit_only() {
    let harness = TestHarness::new();
    seed_pending_charge(&harness, "pay_audit").await;
    let service = harness.webhook_service(None);

    let outcome = service
        .ingest(&body(&TestDataFactory::webhook("PAYMENT_UPDATED", "pay_audit")))
        .await
        .unwrap();

    assert!(outcome.processed);
    assert!(!outcome.changed);
    assert_eq!(
        harness.store.payment("pay_audit").unwrap().status,
        ChargeStatus::Pending
    );
}

#[tokio::test]
async fn test_malformed_payload_rejected() {
    let harness = TestHarness::new();
    let service = harness.webhook_service(None);

    let not_json = service.ingest(b"not json").await;
    assert!(matches!(not_json, Err(AppError::Validation(_))));

    let missing_payment = service
        .ingest(&body(&json!({"event": "PAYMENT_RECEIVED"})))
        .await;
    assert!(matches!(missing_payment, Err(AppError::Validation(_))));

    assert!(harness.store.webhook_events().is_empty());
}

#[tokio::test]
async fn test_failed_side_leaves_event_pending_until_reprocessed() {
    let harness = TestHarness::new();
    seed_pending_charge(&harness, "pay_retry").await;
    let service = harness.webhook_service(None);

    harness.store.fail_service_order_writes(true);
    let outcome = service
        .ingest(&body(&TestDataFactory::webhook("PAYMENT_RECEIVED", "pay_retry")))
        .await
        .unwrap();

    assert!(!outcome.processed);
    let events = harness.store.webhook_events();
    assert!(!events[0].processed);
    assert!(events[0].error.is_some());
    assert_eq!(harness.store.payment("pay_retry").unwrap().status, ChargeStatus::Paid);

    harness.store.fail_service_order_writes(false);
    let report = service.reprocess_pending(10).await.unwrap();

    assert_eq!(report.attempted, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);
    assert!(harness.store.webhook_events()[0].processed);
    assert_eq!(
        harness.store.service_order("pay_retry").unwrap().payment_status,
        ChargeStatus::Paid
    );

    let again = service.reprocess_pending(10).await.unwrap();
    assert_eq!(again.attempted, 0);
}

#[tokio::test]
async fn test_token_verification() {
    let harness = TestHarness::new();

    let open = harness.webhook_service(None);
    assert!(open.verify_token(None).is_ok());

    let guarded = harness.webhook_service(Some("s3cret"));
    assert!(guarded.verify_token(Some("s3cret")).is_ok());
    assert!(matches!(
        guarded.verify_token(Some("wrong")),
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(guarded.verify_token(None), Err(AppError::Unauthorized(_))));
}
