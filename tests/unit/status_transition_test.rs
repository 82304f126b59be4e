// Charge status transitions and merge rules
//
// Settled statuses never reopen, stale observations only move status when
// they settle an open charge, repeated observations are no-ops, and the service-order status follows
// the payment status.

use chrono::{Duration, Utc};
use disputepay::modules::ledger::models::{
    ChargeState, ChargeStatus, ChargeUpdate, PixData, ServiceOrderStatus, UpdateSource,
};
use proptest::prelude::*;

const ALL: [ChargeStatus; 8] = [
    ChargeStatus::Pending,
    ChargeStatus::Paid,
    ChargeStatus::Overdue,
    ChargeStatus::Refunded,
    ChargeStatus::Cancelled,
    ChargeStatus::RefundRequested,
    ChargeStatus::ChargebackRequested,
    ChargeStatus::AwaitingRiskAnalysis,
];

fn state(status: ChargeStatus) -> ChargeState {
    ChargeState {
        status,
        pix_qr_code: None,
        pix_copy_paste: None,
        confirmed_at: None,
        last_event_at: Some(Utc::now() - Duration::minutes(10)),
    }
}

fn observe(status: ChargeStatus) -> ChargeUpdate {
    ChargeUpdate::new("pay_123", UpdateSource::Webhook).with_status(status)
}

fn any_status() -> impl Strategy<Value = ChargeStatus> {
    (0usize..ALL.len()).prop_map(|i| ALL[i])
}

#[test]
fn test_gateway_status_mapping() {
    assert_eq!(ChargeStatus::from_external("RECEIVED", false), ChargeStatus::Paid);
    assert_eq!(ChargeStatus::from_external("confirmed", false), ChargeStatus::Paid);
    assert_eq!(ChargeStatus::from_external("OVERDUE", false), ChargeStatus::Overdue);
    assert_eq!(
        ChargeStatus::from_external("AWAITING_RISK_ANALYSIS", false),
        ChargeStatus::AwaitingRiskAnalysis
    );
    assert_eq!(ChargeStatus::from_external("PENDING", true), ChargeStatus::Cancelled);
    assert_eq!(ChargeStatus::from_external("SOMETHING_NEW", false), ChargeStatus::Pending);
}

#[test]
fn test_paid_never_returns_to_pending_or_overdue() {
    for next in [ChargeStatus::Pending, ChargeStatus::Overdue, ChargeStatus::AwaitingRiskAnalysis] {
        let mut current = state(ChargeStatus::Paid);
        let outcome = current.merge(&observe(next));

        assert_eq!(current.status, ChargeStatus::Paid);
        assert!(outcome.regression_rejected);
        assert!(!outcome.changed());
    }
}

#[test]
fn test_settled_to_settled_last_write_wins() {
    let mut current = state(ChargeStatus::Paid);
    current.merge(&observe(ChargeStatus::Refunded));
    assert_eq!(current.status, ChargeStatus::Refunded);

    current.merge(&observe(ChargeStatus::ChargebackRequested));
    assert_eq!(current.status, ChargeStatus::ChargebackRequested);
}

#[test]
fn test_out_of_order_overdue_after_paid() {
    let now = Utc::now();
    let mut current = state(ChargeStatus::Pending);

    current.merge(&observe(ChargeStatus::Paid).observed_at(now));
    let late = observe(ChargeStatus::Overdue).observed_at(now - Duration::minutes(5));
    let outcome = current.merge(&late);

    assert_eq!(current.status, ChargeStatus::Paid);
    assert!(outcome.stale);
    assert_eq!(current.last_event_at, Some(now));
}

#[test]
fn test_late_delivered_confirmation_settles_pending_charge() {
    let written_at = Utc::now();
    let mut current = state(ChargeStatus::Pending);
    current.last_event_at = Some(written_at);

    let confirmation = observe(ChargeStatus::Paid).observed_at(written_at - Duration::seconds(20));
    let outcome = current.merge(&confirmation);

    assert!(outcome.stale);
    assert_eq!(current.status, ChargeStatus::Paid);
    assert_eq!(current.last_event_at, Some(written_at));
}

#[test]
fn test_service_order_status_follows_payment() {
    assert_eq!(
        ServiceOrderStatus::derive(ServiceOrderStatus::PendingPayment, ChargeStatus::Paid),
        ServiceOrderStatus::Paid
    );
    assert_eq!(
        ServiceOrderStatus::derive(ServiceOrderStatus::Processing, ChargeStatus::Paid),
        ServiceOrderStatus::Processing
    );
    assert_eq!(
        ServiceOrderStatus::derive(ServiceOrderStatus::Completed, ChargeStatus::Refunded),
        ServiceOrderStatus::Refunded
    );
}

proptest! {
    #[test]
    fn prop_stale_observation_only_settles(from in any_status(), to in any_status()) {
        let now = Utc::now();
        let mut current = state(from);
        current.last_event_at = Some(now);
        current.merge(&observe(to).observed_at(now - Duration::minutes(1)));

        if !from.is_settled() && to.is_settled() {
            prop_assert_eq!(current.status, to);
        } else {
            prop_assert_eq!(current.status, from);
        }
    }

    #[test]
    fn prop_settled_never_reopens(from in any_status(), to in any_status()) {
        let mut current = state(from);
        current.merge(&observe(to));

        if from.is_settled() {
            prop_assert!(current.status.is_settled());
        }
        if from.can_transition_to(to) {
            prop_assert_eq!(current.status, to);
        } else {
            prop_assert_eq!(current.status, from);
        }
    }

    #[test]
    fn prop_repeated_observation_is_noop(from in any_status(), to in any_status()) {
        let mut current = state(from);
        let update = observe(to).with_pix(PixData::new("qr", "copy"));

        current.merge(&update);
        let snapshot = current.clone();
        let second = current.merge(&update);

        prop_assert!(!second.changed());
        prop_assert_eq!(current.status, snapshot.status);
        prop_assert_eq!(current.pix_copy_paste, snapshot.pix_copy_paste);
    }
}
