use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::modules::ledger::models::{ChargeStatus, Payment, ServiceOrder, ServiceOrderStatus};
use crate::modules::splits::Split;

/// Charge returned right after creation
#[derive(Debug, Clone, Serialize)]
pub struct ChargeDescriptor {
    /// Service order id
    pub id: String,
    pub payment_id: String,
    pub asaas_payment_id: String,
    pub qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub status: ChargeStatus,
    pub splits: Vec<Split>,
    pub due_date: NaiveDate,
    pub invoice_url: Option<String>,
    /// QR data could not be fetched yet; a webhook or force-sync fills it in
    pub pix_pending: bool,
}

/// A charge merged from both ledgers
#[derive(Debug, Clone, Serialize)]
pub struct ChargeView {
    /// Service order id when one exists, else the payment id
    pub id: String,
    pub asaas_payment_id: String,
    pub payment_id: Option<String>,
    pub service_order_id: Option<String>,
    pub company_id: String,
    pub client_id: Option<String>,
    pub service_id: Option<String>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub status: ChargeStatus,
    pub order_status: Option<ServiceOrderStatus>,
    pub qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub splits: Vec<Split>,
    pub created_at: DateTime<Utc>,
}

impl ChargeView {
    /// Merge the two projections of one charge.
    ///
    /// Status comes from whichever row observed the newest event; PIX fields
    /// fall back to the other row when one side is empty.
    pub fn merge(payment: Option<&Payment>, order: Option<&ServiceOrder>) -> Option<Self> {
        match (payment, order) {
            (None, None) => None,
            (Some(p), None) => Some(Self::from_payment(p)),
            (None, Some(o)) => Some(Self::from_order(o, None)),
            (Some(p), Some(o)) => Some(Self::from_order(o, Some(p))),
        }
    }

    fn from_payment(p: &Payment) -> Self {
        Self {
            id: p.id.clone(),
            asaas_payment_id: p.asaas_payment_id.clone(),
            payment_id: Some(p.id.clone()),
            service_order_id: None,
            company_id: p.company_id.clone(),
            client_id: p.customer_id.clone(),
            service_id: None,
            amount: p.amount,
            status: p.status,
            order_status: None,
            qr_code: p.pix_qr_code.clone(),
            pix_copy_paste: p.pix_copy_paste.clone(),
            due_date: p.due_date,
            confirmed_at: p.confirmed_at,
            splits: Vec::new(),
            created_at: p.created_at,
        }
    }

    fn from_order(o: &ServiceOrder, payment: Option<&Payment>) -> Self {
        let payment_is_newer = payment
            .map(|p| p.last_event_at > o.last_event_at)
            .unwrap_or(false);

        let status = match payment {
            Some(p) if payment_is_newer => p.status,
            _ => o.payment_status,
        };

        Self {
            id: o.id.clone(),
            asaas_payment_id: o.asaas_payment_id.clone(),
            payment_id: payment.map(|p| p.id.clone()).or_else(|| o.payment_id.clone()),
            service_order_id: Some(o.id.clone()),
            company_id: o.company_id.clone(),
            client_id: Some(o.client_id.clone()),
            service_id: Some(o.service_id.clone()),
            amount: o.amount,
            status,
            order_status: Some(o.status),
            qr_code: o
                .pix_qr_code
                .clone()
                .or_else(|| payment.and_then(|p| p.pix_qr_code.clone())),
            pix_copy_paste: o
                .pix_copy_paste
                .clone()
                .or_else(|| payment.and_then(|p| p.pix_copy_paste.clone())),
            due_date: payment.and_then(|p| p.due_date),
            confirmed_at: o.confirmed_at.or_else(|| payment.and_then(|p| p.confirmed_at)),
            splits: o.split_metadata.splits.clone(),
            created_at: o.created_at,
        }
    }
}
