use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::core::{AppError, Result};
use crate::modules::ledger::models::{ChargeStatus, ChargeUpdate, PixData, UpdateSource};

/// Gateway event types this service reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    PaymentReceived,
    PaymentConfirmed,
    PaymentOverdue,
    PaymentDeleted,
    PaymentRefunded,
    PaymentAwaitingRiskAnalysis,
    PaymentRefundInProgress,
    PaymentChargebackRequested,
    PaymentChargebackDispute,
    PaymentAwaitingChargebackReversal,
    PaymentReceivedInCashUndone,
    /// Recorded for audit, no transition
    Other(String),
}

impl WebhookEventType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "PAYMENT_RECEIVED" => Self::PaymentReceived,
            "PAYMENT_CONFIRMED" => Self::PaymentConfirmed,
            "PAYMENT_OVERDUE" => Self::PaymentOverdue,
            "PAYMENT_DELETED" => Self::PaymentDeleted,
            "PAYMENT_REFUNDED" => Self::PaymentRefunded,
            "PAYMENT_AWAITING_RISK_ANALYSIS" => Self::PaymentAwaitingRiskAnalysis,
            "PAYMENT_REFUND_IN_PROGRESS" => Self::PaymentRefundInProgress,
            "PAYMENT_CHARGEBACK_REQUESTED" => Self::PaymentChargebackRequested,
            "PAYMENT_CHARGEBACK_DISPUTE" => Self::PaymentChargebackDispute,
            "PAYMENT_AWAITING_CHARGEBACK_REVERSAL" => Self::PaymentAwaitingChargebackReversal,
            "PAYMENT_RECEIVED_IN_CASH_UNDONE" => Self::PaymentReceivedInCashUndone,
            other => Self::Other(other.to_string()),
        }
    }

    /// Status this event moves the charge to, if any.
    ///
    /// `PAYMENT_RECEIVED_IN_CASH_UNDONE` would reopen a settled charge and is
    /// kept for audit only.
    pub fn target_status(&self) -> Option<ChargeStatus> {
        match self {
            Self::PaymentReceived | Self::PaymentConfirmed => Some(ChargeStatus::Paid),
            Self::PaymentOverdue => Some(ChargeStatus::Overdue),
            Self::PaymentDeleted => Some(ChargeStatus::Cancelled),
            Self::PaymentRefunded => Some(ChargeStatus::Refunded),
            Self::PaymentAwaitingRiskAnalysis => Some(ChargeStatus::AwaitingRiskAnalysis),
            Self::PaymentRefundInProgress => Some(ChargeStatus::RefundRequested),
            Self::PaymentChargebackRequested
            | Self::PaymentChargebackDispute
            | Self::PaymentAwaitingChargebackReversal => Some(ChargeStatus::ChargebackRequested),
            Self::PaymentReceivedInCashUndone | Self::Other(_) => None,
        }
    }

    /// Events that may carry PIX data worth copying
    pub fn carries_pix(&self) -> bool {
        matches!(self, Self::PaymentReceived | Self::PaymentConfirmed)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPix {
    #[serde(default)]
    pub encoded_image: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

/// `payment` object of an Asaas notification
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayment {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub confirmed_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub client_payment_date: Option<NaiveDate>,
    #[serde(default)]
    pub pix_qr_code: Option<WebhookPix>,
    #[serde(default)]
    pub encoded_image: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

impl WebhookPayment {
    /// PIX fields, nested `pixQrCode` first, flat fields as fallback
    pub fn pix(&self) -> PixData {
        let nested = self.pix_qr_code.clone().unwrap_or_default();
        PixData {
            qr_code: nested.encoded_image.or_else(|| self.encoded_image.clone()),
            copy_paste: nested.payload.or_else(|| self.payload.clone()),
        }
    }

    fn settled_on(&self) -> Option<NaiveDate> {
        self.client_payment_date
            .or(self.payment_date)
            .or(self.confirmed_date)
    }
}

/// Asaas notification body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasWebhook {
    /// Gateway event id (`evt_...`), absent on older API versions
    #[serde(default)]
    pub id: Option<String>,
    pub event: String,
    #[serde(default)]
    pub date_created: Option<String>,
    pub payment: WebhookPayment,
}

impl AsaasWebhook {
    /// Parse a raw notification; structural problems are validation errors
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let webhook: AsaasWebhook = serde_json::from_value(value.clone())
            .map_err(|e| AppError::validation(format!("Malformed webhook payload: {}", e)))?;

        if webhook.event.trim().is_empty() {
            return Err(AppError::validation("Webhook event is empty"));
        }
        if webhook.payment.id.trim().is_empty() {
            return Err(AppError::validation("Webhook payment id is empty"));
        }

        Ok(webhook)
    }

    pub fn event_type(&self) -> WebhookEventType {
        WebhookEventType::parse(&self.event)
    }

    /// When the gateway produced the event; receipt time when unknown
    pub fn observed_at(&self, received_at: DateTime<Utc>) -> DateTime<Utc> {
        self.date_created
            .as_deref()
            .and_then(parse_gateway_timestamp)
            .unwrap_or(received_at)
    }

    /// The update this notification applies to both ledgers
    pub fn to_update(&self, raw: &serde_json::Value, received_at: DateTime<Utc>) -> ChargeUpdate {
        let event_type = self.event_type();
        let observed_at = self.observed_at(received_at);

        let mut update = ChargeUpdate::new(self.payment.id.clone(), UpdateSource::Webhook)
            .with_raw_payload(raw.clone())
            .observed_at(observed_at);

        if let Some(status) = event_type.target_status() {
            update = update.with_status(status);
        }
        if event_type.carries_pix() {
            update = update.with_pix(self.payment.pix());
        }
        if update.status == Some(ChargeStatus::Paid) {
            let confirmed_at = self
                .payment
                .settled_on()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
                .unwrap_or(observed_at);
            update = update.with_confirmed_at(Some(confirmed_at));
        }

        update
    }
}

/// Asaas timestamps are Brasília local time (`2024-06-12 16:45:03`) or RFC 3339
fn parse_gateway_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok()?;
    let brasilia = FixedOffset::west_opt(3 * 3600)?;
    brasilia
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
