use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::charge::{ChargeState, ChargeUpdate, MergeOutcome, PixData, UpdateSource};
use super::status::ChargeStatus;

/// Generic ledger row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: String,
    pub asaas_payment_id: String,
    pub company_id: String,
    /// Absent for tenant-level purchases
    pub customer_id: Option<String>,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub status: ChargeStatus,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn charge_state(&self) -> ChargeState {
        ChargeState {
            status: self.status,
            pix_qr_code: self.pix_qr_code.clone(),
            pix_copy_paste: self.pix_copy_paste.clone(),
            confirmed_at: self.confirmed_at,
            last_event_at: self.last_event_at,
        }
    }

    /// Merge an observation into this row
    pub fn apply(&mut self, update: &ChargeUpdate) -> MergeOutcome {
        let mut state = self.charge_state();
        let outcome = state.merge(update);

        self.status = state.status;
        self.pix_qr_code = state.pix_qr_code;
        self.pix_copy_paste = state.pix_copy_paste;
        self.confirmed_at = state.confirmed_at;
        self.last_event_at = state.last_event_at;
        if outcome.changed() {
            self.updated_at = Utc::now();
        }

        outcome
    }
}

/// Payment as observed at creation or during reconciliation
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub asaas_payment_id: String,
    pub company_id: String,
    pub customer_id: Option<String>,
    pub amount: Decimal,
    pub status: ChargeStatus,
    pub pix: PixData,
    pub due_date: Option<NaiveDate>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub source: UpdateSource,
}

impl NewPayment {
    /// Row inserted when no payment exists yet for this charge
    pub fn into_payment(self) -> Payment {
        let now = Utc::now();
        Payment {
            id: uuid::Uuid::new_v4().to_string(),
            asaas_payment_id: self.asaas_payment_id,
            company_id: self.company_id,
            customer_id: self.customer_id,
            amount: self.amount,
            status: self.status,
            pix_qr_code: self.pix.qr_code,
            pix_copy_paste: self.pix.copy_paste,
            due_date: self.due_date,
            confirmed_at: self.confirmed_at,
            description: self.description,
            last_event_at: Some(self.observed_at),
            created_at: now,
            updated_at: now,
        }
    }

    /// The same observation expressed as an update of an existing row
    pub fn as_update(&self) -> ChargeUpdate {
        ChargeUpdate::new(self.asaas_payment_id.clone(), self.source)
            .with_status(self.status)
            .with_pix(self.pix.clone())
            .with_confirmed_at(self.confirmed_at)
            .observed_at(self.observed_at)
    }
}
