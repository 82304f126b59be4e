use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::charge::{ChargeState, ChargeUpdate, MergeOutcome, PixData, UpdateSource};
use super::pricing::SeverityTier;
use super::status::{ChargeStatus, ServiceOrderStatus};
use crate::core::currency::round_brl;
use crate::modules::splits::{CostModel, Split, SplitPlan};

/// Cost breakdown stored with each order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitMetadata {
    pub cost_model: CostModel,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost_floor: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub margin: Decimal,
    pub splits: Vec<Split>,
    pub collecting_wallet_id: Option<String>,
    /// Rebuilt during reconciliation rather than recorded at creation
    #[serde(default)]
    pub reconstructed: bool,
}

impl SplitMetadata {
    pub fn from_plan(cost_model: CostModel, plan: &SplitPlan, collecting_wallet_id: &str) -> Self {
        Self {
            cost_model,
            cost_floor: plan.cost_floor,
            margin: plan.margin,
            splits: plan.splits.clone(),
            collecting_wallet_id: Some(collecting_wallet_id.to_string()),
            reconstructed: false,
        }
    }

    /// Best-effort breakdown for a charge found only at the gateway
    pub fn reconstructed(cost_model: CostModel, amount: Decimal) -> Self {
        let cost_floor = cost_model.cost_floor();
        Self {
            margin: round_brl((amount - cost_floor).max(Decimal::ZERO)),
            cost_floor,
            cost_model,
            splits: Vec::new(),
            collecting_wallet_id: None,
            reconstructed: true,
        }
    }
}

/// Ticket-dispute service order row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceOrder {
    pub id: String,
    pub asaas_payment_id: String,
    pub payment_id: Option<String>,
    pub client_id: String,
    pub company_id: String,
    pub service_id: String,
    pub severity_tier: SeverityTier,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    pub status: ServiceOrderStatus,
    pub payment_status: ChargeStatus,
    pub pix_qr_code: Option<String>,
    pub pix_copy_paste: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    #[sqlx(json)]
    pub split_metadata: SplitMetadata,
    pub raw_webhook_payload: Option<serde_json::Value>,
    pub last_event_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceOrder {
    pub fn charge_state(&self) -> ChargeState {
        ChargeState {
            status: self.payment_status,
            pix_qr_code: self.pix_qr_code.clone(),
            pix_copy_paste: self.pix_copy_paste.clone(),
            confirmed_at: self.confirmed_at,
            last_event_at: self.last_event_at,
        }
    }

    /// Merge an observation into this row and re-derive the business status
    pub fn apply(&mut self, update: &ChargeUpdate) -> MergeOutcome {
        let mut state = self.charge_state();
        let outcome = state.merge(update);

        self.payment_status = state.status;
        self.pix_qr_code = state.pix_qr_code;
        self.pix_copy_paste = state.pix_copy_paste;
        self.confirmed_at = state.confirmed_at;
        self.last_event_at = state.last_event_at;

        if outcome.status_changed {
            self.status = ServiceOrderStatus::derive(self.status, self.payment_status);
        }
        if !outcome.stale {
            if let Some(payload) = &update.raw_payload {
                self.raw_webhook_payload = Some(payload.clone());
            }
        }
        if outcome.changed() {
            self.updated_at = Utc::now();
        }

        outcome
    }
}

/// Service order as observed at creation or during reconciliation
#[derive(Debug, Clone)]
pub struct NewServiceOrder {
    pub asaas_payment_id: String,
    pub payment_id: Option<String>,
    pub client_id: String,
    pub company_id: String,
    pub service_id: String,
    pub severity_tier: SeverityTier,
    pub amount: Decimal,
    pub payment_status: ChargeStatus,
    pub pix: PixData,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub split_metadata: SplitMetadata,
    pub raw_payload: Option<serde_json::Value>,
    pub observed_at: DateTime<Utc>,
    pub source: UpdateSource,
}

impl NewServiceOrder {
    pub fn into_service_order(self) -> ServiceOrder {
        let now = Utc::now();
        ServiceOrder {
            id: uuid::Uuid::new_v4().to_string(),
            asaas_payment_id: self.asaas_payment_id,
            payment_id: self.payment_id,
            client_id: self.client_id,
            company_id: self.company_id,
            service_id: self.service_id,
            severity_tier: self.severity_tier,
            amount: self.amount,
            status: ServiceOrderStatus::from(self.payment_status),
            payment_status: self.payment_status,
            pix_qr_code: self.pix.qr_code,
            pix_copy_paste: self.pix.copy_paste,
            confirmed_at: self.confirmed_at,
            split_metadata: self.split_metadata,
            raw_webhook_payload: self.raw_payload,
            last_event_at: Some(self.observed_at),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn as_update(&self) -> ChargeUpdate {
        let mut update = ChargeUpdate::new(self.asaas_payment_id.clone(), self.source)
            .with_status(self.payment_status)
            .with_pix(self.pix.clone())
            .with_confirmed_at(self.confirmed_at)
            .observed_at(self.observed_at);
        update.raw_payload = self.raw_payload.clone();
        update
    }
}
