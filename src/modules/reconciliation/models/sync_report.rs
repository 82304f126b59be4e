use serde::Serialize;

use crate::modules::ledger::models::ChargeStatus;

/// What a sync did to one gateway charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// A payment or service order row was inserted
    Created,
    /// Existing rows changed
    Updated,
    /// Rows already matched the gateway
    Unchanged,
    /// Belongs to another company
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncError {
    pub asaas_payment_id: String,
    pub message: String,
}

/// Totals of a bulk reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub total_seen: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub pages: usize,
    /// Stopped early; pages already written are kept
    pub cancelled: bool,
    pub errors: Vec<SyncError>,
}

impl SyncReport {
    pub fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Created => self.created += 1,
            ItemOutcome::Updated => self.updated += 1,
            ItemOutcome::Unchanged => self.unchanged += 1,
            ItemOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn record_error(&mut self, asaas_payment_id: impl Into<String>, message: impl Into<String>) {
        self.errors.push(SyncError {
            asaas_payment_id: asaas_payment_id.into(),
            message: message.into(),
        });
    }
}

/// Result of reconciling a single charge
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetedSyncResult {
    pub asaas_payment_id: String,
    pub status: ChargeStatus,
    pub outcome: ItemOutcome,
    pub payment_id: Option<String>,
    pub service_order_id: Option<String>,
    /// Service was matched from the charge description
    pub service_inferred: bool,
    /// Why no service order could be written, when none was
    pub service_order_error: Option<String>,
}
