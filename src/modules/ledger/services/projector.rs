use serde::Serialize;
use std::sync::Arc;

use crate::modules::ledger::models::{ChargeUpdate, MergeOutcome};
use crate::modules::ledger::repositories::LedgerStore;

/// Result of applying an update to one ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SideResult {
    /// No row for this charge in this ledger
    Missing,
    Applied(MergeOutcome),
    Failed { error: String },
}

impl SideResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, SideResult::Failed { .. })
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SideResult::Missing)
    }

    pub fn changed(&self) -> bool {
        matches!(self, SideResult::Applied(outcome) if outcome.changed())
    }
}

/// Result of projecting one update onto both ledgers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionResult {
    pub payment: SideResult,
    pub service_order: SideResult,
}

impl ProjectionResult {
    /// Every existing row accepted the update
    pub fn succeeded(&self) -> bool {
        !self.payment.is_failed() && !self.service_order.is_failed()
    }

    /// Neither ledger knows this charge
    pub fn nothing_found(&self) -> bool {
        self.payment.is_missing() && self.service_order.is_missing()
    }

    pub fn changed(&self) -> bool {
        self.payment.changed() || self.service_order.changed()
    }

    /// First failure message, if any
    pub fn error(&self) -> Option<String> {
        [&self.payment, &self.service_order]
            .into_iter()
            .find_map(|side| match side {
                SideResult::Failed { error } => Some(error.clone()),
                _ => None,
            })
    }
}

/// Single write path for charge state.
///
/// The `Payment` and `ServiceOrder` rows of a charge are projections of the
/// same external charge; every observation is applied to both through the
/// same merge, each side independently so a missing or failing row on one
/// side never blocks the other.
pub struct ChargeProjector {
    store: Arc<dyn LedgerStore>,
}

impl ChargeProjector {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    pub async fn project(&self, update: &ChargeUpdate) -> ProjectionResult {
        let payment = match self.store.apply_to_payment(update).await {
            Ok(Some(written)) => SideResult::Applied(written.outcome),
            Ok(None) => SideResult::Missing,
            Err(e) => {
                tracing::error!(
                    external_id = %update.external_id,
                    source = ?update.source,
                    error = %e,
                    "Failed to update payment ledger"
                );
                SideResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        let service_order = match self.store.apply_to_service_order(update).await {
            Ok(Some(written)) => SideResult::Applied(written.outcome),
            Ok(None) => SideResult::Missing,
            Err(e) => {
                tracing::error!(
                    external_id = %update.external_id,
                    source = ?update.source,
                    error = %e,
                    "Failed to update service order ledger"
                );
                SideResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        let result = ProjectionResult {
            payment,
            service_order,
        };

        tracing::debug!(
            external_id = %update.external_id,
            source = ?update.source,
            status = ?update.status,
            changed = result.changed(),
            "Charge update projected"
        );

        result
    }
}
