use serde::{Deserialize, Serialize};

/// Canonical charge status shared by both ledgers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(32)", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Paid,
    Overdue,
    Refunded,
    Cancelled,
    RefundRequested,
    ChargebackRequested,
    AwaitingRiskAnalysis,
}

impl ChargeStatus {
    /// Map a gateway payment status onto the canonical enum.
    ///
    /// A deleted snapshot is `Cancelled` whatever its last status was;
    /// unknown statuses fall back to `Pending`.
    pub fn from_external(status: &str, deleted: bool) -> Self {
        if deleted {
            return ChargeStatus::Cancelled;
        }

        match status.trim().to_ascii_uppercase().as_str() {
            "RECEIVED" | "CONFIRMED" | "RECEIVED_IN_CASH" => ChargeStatus::Paid,
            "PENDING" => ChargeStatus::Pending,
            "OVERDUE" => ChargeStatus::Overdue,
            "REFUNDED" => ChargeStatus::Refunded,
            "REFUND_REQUESTED" | "REFUND_IN_PROGRESS" => ChargeStatus::RefundRequested,
            "CHARGEBACK_REQUESTED" | "CHARGEBACK_DISPUTE" | "AWAITING_CHARGEBACK_REVERSAL" => {
                ChargeStatus::ChargebackRequested
            }
            "AWAITING_RISK_ANALYSIS" => ChargeStatus::AwaitingRiskAnalysis,
            "DELETED" => ChargeStatus::Cancelled,
            _ => ChargeStatus::Pending,
        }
    }

    /// Settled statuses never move back to an open one
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            ChargeStatus::Paid
                | ChargeStatus::Refunded
                | ChargeStatus::Cancelled
                | ChargeStatus::RefundRequested
                | ChargeStatus::ChargebackRequested
        )
    }

    /// Whether moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: ChargeStatus) -> bool {
        !(self.is_settled() && !next.is_settled())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Paid => "paid",
            ChargeStatus::Overdue => "overdue",
            ChargeStatus::Refunded => "refunded",
            ChargeStatus::Cancelled => "cancelled",
            ChargeStatus::RefundRequested => "refund_requested",
            ChargeStatus::ChargebackRequested => "chargeback_requested",
            ChargeStatus::AwaitingRiskAnalysis => "awaiting_risk_analysis",
        }
    }
}

impl std::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business status of a ticket-dispute service order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR(32)", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ServiceOrderStatus {
    PendingPayment,
    Paid,
    Processing,
    Completed,
    Overdue,
    Refunded,
    Cancelled,
    RefundRequested,
    ChargebackRequested,
    AwaitingRiskAnalysis,
}

impl ServiceOrderStatus {
    /// Business status after the charge moved to `payment`.
    ///
    /// Work already started on a paid order (`processing`, `completed`) is kept.
    pub fn derive(current: ServiceOrderStatus, payment: ChargeStatus) -> ServiceOrderStatus {
        match payment {
            ChargeStatus::Paid
                if matches!(
                    current,
                    ServiceOrderStatus::Processing | ServiceOrderStatus::Completed
                ) =>
            {
                current
            }
            other => ServiceOrderStatus::from(other),
        }
    }
}

impl From<ChargeStatus> for ServiceOrderStatus {
    fn from(status: ChargeStatus) -> Self {
        match status {
            ChargeStatus::Pending => ServiceOrderStatus::PendingPayment,
            ChargeStatus::Paid => ServiceOrderStatus::Paid,
            ChargeStatus::Overdue => ServiceOrderStatus::Overdue,
            ChargeStatus::Refunded => ServiceOrderStatus::Refunded,
            ChargeStatus::Cancelled => ServiceOrderStatus::Cancelled,
            ChargeStatus::RefundRequested => ServiceOrderStatus::RefundRequested,
            ChargeStatus::ChargebackRequested => ServiceOrderStatus::ChargebackRequested,
            ChargeStatus::AwaitingRiskAnalysis => ServiceOrderStatus::AwaitingRiskAnalysis,
        }
    }
}
