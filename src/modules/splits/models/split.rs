use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fixed-value allocation of a charge to a wallet other than the charge owner's
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub wallet_id: String,

    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub fixed_value: Decimal,
}

impl Split {
    pub fn new(wallet_id: impl Into<String>, fixed_value: Decimal) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            fixed_value,
        }
    }
}

/// Result of dividing one charge among its beneficiaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    /// Explicit allocations, secondary partner first, then dispatcher
    pub splits: Vec<Split>,

    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub cost_floor: Decimal,

    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub margin: Decimal,

    /// What the collecting account keeps implicitly
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub collecting_remainder: Decimal,
}

impl SplitPlan {
    /// Total explicitly allocated away from the collecting account
    pub fn split_total(&self) -> Decimal {
        self.splits.iter().map(|s| s.fixed_value).sum()
    }

    pub fn contains_wallet(&self, wallet_id: &str) -> bool {
        self.splits.iter().any(|s| s.wallet_id == wallet_id)
    }
}
