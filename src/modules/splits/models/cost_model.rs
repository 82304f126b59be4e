use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::currency::{round_brl, validate_fee};
use crate::core::Result;

/// Cost structure of one ticket-dispute service tier.
///
/// The three fee components are guaranteed obligations; whatever a charge
/// collects above their sum is the dispatcher's margin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CostModel {
    /// Fee owed to the primary partner (retained by the collecting account)
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub primary_fee: Decimal,

    /// Fee owed to the downstream partner company
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub secondary_fee: Decimal,

    /// Fixed processing fee
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub fixed_fee: Decimal,

    /// Retail price suggested to dispatchers
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub suggested_price: Decimal,
}

impl CostModel {
    pub fn new(
        primary_fee: Decimal,
        secondary_fee: Decimal,
        fixed_fee: Decimal,
        suggested_price: Decimal,
    ) -> Self {
        Self {
            primary_fee,
            secondary_fee,
            fixed_fee,
            suggested_price,
        }
    }

    /// Sum of the guaranteed obligations a charge must cover
    pub fn cost_floor(&self) -> Decimal {
        round_brl(self.primary_fee + self.secondary_fee + self.fixed_fee)
    }

    /// Rejects negative components
    pub fn validate(&self) -> Result<()> {
        validate_fee("primary fee", self.primary_fee)?;
        validate_fee("secondary fee", self.secondary_fee)?;
        validate_fee("fixed fee", self.fixed_fee)?;
        validate_fee("suggested price", self.suggested_price)?;
        Ok(())
    }
}
