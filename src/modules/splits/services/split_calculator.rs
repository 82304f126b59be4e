use rust_decimal::Decimal;

use crate::core::currency::{round_brl, validate_charge_amount};
use crate::core::{AppError, Result};
use crate::modules::splits::models::{CostModel, Split, SplitPlan};

/// Inputs for one split computation
#[derive(Debug, Clone)]
pub struct SplitInput<'a> {
    pub charged_amount: Decimal,
    pub cost_model: &'a CostModel,
    /// Owner of the charge; receives everything not explicitly split
    pub collecting_wallet_id: &'a str,
    /// Downstream partner wallet receiving the secondary fee
    pub secondary_wallet_id: Option<&'a str>,
    /// Requesting company's wallet receiving the margin
    pub dispatcher_wallet_id: Option<&'a str>,
}

/// SplitCalculator divides a charge between the collecting account, the
/// downstream partner and the dispatcher
pub struct SplitCalculator;

impl SplitCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Compute the split plan for a charge
    ///
    /// # Arguments
    /// * `input` - charged amount, cost model and candidate wallets
    ///
    /// # Returns
    /// * `SplitPlan` whose splits plus `collecting_remainder` equal the charged amount
    ///
    /// # Errors
    /// * `Validation` when the amount is not a valid BRL value or is below the cost floor
    /// * `Configuration` when a secondary fee exists but no partner wallet was resolved
    pub fn calculate(&self, input: &SplitInput<'_>) -> Result<SplitPlan> {
        let charged = validate_charge_amount(input.charged_amount)?;
        input.cost_model.validate()?;

        let cost_floor = input.cost_model.cost_floor();
        if charged < cost_floor {
            return Err(AppError::validation(format!(
                "Charged amount {} is below the cost floor {}",
                charged, cost_floor
            )));
        }

        let margin = round_brl(charged - cost_floor);
        let secondary_fee = round_brl(input.cost_model.secondary_fee);
        let mut splits = Vec::with_capacity(2);

        if secondary_fee > Decimal::ZERO {
            let wallet = input.secondary_wallet_id.ok_or_else(|| {
                AppError::configuration("Secondary fee configured but partner wallet is missing")
            })?;

            if wallet != input.collecting_wallet_id {
                splits.push(Split::new(wallet, secondary_fee));
            }
        }

        if margin > Decimal::ZERO {
            if let Some(wallet) = input.dispatcher_wallet_id {
                if wallet != input.collecting_wallet_id {
                    splits.push(Split::new(wallet, margin));
                }
            }
        }

        let allocated: Decimal = splits.iter().map(|s| s.fixed_value).sum();

        Ok(SplitPlan {
            splits,
            cost_floor,
            margin,
            collecting_remainder: charged - allocated,
        })
    }
}

impl Default for SplitCalculator {
    fn default() -> Self {
        Self::new()
    }
}
