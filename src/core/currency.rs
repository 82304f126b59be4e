use rust_decimal::{Decimal, RoundingStrategy};

use super::error::{AppError, Result};

/// BRL amounts carry two decimal places
pub const BRL_SCALE: u32 = 2;

/// Rounds a decimal value to centavos (midpoint away from zero)
pub fn round_brl(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(BRL_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Validates a charge amount: strictly positive, at most two decimal places
pub fn validate_charge_amount(amount: Decimal) -> Result<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation(format!(
            "Charge amount must be positive, got {}",
            amount
        )));
    }

    if amount.normalize().scale() > BRL_SCALE {
        return Err(AppError::validation(format!(
            "BRL amounts must have at most {} decimal places, got {}",
            BRL_SCALE, amount
        )));
    }

    Ok(round_brl(amount))
}

/// Validates a non-negative fee component
pub fn validate_fee(name: &str, amount: Decimal) -> Result<Decimal> {
    if amount < Decimal::ZERO {
        return Err(AppError::validation(format!(
            "{} cannot be negative, got {}",
            name, amount
        )));
    }

    Ok(round_brl(amount))
}
