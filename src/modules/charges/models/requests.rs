use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::{AppError, Result};

/// Body of `POST /payments/create-service-order`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceOrderRequest {
    /// Local client id of the payer
    pub customer_id: String,
    pub service_id: String,
    /// Requesting (dispatcher) company
    pub company_id: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub value: Decimal,
}

impl CreateServiceOrderRequest {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("customerId", &self.customer_id),
            ("serviceId", &self.service_id),
            ("companyId", &self.company_id),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

/// Body of `POST /payments/{id}/manual-payment`; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualPaymentRequest {
    pub payment_date: Option<NaiveDate>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub value: Option<Decimal>,
}
