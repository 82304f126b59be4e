pub mod charge_service;

pub use charge_service::{BillingSettings, ChargeService};
