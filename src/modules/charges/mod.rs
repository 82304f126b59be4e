pub mod controllers;
pub mod models;
pub mod services;

pub use controllers::configure;
pub use models::{ChargeDescriptor, ChargeView, CreateServiceOrderRequest, ManualPaymentRequest};
pub use services::{BillingSettings, ChargeService};
