pub mod models;
pub mod services;

pub use models::{
    ChargePage, ChargeReference, ChargeRequest, ChargeSnapshot, ChargeSplit, CreatedCharge,
    CustomerProfile, CustomerSnapshot, GatewayEnvironment, PixQrCode, UndecodedCharge,
};
pub use services::{backoff_policy, with_retry, AsaasClient, PaymentGateway};
