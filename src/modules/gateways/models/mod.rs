pub mod asaas;
pub mod gateway_config;

pub use asaas::{
    ChargePage, ChargeReference, ChargeRequest, ChargeSnapshot, ChargeSplit, CreatedCharge,
    CustomerProfile, CustomerSnapshot, PixQrCode, UndecodedCharge,
};
pub use gateway_config::GatewayEnvironment;
