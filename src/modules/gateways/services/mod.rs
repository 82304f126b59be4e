pub mod asaas;
pub mod gateway_trait;
pub mod retry;

pub use asaas::AsaasClient;
pub use gateway_trait::PaymentGateway;
pub use retry::{backoff_policy, with_retry};
