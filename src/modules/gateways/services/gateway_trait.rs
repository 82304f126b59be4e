use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::core::Result;
use crate::modules::gateways::models::{
    ChargePage, ChargeRequest, ChargeSnapshot, CreatedCharge, CustomerProfile, CustomerSnapshot,
    GatewayEnvironment, PixQrCode,
};

/// Payment gateway operations used by charge creation, webhooks and force-sync.
///
/// Implementations never retry; callers decide which operations are safe to
/// repeat (see `with_retry`).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a customer and return its gateway id
    async fn create_customer(&self, profile: &CustomerProfile) -> Result<String>;

    /// Fetch a customer record
    async fn fetch_customer(&self, customer_id: &str) -> Result<CustomerSnapshot>;

    /// Create a PIX charge with splits
    async fn create_charge(&self, request: &ChargeRequest) -> Result<CreatedCharge>;

    /// Fetch the PIX QR image and copy-paste payload of a charge
    async fn fetch_qr_code(&self, external_id: &str) -> Result<PixQrCode>;

    /// Fetch the live state of a charge
    async fn fetch_charge(&self, external_id: &str) -> Result<ChargeSnapshot>;

    /// List charges, newest first
    async fn list_charges(&self, offset: u32, limit: u32) -> Result<ChargePage>;

    /// Record a cash settlement at the gateway
    async fn mark_paid_manually(
        &self,
        external_id: &str,
        payment_date: NaiveDate,
        value: Decimal,
    ) -> Result<()>;

    /// Environment this client dispatches to
    fn environment(&self) -> GatewayEnvironment;

    /// Same gateway, authenticated with a sub-account key
    fn with_api_key(&self, api_key: &str) -> Arc<dyn PaymentGateway>;
}
