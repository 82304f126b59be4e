use async_trait::async_trait;

use crate::core::{AppError, Result};
use crate::modules::ledger::models::{
    normalize_tax_id, ChargeUpdate, Client, ClientSeed, Company, MergeOutcome, NewClient,
    NewPayment, NewServiceOrder, NewWebhookEvent, Payment, ServiceOrder, ServicePricing,
    Subaccount, WebhookEvent,
};

/// Result of a keyed write
#[derive(Debug, Clone)]
pub struct Upserted<T> {
    pub record: T,
    /// A new row was inserted
    pub created: bool,
    /// Merge result when an existing row was updated
    pub outcome: MergeOutcome,
}

impl<T> Upserted<T> {
    pub fn created(record: T) -> Self {
        Self {
            record,
            created: true,
            outcome: MergeOutcome::default(),
        }
    }

    pub fn merged(record: T, outcome: MergeOutcome) -> Self {
        Self {
            record,
            created: false,
            outcome,
        }
    }
}

/// Storage for both charge ledgers and the records they reference.
///
/// Writes to existing charge rows go through `ChargeUpdate` merges keyed by
/// the external charge id; implementations must make each merge atomic per
/// row so concurrent webhooks and force-syncs converge.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_payment_by_external_id(&self, external_id: &str) -> Result<Option<Payment>>;

    async fn find_payment_by_id(&self, id: &str) -> Result<Option<Payment>>;

    async fn list_payments_by_company(&self, company_id: &str) -> Result<Vec<Payment>>;

    /// Insert, or merge into the row with the same external id
    async fn upsert_payment(&self, payment: NewPayment) -> Result<Upserted<Payment>>;

    /// Merge into an existing payment; `None` when no row exists
    async fn apply_to_payment(&self, update: &ChargeUpdate) -> Result<Option<Upserted<Payment>>>;

    async fn find_service_order_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ServiceOrder>>;

    async fn find_service_order_by_id(&self, id: &str) -> Result<Option<ServiceOrder>>;

    async fn list_service_orders_by_company(&self, company_id: &str) -> Result<Vec<ServiceOrder>>;

    /// Insert, or merge into the row with the same external id
    async fn upsert_service_order(&self, order: NewServiceOrder) -> Result<Upserted<ServiceOrder>>;

    /// Merge into an existing service order; `None` when no row exists
    async fn apply_to_service_order(
        &self,
        update: &ChargeUpdate,
    ) -> Result<Option<Upserted<ServiceOrder>>>;

    /// Like `apply_to_service_order`, also linking the order to `payment_id`
    /// when it has no payment yet
    async fn link_service_order(
        &self,
        update: &ChargeUpdate,
        payment_id: &str,
    ) -> Result<Option<Upserted<ServiceOrder>>>;

    async fn find_client(&self, id: &str) -> Result<Option<Client>>;

    async fn find_client_by_tax_id(&self, tax_id: &str, company_id: &str) -> Result<Option<Client>>;

    async fn find_client_by_customer_id(&self, customer_id: &str) -> Result<Option<Client>>;

    async fn insert_client(&self, client: NewClient) -> Result<Client>;

    async fn set_client_customer_id(&self, client_id: &str, customer_id: &str) -> Result<()>;

    async fn find_company(&self, id: &str) -> Result<Option<Company>>;

    async fn set_company_wallet(&self, company_id: &str, wallet_id: &str) -> Result<()>;

    async fn find_subaccount(&self, company_id: &str) -> Result<Option<Subaccount>>;

    async fn find_pricing(&self, service_id: &str) -> Result<Option<ServicePricing>>;

    /// Active services, used to infer a service from a charge description
    async fn list_pricing(&self) -> Result<Vec<ServicePricing>>;

    async fn record_webhook_event(&self, event: NewWebhookEvent) -> Result<WebhookEvent>;

    async fn find_webhook_event(&self, id: &str) -> Result<Option<WebhookEvent>>;

    async fn mark_webhook_processed(&self, event_id: &str) -> Result<()>;

    async fn mark_webhook_failed(&self, event_id: &str, error: &str) -> Result<()>;

    /// Oldest unprocessed events first
    async fn list_unprocessed_webhooks(&self, limit: u32) -> Result<Vec<WebhookEvent>>;

    /// Find a client by tax id within a company, creating it from `seed` if missing
    async fn find_or_create_client(
        &self,
        tax_id: &str,
        company_id: &str,
        seed: ClientSeed,
    ) -> Result<Client> {
        let tax_id = normalize_tax_id(tax_id);
        if tax_id.is_empty() {
            return Err(AppError::validation("Client tax id is empty"));
        }

        if let Some(existing) = self.find_client_by_tax_id(&tax_id, company_id).await? {
            return Ok(existing);
        }

        let new_client = NewClient {
            company_id: company_id.to_string(),
            tax_id: tax_id.clone(),
            seed,
        };

        match self.insert_client(new_client).await {
            Ok(client) => {
                tracing::info!(
                    client_id = %client.id,
                    company_id = %company_id,
                    placeholder = client.placeholder,
                    "Client created"
                );
                Ok(client)
            }
            // Lost a race with a concurrent insert of the same tax id
            Err(AppError::Database(e)) if is_unique_violation(&e) => self
                .find_client_by_tax_id(&tax_id, company_id)
                .await?
                .ok_or_else(|| AppError::internal("Client vanished after unique violation")),
            Err(e) => Err(e),
        }
    }

    /// Wallet that receives a company's splits.
    ///
    /// Uses the company's own wallet, else its sub-account wallet (written
    /// back to the company), else `None`.
    async fn find_or_create_company_wallet(&self, company_id: &str) -> Result<Option<String>> {
        let company = self
            .find_company(company_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Company {}", company_id)))?;

        if let Some(wallet) = company.wallet_id.filter(|w| !w.is_empty()) {
            return Ok(Some(wallet));
        }

        let wallet = self
            .find_subaccount(company_id)
            .await?
            .filter(|s| s.is_active())
            .and_then(|s| s.wallet_id)
            .filter(|w| !w.is_empty());

        if let Some(wallet) = &wallet {
            self.set_company_wallet(company_id, wallet).await?;
            tracing::info!(
                company_id = %company_id,
                wallet_id = %wallet,
                "Company wallet resolved from sub-account"
            );
        }

        Ok(wallet)
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}
