use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, Transaction};

use super::ledger_store::{is_unique_violation, LedgerStore, Upserted};
use crate::core::{AppError, Result};
use crate::modules::ledger::models::{
    ChargeUpdate, Client, Company, NewClient, NewPayment, NewServiceOrder, NewWebhookEvent,
    Payment, ServiceOrder, ServicePricing, Subaccount, WebhookEvent,
};

const PAYMENT_COLUMNS: &str = r#"
    id, asaas_payment_id, company_id, customer_id, amount, status,
    pix_qr_code, pix_copy_paste, due_date, confirmed_at, description,
    last_event_at, created_at, updated_at
"#;

const SERVICE_ORDER_COLUMNS: &str = r#"
    id, asaas_payment_id, payment_id, client_id, company_id, service_id,
    severity_tier, amount, status, payment_status, pix_qr_code, pix_copy_paste,
    confirmed_at, split_metadata, raw_webhook_payload, last_event_at,
    created_at, updated_at
"#;

const CLIENT_COLUMNS: &str = r#"
    id, company_id, name, tax_id, email, phone, asaas_customer_id, placeholder, created_at
"#;

const WEBHOOK_COLUMNS: &str = r#"
    id, event_type, asaas_payment_id, payload, payload_sha256, processed,
    processed_at, error, received_at
"#;

const PRICING_COLUMNS: &str = r#"
    id, name, severity_tier, partner_company_id, primary_fee, secondary_fee,
    fixed_fee, suggested_price, active
"#;

/// MySQL implementation of `LedgerStore`.
///
/// Charge merges run inside a transaction holding `SELECT ... FOR UPDATE` on
/// the row; no gateway call is ever made while a transaction is open.
pub struct MySqlLedgerStore {
    pool: MySqlPool,
}

impl MySqlLedgerStore {
    /// Create a new MySqlLedgerStore
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn lock_payment(
        tx: &mut Transaction<'_, MySql>,
        external_id: &str,
    ) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE asaas_payment_id = ? FOR UPDATE",
            PAYMENT_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(payment)
    }

    async fn write_payment_state(tx: &mut Transaction<'_, MySql>, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = ?, pix_qr_code = ?, pix_copy_paste = ?, confirmed_at = ?,
                customer_id = ?, last_event_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(payment.status)
        .bind(&payment.pix_qr_code)
        .bind(&payment.pix_copy_paste)
        .bind(payment.confirmed_at)
        .bind(&payment.customer_id)
        .bind(payment.last_event_at)
        .bind(payment.updated_at)
        .bind(&payment.id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert_payment(tx: &mut Transaction<'_, MySql>, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, asaas_payment_id, company_id, customer_id, amount, status,
                pix_qr_code, pix_copy_paste, due_date, confirmed_at, description,
                last_event_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.asaas_payment_id)
        .bind(&payment.company_id)
        .bind(&payment.customer_id)
        .bind(payment.amount)
        .bind(payment.status)
        .bind(&payment.pix_qr_code)
        .bind(&payment.pix_copy_paste)
        .bind(payment.due_date)
        .bind(payment.confirmed_at)
        .bind(&payment.description)
        .bind(payment.last_event_at)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn lock_service_order(
        tx: &mut Transaction<'_, MySql>,
        external_id: &str,
    ) -> Result<Option<ServiceOrder>> {
        let order = sqlx::query_as::<_, ServiceOrder>(&format!(
            "SELECT {} FROM service_orders WHERE asaas_payment_id = ? FOR UPDATE",
            SERVICE_ORDER_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(order)
    }

    async fn write_service_order_state(
        tx: &mut Transaction<'_, MySql>,
        order: &ServiceOrder,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE service_orders
            SET status = ?, payment_status = ?, pix_qr_code = ?, pix_copy_paste = ?,
                confirmed_at = ?, payment_id = ?, raw_webhook_payload = ?,
                last_event_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(order.status)
        .bind(order.payment_status)
        .bind(&order.pix_qr_code)
        .bind(&order.pix_copy_paste)
        .bind(order.confirmed_at)
        .bind(&order.payment_id)
        .bind(&order.raw_webhook_payload)
        .bind(order.last_event_at)
        .bind(order.updated_at)
        .bind(&order.id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert_service_order(
        tx: &mut Transaction<'_, MySql>,
        order: &ServiceOrder,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO service_orders (
                id, asaas_payment_id, payment_id, client_id, company_id, service_id,
                severity_tier, amount, status, payment_status, pix_qr_code, pix_copy_paste,
                confirmed_at, split_metadata, raw_webhook_payload, last_event_at,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.id)
        .bind(&order.asaas_payment_id)
        .bind(&order.payment_id)
        .bind(&order.client_id)
        .bind(&order.company_id)
        .bind(&order.service_id)
        .bind(order.severity_tier)
        .bind(order.amount)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(&order.pix_qr_code)
        .bind(&order.pix_copy_paste)
        .bind(order.confirmed_at)
        .bind(Json(&order.split_metadata))
        .bind(&order.raw_webhook_payload)
        .bind(order.last_event_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn merge_payment(&self, update: &ChargeUpdate) -> Result<Option<Upserted<Payment>>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut payment) = Self::lock_payment(&mut tx, &update.external_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let outcome = payment.apply(update);
        Self::write_payment_state(&mut tx, &payment).await?;
        tx.commit().await?;

        Ok(Some(Upserted::merged(payment, outcome)))
    }

    async fn merge_service_order(
        &self,
        update: &ChargeUpdate,
        payment_id: Option<&str>,
    ) -> Result<Option<Upserted<ServiceOrder>>> {
        let mut tx = self.pool.begin().await?;

        let Some(mut order) = Self::lock_service_order(&mut tx, &update.external_id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let outcome = order.apply(update);
        if order.payment_id.is_none() {
            order.payment_id = payment_id.map(str::to_string);
        }
        Self::write_service_order_state(&mut tx, &order).await?;
        tx.commit().await?;

        Ok(Some(Upserted::merged(order, outcome)))
    }
}

#[async_trait]
impl LedgerStore for MySqlLedgerStore {
    async fn find_payment_by_external_id(&self, external_id: &str) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE asaas_payment_id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn find_payment_by_id(&self, id: &str) -> Result<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn list_payments_by_company(&self, company_id: &str) -> Result<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {} FROM payments WHERE company_id = ? ORDER BY created_at DESC",
            PAYMENT_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    async fn upsert_payment(&self, new_payment: NewPayment) -> Result<Upserted<Payment>> {
        let update = new_payment.as_update();
        let customer_id = new_payment.customer_id.clone();

        let mut tx = self.pool.begin().await?;
        if let Some(mut existing) = Self::lock_payment(&mut tx, &update.external_id).await? {
            let outcome = existing.apply(&update);
            if existing.customer_id.is_none() {
                existing.customer_id = customer_id;
            }
            Self::write_payment_state(&mut tx, &existing).await?;
            tx.commit().await?;
            return Ok(Upserted::merged(existing, outcome));
        }

        let payment = new_payment.into_payment();
        match Self::insert_payment(&mut tx, &payment).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(Upserted::created(payment))
            }
            Err(AppError::Database(e)) if is_unique_violation(&e) => {
                tx.rollback().await?;
                // A concurrent writer inserted first; merge into its row instead
                self.merge_payment(&update)
                    .await?
                    .ok_or_else(|| AppError::internal("Payment vanished after unique violation"))
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_to_payment(&self, update: &ChargeUpdate) -> Result<Option<Upserted<Payment>>> {
        self.merge_payment(update).await
    }

    async fn find_service_order_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ServiceOrder>> {
        let order = sqlx::query_as::<_, ServiceOrder>(&format!(
            "SELECT {} FROM service_orders WHERE asaas_payment_id = ?",
            SERVICE_ORDER_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn find_service_order_by_id(&self, id: &str) -> Result<Option<ServiceOrder>> {
        let order = sqlx::query_as::<_, ServiceOrder>(&format!(
            "SELECT {} FROM service_orders WHERE id = ?",
            SERVICE_ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn list_service_orders_by_company(&self, company_id: &str) -> Result<Vec<ServiceOrder>> {
        let orders = sqlx::query_as::<_, ServiceOrder>(&format!(
            "SELECT {} FROM service_orders WHERE company_id = ? ORDER BY created_at DESC",
            SERVICE_ORDER_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn upsert_service_order(&self, new_order: NewServiceOrder) -> Result<Upserted<ServiceOrder>> {
        let update = new_order.as_update();
        let payment_id = new_order.payment_id.clone();

        let mut tx = self.pool.begin().await?;
        if let Some(mut existing) = Self::lock_service_order(&mut tx, &update.external_id).await? {
            let outcome = existing.apply(&update);
            if existing.payment_id.is_none() {
                existing.payment_id = payment_id;
            }
            Self::write_service_order_state(&mut tx, &existing).await?;
            tx.commit().await?;
            return Ok(Upserted::merged(existing, outcome));
        }

        let order = new_order.into_service_order();
        match Self::insert_service_order(&mut tx, &order).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(Upserted::created(order))
            }
            Err(AppError::Database(e)) if is_unique_violation(&e) => {
                tx.rollback().await?;
                self.merge_service_order(&update, payment_id.as_deref())
                    .await?
                    .ok_or_else(|| {
                        AppError::internal("Service order vanished after unique violation")
                    })
            }
            Err(e) => Err(e),
        }
    }

    async fn apply_to_service_order(
        &self,
        update: &ChargeUpdate,
    ) -> Result<Option<Upserted<ServiceOrder>>> {
        self.merge_service_order(update, None).await
    }

    async fn link_service_order(
        &self,
        update: &ChargeUpdate,
        payment_id: &str,
    ) -> Result<Option<Upserted<ServiceOrder>>> {
        self.merge_service_order(update, Some(payment_id)).await
    }

    async fn find_client(&self, id: &str) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE id = ?",
            CLIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    async fn find_client_by_tax_id(&self, tax_id: &str, company_id: &str) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE tax_id = ? AND company_id = ?",
            CLIENT_COLUMNS
        ))
        .bind(tax_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    async fn find_client_by_customer_id(&self, customer_id: &str) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients WHERE asaas_customer_id = ? LIMIT 1",
            CLIENT_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    async fn insert_client(&self, new_client: NewClient) -> Result<Client> {
        let client = new_client.into_client();

        sqlx::query(
            r#"
            INSERT INTO clients (
                id, company_id, name, tax_id, email, phone, asaas_customer_id,
                placeholder, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&client.id)
        .bind(&client.company_id)
        .bind(&client.name)
        .bind(&client.tax_id)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.asaas_customer_id)
        .bind(client.placeholder)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        Ok(client)
    }

    async fn set_client_customer_id(&self, client_id: &str, customer_id: &str) -> Result<()> {
        sqlx::query("UPDATE clients SET asaas_customer_id = ? WHERE id = ?")
            .bind(customer_id)
            .bind(client_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_company(&self, id: &str) -> Result<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, tax_id, wallet_id, asaas_customer_id FROM companies WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(company)
    }

    async fn set_company_wallet(&self, company_id: &str, wallet_id: &str) -> Result<()> {
        sqlx::query("UPDATE companies SET wallet_id = ? WHERE id = ? AND wallet_id IS NULL")
            .bind(wallet_id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_subaccount(&self, company_id: &str) -> Result<Option<Subaccount>> {
        let subaccount = sqlx::query_as::<_, Subaccount>(
            "SELECT id, company_id, wallet_id, api_key, status FROM subaccounts WHERE company_id = ? LIMIT 1",
        )
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subaccount)
    }

    async fn find_pricing(&self, service_id: &str) -> Result<Option<ServicePricing>> {
        let pricing = sqlx::query_as::<_, ServicePricing>(&format!(
            "SELECT {} FROM services WHERE id = ?",
            PRICING_COLUMNS
        ))
        .bind(service_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pricing)
    }

    async fn list_pricing(&self) -> Result<Vec<ServicePricing>> {
        let pricing = sqlx::query_as::<_, ServicePricing>(&format!(
            "SELECT {} FROM services WHERE active = TRUE ORDER BY name",
            PRICING_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(pricing)
    }

    async fn record_webhook_event(&self, new_event: NewWebhookEvent) -> Result<WebhookEvent> {
        let event = new_event.into_event();

        sqlx::query(
            r#"
            INSERT INTO webhook_events (
                id, event_type, asaas_payment_id, payload, payload_sha256,
                processed, received_at
            )
            VALUES (?, ?, ?, ?, ?, FALSE, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.event_type)
        .bind(&event.asaas_payment_id)
        .bind(&event.payload)
        .bind(&event.payload_sha256)
        .bind(event.received_at)
        .execute(&self.pool)
        .await?;

        Ok(event)
    }

    async fn find_webhook_event(&self, id: &str) -> Result<Option<WebhookEvent>> {
        let event = sqlx::query_as::<_, WebhookEvent>(&format!(
            "SELECT {} FROM webhook_events WHERE id = ?",
            WEBHOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn mark_webhook_processed(&self, event_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE webhook_events SET processed = TRUE, processed_at = ?, error = NULL WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_webhook_failed(&self, event_id: &str, error: &str) -> Result<()> {
        sqlx::query("UPDATE webhook_events SET error = ? WHERE id = ? AND processed = FALSE")
            .bind(error)
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_unprocessed_webhooks(&self, limit: u32) -> Result<Vec<WebhookEvent>> {
        let events = sqlx::query_as::<_, WebhookEvent>(&format!(
            "SELECT {} FROM webhook_events WHERE processed = FALSE ORDER BY seq ASC LIMIT ?",
            WEBHOOK_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
