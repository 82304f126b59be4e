use chrono::{Duration, Utc};
use reqwest_retry::policies::ExponentialBackoff;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::BillingConfig;
use crate::core::currency::validate_charge_amount;
use crate::core::{AppError, Result};
use crate::modules::charges::models::{
    ChargeDescriptor, ChargeView, CreateServiceOrderRequest, ManualPaymentRequest,
};
use crate::modules::gateways::{
    with_retry, ChargeReference, ChargeRequest, ChargeSplit, CustomerProfile, PaymentGateway,
    PixQrCode,
};
use crate::modules::ledger::models::{
    ChargeStatus, ChargeUpdate, Client, NewPayment, NewServiceOrder, PixData, ServicePricing,
    SplitMetadata, UpdateSource,
};
use crate::modules::ledger::{ChargeProjector, LedgerStore};
use crate::modules::splits::{SplitCalculator, SplitInput};

/// Billing settings the charge service needs
#[derive(Debug, Clone)]
pub struct BillingSettings {
    /// Wallet of the account that owns charges created with the default key
    pub platform_wallet_id: String,
    pub charge_due_days: i64,
    /// Backoff for read-only gateway calls
    pub read_retry: ExponentialBackoff,
}

impl BillingSettings {
    pub fn from_config(config: &BillingConfig, read_retry: ExponentialBackoff) -> Self {
        Self {
            platform_wallet_id: config.platform_wallet_id.clone(),
            charge_due_days: config.charge_due_days,
            read_retry,
        }
    }
}

/// Creates service-order charges and serves the merged charge views
pub struct ChargeService {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn LedgerStore>,
    projector: ChargeProjector,
    calculator: SplitCalculator,
    settings: BillingSettings,
}

impl ChargeService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn LedgerStore>,
        settings: BillingSettings,
    ) -> Self {
        Self {
            projector: ChargeProjector::new(store.clone()),
            gateway,
            store,
            calculator: SplitCalculator::new(),
            settings,
        }
    }

    /// Create a PIX charge for a ticket-dispute service.
    ///
    /// Everything that can be rejected is checked before the first gateway
    /// call. `create_charge` is called exactly once; if the rows cannot be
    /// written afterwards the error carries the external charge id so a
    /// force-sync can recover it.
    pub async fn create_service_order(
        &self,
        request: CreateServiceOrderRequest,
    ) -> Result<ChargeDescriptor> {
        request.validate()?;
        let amount = validate_charge_amount(request.value)?;

        let pricing = self
            .store
            .find_pricing(&request.service_id)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| AppError::not_found(format!("Service {}", request.service_id)))?;

        let client = self
            .store
            .find_client(&request.customer_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Client {}", request.customer_id)))?;

        if client.company_id != request.company_id {
            return Err(AppError::validation(format!(
                "Client {} does not belong to company {}",
                client.id, request.company_id
            )));
        }

        let collecting_wallet = self.settings.platform_wallet_id.as_str();
        let dispatcher_wallet = self
            .store
            .find_or_create_company_wallet(&request.company_id)
            .await?;
        let secondary_wallet = self.partner_wallet(&pricing).await?;

        let cost_model = pricing.cost_model();
        let plan = self.calculator.calculate(&SplitInput {
            charged_amount: amount,
            cost_model: &cost_model,
            collecting_wallet_id: collecting_wallet,
            secondary_wallet_id: secondary_wallet.as_deref(),
            dispatcher_wallet_id: dispatcher_wallet.as_deref(),
        })?;

        let customer_id = self.ensure_customer(&client).await?;

        let due_date = Utc::now().date_naive() + Duration::days(self.settings.charge_due_days);
        let mut charge_request = ChargeRequest::pix(
            customer_id,
            amount,
            due_date,
            format!("{} - {}", pricing.name, client.name),
        );
        charge_request.external_reference =
            Some(ChargeReference::new(&pricing.id, &request.company_id).to_string());
        charge_request.split = plan
            .splits
            .iter()
            .map(|s| ChargeSplit {
                wallet_id: s.wallet_id.clone(),
                fixed_value: s.fixed_value,
            })
            .collect();

        // Observations made after this instant are newer than the creation
        let observed_at = Utc::now();
        // Never retried: a second call would bill the client twice
        let created = self.gateway.create_charge(&charge_request).await?;
        let external_id = created.id.clone();

        let pix = match self.fetch_qr_code(&external_id).await {
            Ok(qr) => PixData::new(qr.encoded_image, qr.payload),
            Err(e) => {
                tracing::warn!(
                    external_id = %external_id,
                    error = %e,
                    "PIX QR code unavailable, persisting charge without it"
                );
                PixData::default()
            }
        };
        let pix_pending = pix.is_empty();

        let payment = self
            .store
            .upsert_payment(NewPayment {
                asaas_payment_id: external_id.clone(),
                company_id: request.company_id.clone(),
                customer_id: Some(client.id.clone()),
                amount,
                status: ChargeStatus::Pending,
                pix: pix.clone(),
                due_date: Some(due_date),
                confirmed_at: None,
                description: Some(charge_request.description.clone()),
                observed_at,
                source: UpdateSource::ChargeCreation,
            })
            .await
            .map_err(|e| self.persistence_failure(&external_id, e))?
            .record;

        let order = self
            .store
            .upsert_service_order(NewServiceOrder {
                asaas_payment_id: external_id.clone(),
                payment_id: Some(payment.id.clone()),
                client_id: client.id.clone(),
                company_id: request.company_id.clone(),
                service_id: pricing.id.clone(),
                severity_tier: pricing.severity_tier,
                amount,
                payment_status: ChargeStatus::Pending,
                pix,
                confirmed_at: None,
                split_metadata: SplitMetadata::from_plan(cost_model, &plan, collecting_wallet),
                raw_payload: None,
                observed_at,
                source: UpdateSource::ChargeCreation,
            })
            .await
            .map_err(|e| self.persistence_failure(&external_id, e))?
            .record;

        tracing::info!(
            external_id = %external_id,
            service_order_id = %order.id,
            company_id = %request.company_id,
            amount = %amount,
            margin = %plan.margin,
            splits = plan.splits.len(),
            pix_pending = pix_pending,
            "Service order charge created"
        );

        Ok(ChargeDescriptor {
            id: order.id,
            payment_id: payment.id,
            asaas_payment_id: external_id,
            qr_code: order.pix_qr_code,
            pix_copy_paste: order.pix_copy_paste,
            amount,
            status: order.payment_status,
            splits: plan.splits,
            due_date,
            invoice_url: created.invoice_url,
            pix_pending,
        })
    }

    /// Fetch one charge by external id or by either local id
    pub async fn get_charge(&self, id: &str) -> Result<ChargeView> {
        let mut payment = self.store.find_payment_by_external_id(id).await?;
        let mut order = self.store.find_service_order_by_external_id(id).await?;

        if payment.is_none() && order.is_none() {
            order = self.store.find_service_order_by_id(id).await?;
            payment = match &order {
                Some(o) => self.store.find_payment_by_external_id(&o.asaas_payment_id).await?,
                None => self.store.find_payment_by_id(id).await?,
            };
            if order.is_none() {
                if let Some(p) = &payment {
                    order = self
                        .store
                        .find_service_order_by_external_id(&p.asaas_payment_id)
                        .await?;
                }
            }
        }

        ChargeView::merge(payment.as_ref(), order.as_ref())
            .ok_or_else(|| AppError::not_found(format!("Charge {}", id)))
    }

    /// All charges of a company, newest first
    pub async fn list_company_charges(&self, company_id: &str) -> Result<Vec<ChargeView>> {
        let payments = self.store.list_payments_by_company(company_id).await?;
        let orders = self.store.list_service_orders_by_company(company_id).await?;

        let mut by_external: HashMap<String, _> = payments
            .into_iter()
            .map(|p| (p.asaas_payment_id.clone(), p))
            .collect();

        let mut views: Vec<ChargeView> = Vec::with_capacity(orders.len() + by_external.len());
        for order in &orders {
            let payment = by_external.remove(&order.asaas_payment_id);
            views.extend(ChargeView::merge(payment.as_ref(), Some(order)));
        }
        views.extend(
            by_external
                .values()
                .filter_map(|p| ChargeView::merge(Some(p), None)),
        );

        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(views)
    }

    /// Record a cash settlement.
    ///
    /// The gateway is told best-effort; the local rows become `paid` whatever
    /// it answers.
    pub async fn record_manual_payment(
        &self,
        id: &str,
        request: ManualPaymentRequest,
    ) -> Result<ChargeView> {
        let charge = self.get_charge(id).await?;
        let payment_date = request
            .payment_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let value = request.value.unwrap_or(charge.amount);

        if let Err(e) = self
            .gateway
            .mark_paid_manually(&charge.asaas_payment_id, payment_date, value)
            .await
        {
            tracing::warn!(
                external_id = %charge.asaas_payment_id,
                error = %e,
                "Gateway rejected manual settlement, recording locally only"
            );
        }

        let update = ChargeUpdate::new(&charge.asaas_payment_id, UpdateSource::ManualPayment)
            .with_status(ChargeStatus::Paid)
            .with_confirmed_at(Some(Utc::now()));
        let result = self.projector.project(&update).await;

        if let Some(error) = result.error() {
            return Err(AppError::internal(format!(
                "Manual payment for {} not fully recorded: {}",
                charge.asaas_payment_id, error
            )));
        }

        tracing::info!(
            external_id = %charge.asaas_payment_id,
            payment_date = %payment_date,
            value = %value,
            "Manual payment recorded"
        );

        self.get_charge(&charge.asaas_payment_id).await
    }

    async fn partner_wallet(&self, pricing: &ServicePricing) -> Result<Option<String>> {
        match &pricing.partner_company_id {
            Some(partner_id) => match self.store.find_or_create_company_wallet(partner_id).await {
                Ok(wallet) => Ok(wallet),
                Err(AppError::NotFound(_)) => Err(AppError::configuration(format!(
                    "Partner company {} of service {} does not exist",
                    partner_id, pricing.id
                ))),
                Err(e) => Err(e),
            },
            None => Ok(None),
        }
    }

    /// Gateway customer of a client, created on first use
    async fn ensure_customer(&self, client: &Client) -> Result<String> {
        if let Some(customer_id) = client.asaas_customer_id.as_ref().filter(|c| !c.is_empty()) {
            return Ok(customer_id.clone());
        }

        let customer_id = self
            .gateway
            .create_customer(&CustomerProfile {
                name: client.name.clone(),
                cpf_cnpj: client.tax_id.clone(),
                email: client.email.clone(),
                mobile_phone: client.phone.clone(),
                external_reference: Some(client.id.clone()),
            })
            .await?;

        self.store
            .set_client_customer_id(&client.id, &customer_id)
            .await?;

        Ok(customer_id)
    }

    async fn fetch_qr_code(&self, external_id: &str) -> Result<PixQrCode> {
        let gateway = &self.gateway;
        with_retry(&self.settings.read_retry, "fetch_qr_code", move || {
            gateway.fetch_qr_code(external_id)
        })
        .await
    }

    fn persistence_failure(&self, external_id: &str, cause: AppError) -> AppError {
        tracing::error!(
            external_id = %external_id,
            error = %cause,
            "Charge exists at the gateway but could not be stored; run force-sync"
        );
        AppError::persistence(external_id, &cause)
    }
}
