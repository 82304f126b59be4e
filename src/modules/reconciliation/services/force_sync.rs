use chrono::{DateTime, Utc};
use reqwest_retry::policies::ExponentialBackoff;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::BillingConfig;
use crate::core::{AppError, Result};
use crate::modules::gateways::{
    with_retry, ChargeReference, ChargeSnapshot, CustomerSnapshot, PaymentGateway, PixQrCode,
};
use crate::modules::ledger::models::{
    normalize_tax_id, ChargeStatus, Client, ClientSeed, NewPayment, NewServiceOrder, Payment,
    PixData, ServiceOrder, ServicePricing, SplitMetadata, UpdateSource,
};
use crate::modules::ledger::LedgerStore;
use crate::modules::reconciliation::models::{ItemOutcome, SyncReport, TargetedSyncResult};

/// Tax id given to placeholder clients whose gateway customer is unknown
const UNKNOWN_TAX_ID: &str = "00000000000";

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub page_size: u32,
    pub read_retry: ExponentialBackoff,
}

impl SyncSettings {
    pub fn from_config(config: &BillingConfig, read_retry: ExponentialBackoff) -> Self {
        Self {
            page_size: config.sync_page_size.max(1),
            read_retry,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// One charge on operator request; also fetches missing PIX data
    Targeted,
    /// Listing walk scoped to one company
    Bulk,
}

struct Reconciled {
    status: ChargeStatus,
    outcome: ItemOutcome,
    payment_id: Option<String>,
    service_order_id: Option<String>,
    service_inferred: bool,
    service_order_error: Option<String>,
}

impl Reconciled {
    fn skipped(status: ChargeStatus) -> Self {
        Self {
            status,
            outcome: ItemOutcome::Skipped,
            payment_id: None,
            service_order_id: None,
            service_inferred: false,
            service_order_error: None,
        }
    }

    fn unchanged(status: ChargeStatus, payment: &Payment, order: &ServiceOrder) -> Self {
        Self {
            status,
            outcome: ItemOutcome::Unchanged,
            payment_id: Some(payment.id.clone()),
            service_order_id: Some(order.id.clone()),
            service_inferred: false,
            service_order_error: None,
        }
    }
}

/// Reconciles local ledgers against the gateway's view of charges
pub struct ForceSyncService {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn LedgerStore>,
    settings: SyncSettings,
}

impl ForceSyncService {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn LedgerStore>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            settings,
        }
    }

    /// Reconcile one charge.
    ///
    /// `company_hint` is the company used when neither the charge reference
    /// nor the client identifies one; its sub-account key is also tried when
    /// the platform key does not see the charge.
    pub async fn sync_payment(
        &self,
        external_id: &str,
        company_hint: Option<&str>,
    ) -> Result<TargetedSyncResult> {
        let mut fetched_at = Utc::now();
        let (gateway, snapshot) = match self.fetch_snapshot(&self.gateway, external_id).await {
            Ok(snapshot) => (self.gateway.clone(), snapshot),
            Err(AppError::NotFound(message)) => {
                let subaccount = match company_hint {
                    Some(company_id) => self.subaccount_gateway(company_id).await?,
                    None => None,
                };
                let Some(gateway) = subaccount else {
                    return Err(AppError::NotFound(message));
                };
                fetched_at = Utc::now();
                let snapshot = self.fetch_snapshot(&gateway, external_id).await?;
                (gateway, snapshot)
            }
            Err(e) => return Err(e),
        };

        let reconciled = self
            .reconcile(&gateway, &snapshot, fetched_at, company_hint, Mode::Targeted)
            .await?;

        tracing::info!(
            external_id = %external_id,
            status = %reconciled.status,
            outcome = ?reconciled.outcome,
            service_inferred = reconciled.service_inferred,
            "Charge force-synced"
        );

        Ok(TargetedSyncResult {
            asaas_payment_id: snapshot.id,
            status: reconciled.status,
            outcome: reconciled.outcome,
            payment_id: reconciled.payment_id,
            service_order_id: reconciled.service_order_id,
            service_inferred: reconciled.service_inferred,
            service_order_error: reconciled.service_order_error,
        })
    }

    /// Walk the gateway listing for a company and backfill both ledgers.
    ///
    /// Per-charge failures are collected in the report. Cancellation is
    /// honoured between pages; everything written so far stays.
    pub async fn sync_all(
        &self,
        company_id: &str,
        cancel: CancellationToken,
    ) -> Result<SyncReport> {
        if self.store.find_company(company_id).await?.is_none() {
            return Err(AppError::not_found(format!("Company {}", company_id)));
        }

        let gateway = self
            .subaccount_gateway(company_id)
            .await?
            .unwrap_or_else(|| self.gateway.clone());

        let limit = self.settings.page_size;
        let mut offset: u32 = 0;
        let mut report = SyncReport::default();

        loop {
            if cancel.is_cancelled() {
                tracing::warn!(
                    company_id = %company_id,
                    pages = report.pages,
                    "Bulk sync cancelled"
                );
                report.cancelled = true;
                break;
            }

            let fetched_at = Utc::now();
            let page = {
                let gateway = &gateway;
                with_retry(&self.settings.read_retry, "list_charges", move || {
                    gateway.list_charges(offset, limit)
                })
                .await
            };
            let page = match page {
                Ok(page) => page,
                Err(e) if report.pages == 0 => return Err(e),
                Err(e) => {
                    report.record_error(format!("page@{}", offset), e.to_string());
                    break;
                }
            };
            report.pages += 1;

            for entry in page.charges() {
                report.total_seen += 1;
                let snapshot = match entry {
                    Ok(snapshot) => snapshot,
                    Err(undecoded) => {
                        tracing::warn!(
                            external_id = %undecoded.id,
                            error = %undecoded.error,
                            "Listed charge could not be decoded"
                        );
                        report.record_error(
                            undecoded.id,
                            format!("Undecodable charge: {}", undecoded.error),
                        );
                        continue;
                    }
                };
                match self.sync_listed(&gateway, &snapshot, fetched_at, company_id).await {
                    Ok(outcome) => report.record(outcome),
                    Err(e) => {
                        tracing::warn!(
                            external_id = %snapshot.id,
                            error = %e,
                            "Charge could not be reconciled"
                        );
                        report.record_error(&snapshot.id, e.to_string());
                    }
                }
            }

            let fetched = page.data.len() as u32;
            if !page.has_more || fetched < limit {
                break;
            }
            offset += fetched;
        }

        tracing::info!(
            company_id = %company_id,
            total_seen = report.total_seen,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            errors = report.errors.len(),
            cancelled = report.cancelled,
            "Bulk sync finished"
        );

        Ok(report)
    }

    async fn sync_listed(
        &self,
        gateway: &Arc<dyn PaymentGateway>,
        snapshot: &ChargeSnapshot,
        fetched_at: DateTime<Utc>,
        company_id: &str,
    ) -> Result<ItemOutcome> {
        let reconciled = self
            .reconcile(gateway, snapshot, fetched_at, Some(company_id), Mode::Bulk)
            .await?;

        match reconciled.service_order_error {
            Some(message) => Err(AppError::validation(message)),
            None => Ok(reconciled.outcome),
        }
    }

    /// Write one gateway snapshot into both ledgers.
    ///
    /// Observations are stamped with `fetched_at`, the moment the snapshot was
    /// requested, so webhooks generated while the batch is being written are
    /// not mistaken for older news.
    async fn reconcile(
        &self,
        gateway: &Arc<dyn PaymentGateway>,
        snapshot: &ChargeSnapshot,
        fetched_at: DateTime<Utc>,
        company_hint: Option<&str>,
        mode: Mode,
    ) -> Result<Reconciled> {
        let external_id = snapshot.id.as_str();
        let status = ChargeStatus::from_external(&snapshot.status, snapshot.deleted);
        let reference = snapshot.reference();

        if mode == Mode::Bulk {
            if let (Some(owner), Some(scope)) = (&reference.company_id, company_hint) {
                if owner != scope {
                    return Ok(Reconciled::skipped(status));
                }
            }
        }

        let existing_payment = self.store.find_payment_by_external_id(external_id).await?;
        let existing_order = self
            .store
            .find_service_order_by_external_id(external_id)
            .await?;

        if let (Some(payment), Some(order)) = (&existing_payment, &existing_order) {
            let linked = order.payment_id.as_deref() == Some(payment.id.as_str());
            if linked && payment.status == status && order.payment_status == status {
                return Ok(Reconciled::unchanged(status, payment, order));
            }
        }

        let known_client = match snapshot.customer.as_deref().filter(|c| !c.is_empty()) {
            Some(customer_id) => self.store.find_client_by_customer_id(customer_id).await?,
            None => None,
        };

        let company_id = reference
            .company_id
            .clone()
            .or_else(|| existing_order.as_ref().map(|o| o.company_id.clone()))
            .or_else(|| existing_payment.as_ref().map(|p| p.company_id.clone()))
            .or_else(|| known_client.as_ref().map(|c| c.company_id.clone()))
            .or_else(|| company_hint.map(str::to_string))
            .ok_or_else(|| {
                AppError::validation(format!("Cannot resolve company of charge {}", external_id))
            })?;

        if mode == Mode::Bulk && company_hint.is_some_and(|scope| scope != company_id) {
            return Ok(Reconciled::skipped(status));
        }

        let order_client = match &existing_order {
            Some(order) => self.store.find_client(&order.client_id).await?,
            None => None,
        };
        let client = match order_client.or(known_client.filter(|c| c.company_id == company_id)) {
            Some(client) => client,
            None => self.resolve_client(gateway, snapshot, &company_id).await?,
        };

        let has_pix = existing_payment
            .as_ref()
            .is_some_and(|p| p.pix_copy_paste.is_some())
            || existing_order
                .as_ref()
                .is_some_and(|o| o.pix_copy_paste.is_some());
        let pix = if mode == Mode::Targeted && status == ChargeStatus::Pending && !has_pix {
            match self.fetch_qr_code(gateway, external_id).await {
                Ok(qr) => PixData::new(qr.encoded_image, qr.payload),
                Err(e) => {
                    tracing::warn!(external_id = %external_id, error = %e, "PIX QR code unavailable");
                    PixData::default()
                }
            }
        } else {
            PixData::default()
        };

        let confirmed_at = if status == ChargeStatus::Paid {
            snapshot
                .settled_on()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
                .or(Some(fetched_at))
        } else {
            None
        };

        let new_payment = NewPayment {
            asaas_payment_id: external_id.to_string(),
            company_id: company_id.clone(),
            customer_id: Some(client.id.clone()),
            amount: snapshot.value,
            status,
            pix: pix.clone(),
            due_date: snapshot.due_date,
            confirmed_at,
            description: snapshot.description.clone(),
            observed_at: fetched_at,
            source: UpdateSource::ForceSync,
        };
        let update = new_payment.as_update();
        let payment = self.store.upsert_payment(new_payment).await?;

        let mut service_inferred = false;
        let mut service_order_error = None;
        let order = if existing_order.is_some() {
            self.store
                .link_service_order(&update, &payment.record.id)
                .await?
        } else {
            match self.resolve_service(&reference, snapshot).await? {
                Some((pricing, inferred)) => {
                    service_inferred = inferred;
                    let written = self
                        .store
                        .upsert_service_order(NewServiceOrder {
                            asaas_payment_id: external_id.to_string(),
                            payment_id: Some(payment.record.id.clone()),
                            client_id: client.id.clone(),
                            company_id: company_id.clone(),
                            service_id: pricing.id.clone(),
                            severity_tier: pricing.severity_tier,
                            amount: snapshot.value,
                            payment_status: status,
                            pix,
                            confirmed_at,
                            split_metadata: SplitMetadata::reconstructed(
                                pricing.cost_model(),
                                snapshot.value,
                            ),
                            raw_payload: None,
                            observed_at: update.observed_at,
                            source: UpdateSource::ForceSync,
                        })
                        .await?;
                    Some(written)
                }
                None => {
                    service_order_error =
                        Some(format!("No service resolves for charge {}", external_id));
                    None
                }
            }
        };

        let created = payment.created || order.as_ref().is_some_and(|o| o.created);
        let relinked = existing_order
            .as_ref()
            .is_some_and(|o| o.payment_id.is_none())
            && order.as_ref().is_some_and(|o| o.record.payment_id.is_some());
        let changed = relinked
            || payment.outcome.changed()
            || order.as_ref().is_some_and(|o| o.outcome.changed());
        let outcome = if created {
            ItemOutcome::Created
        } else if changed {
            ItemOutcome::Updated
        } else {
            ItemOutcome::Unchanged
        };

        Ok(Reconciled {
            status,
            outcome,
            payment_id: Some(payment.record.id),
            service_order_id: order.map(|o| o.record.id),
            service_inferred,
            service_order_error,
        })
    }

    /// Local client for the charge's gateway customer, placeholder when the
    /// customer cannot be read
    async fn resolve_client(
        &self,
        gateway: &Arc<dyn PaymentGateway>,
        snapshot: &ChargeSnapshot,
        company_id: &str,
    ) -> Result<Client> {
        let customer_id = snapshot.customer.as_deref().filter(|c| !c.is_empty());

        let profile = match customer_id {
            Some(id) => match self.fetch_customer(gateway, id).await {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!(customer_id = %id, error = %e, "Gateway customer unavailable");
                    None
                }
            },
            None => None,
        };

        let resolved = profile.filter(|p| !p.deleted).and_then(|p| {
            let tax_id = normalize_tax_id(p.cpf_cnpj.as_deref().unwrap_or_default());
            (!tax_id.is_empty()).then_some((p, tax_id))
        });

        let (tax_id, seed) = match resolved {
            Some((profile, tax_id)) => {
                let seed = ClientSeed {
                    name: profile
                        .name
                        .unwrap_or_else(|| format!("Cliente {}", tax_id)),
                    email: profile.email,
                    phone: profile.mobile_phone,
                    asaas_customer_id: Some(profile.id),
                    placeholder: false,
                };
                (tax_id, seed)
            }
            None => {
                let tax_id = customer_id
                    .map(normalize_tax_id)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| UNKNOWN_TAX_ID.to_string());
                let seed = ClientSeed::placeholder(&tax_id, customer_id.map(str::to_string));
                (tax_id, seed)
            }
        };

        self.store
            .find_or_create_client(&tax_id, company_id, seed)
            .await
    }

    /// Service of a gateway charge: explicit reference, then description match
    async fn resolve_service(
        &self,
        reference: &ChargeReference,
        snapshot: &ChargeSnapshot,
    ) -> Result<Option<(ServicePricing, bool)>> {
        if let Some(service_id) = reference.service_id.as_deref() {
            if let Some(pricing) = self.store.find_pricing(service_id).await? {
                return Ok(Some((pricing, false)));
            }
            tracing::warn!(
                external_id = %snapshot.id,
                service_id = %service_id,
                "Referenced service does not exist"
            );
        }

        let Some(description) = snapshot
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
        else {
            return Ok(None);
        };

        let inferred = self
            .store
            .list_pricing()
            .await?
            .into_iter()
            .filter(|p| p.active)
            .find(|p| p.matches_description(description));

        if let Some(pricing) = &inferred {
            tracing::info!(
                external_id = %snapshot.id,
                service_id = %pricing.id,
                description = %description,
                "Service inferred from charge description"
            );
        }

        Ok(inferred.map(|p| (p, true)))
    }

    /// Gateway bound to a company's active sub-account key, if it has one
    async fn subaccount_gateway(&self, company_id: &str) -> Result<Option<Arc<dyn PaymentGateway>>> {
        let key = self
            .store
            .find_subaccount(company_id)
            .await?
            .filter(|s| s.is_active())
            .and_then(|s| s.api_key)
            .filter(|k| !k.is_empty());

        Ok(key.map(|key| {
            tracing::debug!(company_id = %company_id, "Using sub-account API key");
            self.gateway.with_api_key(&key)
        }))
    }

    async fn fetch_snapshot(
        &self,
        gateway: &Arc<dyn PaymentGateway>,
        external_id: &str,
    ) -> Result<ChargeSnapshot> {
        with_retry(&self.settings.read_retry, "fetch_charge", move || {
            gateway.fetch_charge(external_id)
        })
        .await
        .map_err(|e| match e {
            AppError::Gateway { status: 404, .. } => {
                AppError::not_found(format!("Charge {} at the gateway", external_id))
            }
            other => other,
        })
    }

    async fn fetch_customer(
        &self,
        gateway: &Arc<dyn PaymentGateway>,
        customer_id: &str,
    ) -> Result<CustomerSnapshot> {
        with_retry(&self.settings.read_retry, "fetch_customer", move || {
            gateway.fetch_customer(customer_id)
        })
        .await
    }

    async fn fetch_qr_code(
        &self,
        gateway: &Arc<dyn PaymentGateway>,
        external_id: &str,
    ) -> Result<PixQrCode> {
        with_retry(&self.settings.read_retry, "fetch_qr_code", move || {
            gateway.fetch_qr_code(external_id)
        })
        .await
    }
}
